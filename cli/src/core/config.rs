//! # DevDash Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module implements the configuration system for devdash, handling
//! loading, merging, validation and access to configuration data. Every
//! setting has a built-in default, so an empty document root with no config
//! files at all is a valid setup.
//!
//! ## Architecture
//!
//! Configuration sources (lowest to highest precedence):
//! 1. Default values defined in the code
//! 2. User-specific `~/.config/devdash/config.toml`
//! 3. `.devdash.toml` in the document root
//! 4. A file passed explicitly with `--config`
//! 5. Environment variables (`REDIS_HOST`, `MARIADB_CONTAINER`, `URL`, ...)
//!
//! TOML files are deep-merged table by table before deserialization, so a
//! project file only needs to mention the keys it changes. Command-line flags
//! are applied last by the command handlers themselves.
//!
//! ## Examples
//!
//! ```toml
//! [listing]
//! max_depth_limit = 8
//! ignore = [".git", "node_modules", "vendor", "var"]
//!
//! [cache]
//! backend = "redis"
//!
//! [cache.redis]
//! host = "127.0.0.1"
//!
//! [[services.targets]]
//! name = "postgres"
//! host = "localhost"
//! port = 5432
//! ```
//!
//! ```rust
//! let cfg = config::load_config(Path::new("/var/www/html"), None)?;
//! println!("Serving projects from {}", cfg.root.display());
//! ```
//!
use crate::core::error::{DashError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::{env, fs};
use tracing::{debug, info, warn};

/// Name of the per-root configuration file.
pub const ROOT_CONFIG_FILENAME: &str = ".devdash.toml";

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, default)]
pub struct DashboardConfig {
    /// Canonical document root holding the project directories.
    /// Never read from TOML; set by `load_config`.
    #[serde(skip)]
    pub root: PathBuf,
    pub server: ServerSettings,
    pub projects: ProjectsConfig,
    pub listing: ListingConfig,
    pub files: FilesConfig,
    pub cache: CacheConfig,
    pub services: ServicesConfig,
    pub scaffold: ScaffoldConfig,
    pub process: ProcessConfig,
}

/// Settings for `devdash serve`.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
    pub enable_cors: bool,
    /// Directory holding the built Vue app. Defaults to `<root>/<dashboard_dir>/dist`.
    pub frontend_dir: Option<String>,
    /// Public base URL reported by the schema endpoint (env `URL`).
    pub base_url: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            enable_cors: true,
            frontend_dir: None,
            base_url: None,
        }
    }
}

/// Project discovery settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ProjectsConfig {
    /// The dashboard's own directory; never listed and never a valid new project name.
    pub dashboard_dir: String,
    /// Additional directory names skipped during discovery.
    pub exclude: Vec<String>,
    pub list_cache_ttl_secs: u64,
    pub meta_mirror_ttl_secs: u64,
    pub max_limit: usize,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            dashboard_dir: "_dashboard".to_string(),
            exclude: vec![
                ".DS_Store".to_string(),
                ".idea".to_string(),
                ".vscode".to_string(),
            ],
            list_cache_ttl_secs: 10,
            meta_mirror_ttl_secs: 3600,
            max_limit: 500,
        }
    }
}

/// File tree settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ListingConfig {
    /// Upper bound (and default) for the `depth` query parameter.
    pub max_depth_limit: usize,
    /// Entry names that are neither listed nor descended into.
    pub ignore: Vec<String>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_depth_limit: 12,
            ignore: [".git", "node_modules", "vendor", ".idea", ".vscode", ".DS_Store"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// File editor settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct FilesConfig {
    pub max_read_bytes: u64,
    /// Lowercase extensions (without dot) the editor refuses to write.
    pub deny_extensions: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_read_bytes: 2_000_000,
            deny_extensions: [
                "png", "jpg", "jpeg", "gif", "webp", "pdf", "zip", "jar", "exe", "dll", "so",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Which store backs the cache.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Redis when a host is configured, files otherwise.
    #[default]
    Auto,
    Redis,
    File,
}

impl std::str::FromStr for CacheBackend {
    type Err = DashError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(CacheBackend::Auto),
            "redis" => Ok(CacheBackend::Redis),
            "file" => Ok(CacheBackend::File),
            other => Err(DashError::Config(format!(
                "Unknown cache backend '{}'. Expected auto, redis or file.",
                other
            ))),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Directory for the file cache (can use ~).
    pub dir: String,
    pub redis: RedisConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Auto,
            dir: env::temp_dir().join("ftx_cache").to_string_lossy().into_owned(),
            redis: RedisConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Whether a Redis client should be created at all.
    pub fn uses_redis(&self) -> bool {
        match self.backend {
            CacheBackend::Redis => true,
            CacheBackend::File => false,
            CacheBackend::Auto => self.redis.host.is_some(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct RedisConfig {
    pub host: Option<String>,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub connect_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 6379,
            password: None,
            db: 0,
            connect_timeout_ms: 1500,
        }
    }
}

impl RedisConfig {
    /// Host to connect to; `redis` mirrors the compose service name.
    pub fn effective_host(&self) -> &str {
        self.host.as_deref().unwrap_or("redis")
    }
}

/// A TCP endpoint checked by the services endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ServicesConfig {
    pub targets: Vec<ServiceTarget>,
    /// JSON list of `{name, url, tags}` for HTTP checks.
    /// Defaults to `<root>/<dashboard_dir>/config/services.json`.
    pub http_config: Option<String>,
    pub tcp_timeout_ms: u64,
    pub http_timeout_ms: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                ServiceTarget {
                    name: "mariadb".to_string(),
                    host: "ftxampp_mariadb".to_string(),
                    port: 3306,
                },
                ServiceTarget {
                    name: "web".to_string(),
                    host: "ftxampp_apache".to_string(),
                    port: 80,
                },
                ServiceTarget {
                    name: "redis".to_string(),
                    host: "ftxampp_redis".to_string(),
                    port: 6379,
                },
            ],
            http_config: None,
            tcp_timeout_ms: 250,
            http_timeout_ms: 2000,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ScaffoldConfig {
    /// Where package-manager output is logged (can use ~).
    pub log_dir: String,
    pub composer_home: String,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            log_dir: "/tmp/dashboard-create".to_string(),
            composer_home: "/tmp/composer".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ProcessConfig {
    pub git_timeout_secs: u64,
    pub scaffold_timeout_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            git_timeout_secs: 10,
            scaffold_timeout_secs: 900,
        }
    }
}

impl DashboardConfig {
    /// Directory served under `/_dashboard/`.
    pub fn frontend_dir(&self) -> PathBuf {
        match &self.server.frontend_dir {
            Some(dir) => self.resolve_in_root(dir),
            None => self.root.join(&self.projects.dashboard_dir).join("dist"),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache.dir)
    }

    pub fn scaffold_log_dir(&self) -> PathBuf {
        PathBuf::from(&self.scaffold.log_dir)
    }

    pub fn services_http_config(&self) -> PathBuf {
        match &self.services.http_config {
            Some(path) => self.resolve_in_root(path),
            None => self
                .root
                .join(&self.projects.dashboard_dir)
                .join("config")
                .join("services.json"),
        }
    }

    fn resolve_in_root(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.root.join(p)
        }
    }

    /// Builds a configuration for `root` from defaults only.
    pub fn for_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Default::default()
        }
    }
}

/// Loads the effective configuration for a document root.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<DashboardConfig> {
    load_config_with(root, explicit, user_config_path(), |key| env::var(key).ok())
}

fn user_config_path() -> Option<PathBuf> {
    match ProjectDirs::from("dev", "devdash", "devdash") {
        Some(dirs) => Some(dirs.config_dir().join("config.toml")),
        None => {
            warn!("Could not determine user config directory.");
            None
        }
    }
}

/// Loading with injectable user-config location and environment lookup.
fn load_config_with<F>(
    root: &Path,
    explicit: Option<&Path>,
    user_config: Option<PathBuf>,
    env_lookup: F,
) -> Result<DashboardConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let root = resolve_root(root)?;

    let mut merged = toml::Table::new();
    if let Some(user_path) = user_config.filter(|p| p.is_file()) {
        info!("Loading user configuration from: {}", user_path.display());
        deep_merge(&mut merged, load_table(&user_path)?);
    }
    let root_file = root.join(ROOT_CONFIG_FILENAME);
    if root_file.is_file() {
        info!("Loading root configuration from: {}", root_file.display());
        deep_merge(&mut merged, load_table(&root_file)?);
    } else {
        debug!("No {} in {}", ROOT_CONFIG_FILENAME, root.display());
    }
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(anyhow!(DashError::Config(format!(
                "Config file '{}' does not exist.",
                path.display()
            ))));
        }
        info!("Loading configuration from: {}", path.display());
        deep_merge(&mut merged, load_table(path)?);
    }

    let mut config: DashboardConfig = toml::Value::Table(merged)
        .try_into()
        .context("Failed to interpret merged configuration")?;
    config.root = root;

    apply_env_overrides(&mut config, env_lookup)?;
    expand_config_paths(&mut config);
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    let abs = if root.is_absolute() {
        root.to_path_buf()
    } else {
        env::current_dir()
            .context("Failed to get current directory")?
            .join(root)
    };
    let canonical = fs::canonicalize(&abs).map_err(|e| {
        anyhow!(DashError::Config(format!(
            "Root '{}' is not accessible: {}",
            abs.display(),
            e
        )))
    })?;
    if !canonical.is_dir() {
        return Err(anyhow!(DashError::Config(format!(
            "Root '{}' is not a directory.",
            canonical.display()
        ))));
    }
    Ok(canonical)
}

fn load_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    content
        .parse::<toml::Table>()
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Merges `overlay` into `base`; nested tables merge, everything else replaces.
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn apply_env_overrides<F>(config: &mut DashboardConfig, env_lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| env_lookup(key).filter(|v| !v.is_empty());

    if let Some(host) = get("REDIS_HOST").or_else(|| get("REDIS_CONTAINER")) {
        config.cache.redis.host = Some(host);
    }
    if let Some(port) = get("REDIS_PORT") {
        config.cache.redis.port = port
            .parse()
            .map_err(|_| DashError::Config(format!("REDIS_PORT '{}' is not a port", port)))?;
    }
    if let Some(password) = get("REDIS_PASSWORD") {
        config.cache.redis.password = Some(password);
    }
    if let Some(db) = get("REDIS_DB") {
        config.cache.redis.db = db
            .parse()
            .map_err(|_| DashError::Config(format!("REDIS_DB '{}' is not a number", db)))?;
    }
    if let Some(backend) = get("DEVDASH_CACHE_BACKEND") {
        config.cache.backend = backend.parse()?;
    }
    if let Some(url) = get("URL") {
        config.server.base_url = Some(url);
    }

    for (service, var) in [
        ("mariadb", "MARIADB_CONTAINER"),
        ("web", "APACHE_CONTAINER"),
        ("redis", "REDIS_CONTAINER"),
    ] {
        if let Some(host) = get(var) {
            if let Some(target) = config.services.targets.iter_mut().find(|t| t.name == service) {
                debug!("Service '{}' host overridden by {}: {}", service, var, host);
                target.host = host;
            }
        }
    }
    Ok(())
}

fn expand_config_paths(config: &mut DashboardConfig) {
    config.cache.dir = shellexpand::tilde(&config.cache.dir).into_owned();
    config.scaffold.log_dir = shellexpand::tilde(&config.scaffold.log_dir).into_owned();
    config.scaffold.composer_home = shellexpand::tilde(&config.scaffold.composer_home).into_owned();
    if let Some(dir) = config.server.frontend_dir.as_mut() {
        *dir = shellexpand::tilde(dir).into_owned();
    }
    if let Some(path) = config.services.http_config.as_mut() {
        *path = shellexpand::tilde(path).into_owned();
    }
}

fn validate_config(config: &DashboardConfig) -> Result<()> {
    let fail = |msg: String| Err(anyhow!(DashError::Config(msg)));

    if !(1..=64).contains(&config.listing.max_depth_limit) {
        return fail(format!(
            "listing.max_depth_limit must be between 1 and 64, got {}",
            config.listing.max_depth_limit
        ));
    }
    if config.listing.ignore.iter().any(|name| name.trim().is_empty()) {
        return fail("listing.ignore must not contain empty names".to_string());
    }
    if config.projects.dashboard_dir.is_empty() {
        return fail("projects.dashboard_dir must not be empty".to_string());
    }
    if config.projects.max_limit == 0 {
        return fail("projects.max_limit must be at least 1".to_string());
    }
    if config.process.git_timeout_secs == 0 || config.process.scaffold_timeout_secs == 0 {
        return fail("process timeouts must be greater than zero".to_string());
    }
    if config.files.max_read_bytes == 0 {
        return fail("files.max_read_bytes must be greater than zero".to_string());
    }
    for target in &config.services.targets {
        if target.name.is_empty() || target.host.is_empty() {
            return fail(format!(
                "Service target needs a name and a host (got name '{}', host '{}')",
                target.name, target.host
            ));
        }
    }
    if config.cache.backend == CacheBackend::Redis && config.cache.redis.host.is_none() {
        warn!(
            "cache.backend is 'redis' but no host is configured; using '{}'",
            config.cache.redis.effective_host()
        );
    }
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_match_dashboard_conventions() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.listing.max_depth_limit, 12);
        assert!(cfg.listing.ignore.contains(&"node_modules".to_string()));
        assert_eq!(cfg.files.max_read_bytes, 2_000_000);
        assert_eq!(cfg.projects.dashboard_dir, "_dashboard");
        assert_eq!(cfg.services.targets.len(), 3);
        assert!(!cfg.cache.uses_redis());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml_content = r#"
            [listing]
            max_depth_limit = 4

            [cache]
            backend = "file"

            [[services.targets]]
            name = "postgres"
            host = "db"
            port = 5432
        "#;
        let cfg: DashboardConfig = toml::from_str(toml_content).expect("Failed to parse TOML");
        assert_eq!(cfg.listing.max_depth_limit, 4);
        assert_eq!(cfg.cache.backend, CacheBackend::File);
        assert_eq!(cfg.services.targets.len(), 1);
        assert_eq!(cfg.services.targets[0].port, 5432);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.files.max_read_bytes, 2_000_000);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: std::result::Result<DashboardConfig, _> = toml::from_str("[listing]\nmax_dept = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_deep_merge_keeps_sibling_keys() {
        let mut base: toml::Table = "[cache]\ndir = \"/a\"\n[cache.redis]\nport = 1\n"
            .parse()
            .unwrap();
        let overlay: toml::Table = "[cache.redis]\nhost = \"h\"\n".parse().unwrap();
        deep_merge(&mut base, overlay);
        let cache = base["cache"].as_table().unwrap();
        assert_eq!(cache["dir"].as_str(), Some("/a"));
        assert_eq!(cache["redis"]["port"].as_integer(), Some(1));
        assert_eq!(cache["redis"]["host"].as_str(), Some("h"));
    }

    #[test]
    fn test_load_config_layers_user_root_and_explicit() -> Result<()> {
        let root = tempdir()?;
        let user_dir = tempdir()?;
        let user_file = user_dir.path().join("config.toml");
        fs::write(&user_file, "[listing]\nmax_depth_limit = 5\n[files]\nmax_read_bytes = 10\n")?;
        fs::write(
            root.path().join(ROOT_CONFIG_FILENAME),
            "[listing]\nmax_depth_limit = 6\n",
        )?;
        let explicit = user_dir.path().join("explicit.toml");
        fs::write(&explicit, "[projects]\ndashboard_dir = \"admin\"\n")?;

        let cfg = load_config_with(root.path(), Some(&explicit), Some(user_file), no_env)?;
        assert_eq!(cfg.listing.max_depth_limit, 6);
        assert_eq!(cfg.files.max_read_bytes, 10);
        assert_eq!(cfg.projects.dashboard_dir, "admin");
        assert_eq!(cfg.root, fs::canonicalize(root.path())?);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let root = tempdir().unwrap();
        let missing = root.path().join("nope.toml");
        let result = load_config_with(root.path(), Some(&missing), None, no_env);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let root = tempdir()?;
        let vars: HashMap<&str, &str> = [
            ("REDIS_CONTAINER", "cache_box"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DB", "2"),
            ("MARIADB_CONTAINER", "db_box"),
            ("URL", "dash.local"),
        ]
        .into_iter()
        .collect();
        let cfg = load_config_with(root.path(), None, None, |k| {
            vars.get(k).map(|v| v.to_string())
        })?;
        assert_eq!(cfg.cache.redis.host.as_deref(), Some("cache_box"));
        assert_eq!(cfg.cache.redis.port, 6380);
        assert_eq!(cfg.cache.redis.db, 2);
        assert!(cfg.cache.uses_redis());
        let mariadb = cfg.services.targets.iter().find(|t| t.name == "mariadb").unwrap();
        assert_eq!(mariadb.host, "db_box");
        let redis = cfg.services.targets.iter().find(|t| t.name == "redis").unwrap();
        assert_eq!(redis.host, "cache_box");
        assert_eq!(cfg.server.base_url.as_deref(), Some("dash.local"));
        Ok(())
    }

    #[test]
    fn test_invalid_env_port_rejected() {
        let root = tempdir().unwrap();
        let result = load_config_with(root.path(), None, None, |k| {
            (k == "REDIS_PORT").then(|| "abc".to_string())
        });
        assert!(result.unwrap_err().to_string().contains("REDIS_PORT"));
    }

    #[test]
    fn test_validate_rejects_depth_limit() {
        let mut cfg = DashboardConfig::default();
        cfg.listing.max_depth_limit = 0;
        let result = validate_config(&cfg);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("max_depth_limit"));
    }

    #[test]
    fn test_cache_backend_parse() {
        assert_eq!("Redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert!("memcached".parse::<CacheBackend>().is_err());
    }

    #[test]
    fn test_derived_paths() {
        let cfg = DashboardConfig::for_root(Path::new("/srv/www"));
        assert_eq!(cfg.frontend_dir(), PathBuf::from("/srv/www/_dashboard/dist"));
        assert_eq!(
            cfg.services_http_config(),
            PathBuf::from("/srv/www/_dashboard/config/services.json")
        );
    }
}
