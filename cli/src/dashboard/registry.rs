//! # DevDash Project Registry
//!
//! File: cli/src/dashboard/registry.rs
//!
//! ## Overview
//!
//! Discovers the projects under the document root and answers the project
//! list query used by the dashboard's start page.
//!
//! ## Architecture
//!
//! 1. **Scan** (blocking, off the async runtime): immediate subdirectories of
//!    the root, minus dot-names, configured excludes and the dashboard's own
//!    directory. Each is classified by marker files (`find_entry`,
//!    `detect_type`, `build_url`).
//! 2. **Metadata merge**: `.ftx_meta.json` wins; the cache mirror is consulted
//!    when the file has no `createdAt`; if neither has one, the directory mtime
//!    becomes `createdAt` and is persisted to both. Otherwise the mirror is
//!    refreshed.
//! 3. **Query**: substring filter over name/type/entry/url, sort, then
//!    offset/limit. The ETag hashes `[total, q, sort, order, names-in-page]`;
//!    Last-Modified is the newest project mtime.
//!
//! Whole query results are cached for `projects.list_cache_ttl_secs` under a
//! key derived from the query and the root.
//!
//! ## Examples
//!
//! ```rust
//! let query = ProjectQuery::new(Some("shop"), Some("mtime"), Some("desc"), None, None, 500);
//! let page = registry::list_projects(&ctx, &query).await?;
//! println!("{} of {} projects", page.count, page.total);
//! ```
//!
use crate::common::fs::io::mtime_secs;
use crate::common::text::{icontains, natural_cmp};
use crate::core::config::DashboardConfig;
use crate::core::context::AppContext;
use crate::core::error::Result;
use crate::dashboard::metadata::{self, ProjectMeta};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Candidate entry points, in priority order.
const ENTRY_CANDIDATES: [&str; 4] = [
    "/public/index.php",
    "/dist/index.html",
    "/index.php",
    "/index.html",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub entry: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub mtime: i64,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "type")]
    Type,
    #[serde(rename = "mtime")]
    Mtime,
    #[serde(rename = "createdAt")]
    CreatedAt,
}

impl SortKey {
    /// Unknown values fall back to `Name`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("type") => SortKey::Type,
            Some("mtime") => SortKey::Mtime,
            Some("createdAt") => SortKey::CreatedAt,
            _ => SortKey::Name,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// Normalized project list query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectQuery {
    pub q: String,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl ProjectQuery {
    /// Builds a query from raw request values, clamping `limit` to
    /// `1..=max_limit` (default `max_limit`) and `offset` to `>= 0`.
    pub fn new(
        q: Option<&str>,
        sort: Option<&str>,
        order: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
        max_limit: usize,
    ) -> Self {
        Self {
            q: q.map(str::trim).unwrap_or_default().to_string(),
            sort: SortKey::parse(sort),
            order: SortOrder::parse(order),
            limit: limit
                .map(|l| l.clamp(1, max_limit as i64) as usize)
                .unwrap_or(max_limit),
            offset: offset.map(|o| o.max(0) as usize).unwrap_or(0),
        }
    }
}

/// One page of results plus the validators for conditional GET.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectPage {
    pub projects: Vec<Project>,
    pub query: ProjectQuery,
    pub total: usize,
    pub count: usize,
    #[serde(rename = "lastModified")]
    pub last_modified: i64,
    pub etag: String,
}

/// A project directory found by the scan, before metadata is merged.
#[derive(Debug, Clone)]
struct Scanned {
    name: String,
    dir: PathBuf,
    entry: Option<String>,
    kind: &'static str,
    url: String,
    mtime: i64,
}

/// Locates the project's web entry point (relative, with leading `/`).
pub fn find_entry(dir: &Path) -> Option<String> {
    for rel in ENTRY_CANDIDATES {
        if dir.join(&rel[1..]).is_file() {
            return Some(rel.to_string());
        }
    }
    let mut subdirs: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    subdirs.sort();
    subdirs
        .into_iter()
        .find(|sub| dir.join(sub).join("public/index.php").is_file())
        .map(|sub| format!("/{}/public/index.php", sub))
}

/// Classifies a project by its entry point and marker files.
pub fn detect_type(dir: &Path, entry: Option<&str>) -> &'static str {
    match entry {
        Some(e) if e.starts_with("/public") => return "Symfony/Laravel (public)",
        Some(e) if e.starts_with("/dist") => return "Frontend Build (dist)",
        _ => {}
    }
    if dir.join("artisan").is_file() {
        "Laravel"
    } else if dir.join("symfony.lock").is_file() {
        "Symfony"
    } else if dir.join("composer.json").is_file() {
        "PHP (Composer)"
    } else if dir.join("package.json").is_file() {
        "Node"
    } else if entry == Some("/index.php") {
        "Plain PHP"
    } else {
        "Unknown"
    }
}

/// Public URL for a project, relative to the web server root.
pub fn build_url(name: &str, entry: Option<&str>) -> String {
    match entry {
        None | Some("/index.php") => format!("/{}/", name),
        Some("/dist/index.html") => format!("/{}/dist/", name),
        Some(e) if e.ends_with("/index.php") || e.ends_with("/index.html") => {
            let dir = e.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
            if dir.is_empty() || dir == "." {
                format!("/{}/", name)
            } else {
                format!("/{}{}/", name, dir)
            }
        }
        Some(e) => format!("/{}{}", name, e),
    }
}

/// True if a directory name under the root is a listable project.
pub fn is_listed_name(cfg: &DashboardConfig, name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name != cfg.projects.dashboard_dir
        && !cfg.projects.exclude.iter().any(|x| x == name)
}

/// Natural-sorted names of all listed project directories.
pub fn project_names(cfg: &DashboardConfig) -> Result<Vec<String>> {
    let mut names: Vec<String> = read_project_dirs(cfg)?
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names)
}

fn read_project_dirs(cfg: &DashboardConfig) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(&cfg.root)
        .with_context(|| format!("Failed to read root {:?}", cfg.root))?;
    Ok(entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let path = e.path();
            (is_listed_name(cfg, &name) && path.is_dir()).then_some((name, path))
        })
        .collect())
}

fn scan(cfg: &DashboardConfig) -> Result<Vec<Scanned>> {
    let now = unix_now();
    let scanned = read_project_dirs(cfg)?
        .into_iter()
        .map(|(name, dir)| {
            let entry = find_entry(&dir);
            let kind = detect_type(&dir, entry.as_deref());
            let url = build_url(&name, entry.as_deref());
            let mtime = fs::metadata(&dir)
                .map(|m| mtime_secs(&m))
                .ok()
                .filter(|&t| t > 0)
                .unwrap_or(now);
            Scanned {
                name,
                dir,
                entry,
                kind,
                url,
                mtime,
            }
        })
        .collect();
    Ok(scanned)
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Resolves `createdAt` for one project and keeps file and mirror in sync.
async fn merge_metadata(ctx: &AppContext, project: &Scanned) -> i64 {
    let ttl = Duration::from_secs(ctx.config.projects.meta_mirror_ttl_secs);
    let file_meta = metadata::load(&project.dir);
    let created_at = match file_meta.created_at {
        Some(t) => Some(t),
        None => metadata::mirror_get(&ctx.cache, &project.name, ttl).await.created_at,
    };

    match created_at {
        None => {
            let backfilled = ProjectMeta {
                created_at: Some(project.mtime),
                ..file_meta
            }
            .with_detected(project.entry.as_deref(), project.kind);
            info!("Backfilling createdAt for '{}' = {}", project.name, project.mtime);
            if let Err(e) = metadata::save(&project.dir, &backfilled) {
                warn!("Could not persist metadata for '{}': {:#}", project.name, e);
            }
            metadata::mirror_set(&ctx.cache, &project.name, &backfilled, ttl).await;
            project.mtime
        }
        Some(t) => {
            let mirror = ProjectMeta {
                created_at: Some(t),
                ..file_meta
            }
            .with_detected(project.entry.as_deref(), project.kind);
            metadata::mirror_set(&ctx.cache, &project.name, &mirror, ttl).await;
            t
        }
    }
}

/// Scans the root and merges metadata. Returns projects and the newest mtime.
pub async fn discover(ctx: &AppContext) -> Result<(Vec<Project>, i64)> {
    let config = ctx.config.clone();
    let scanned = tokio::task::spawn_blocking(move || scan(&config))
        .await
        .context("Project scan task failed")??;

    let mut latest = 0;
    let mut projects = Vec::with_capacity(scanned.len());
    for item in &scanned {
        latest = latest.max(item.mtime);
        let created_at = merge_metadata(ctx, item).await;
        projects.push(Project {
            name: item.name.clone(),
            entry: item.entry.clone(),
            kind: item.kind.to_string(),
            url: item.url.clone(),
            mtime: item.mtime,
            created_at,
        });
    }
    debug!("Discovered {} projects", projects.len());
    Ok((projects, latest))
}

fn compare(a: &Project, b: &Project, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => natural_cmp(&a.name, &b.name),
        SortKey::Type => natural_cmp(&a.kind, &b.kind),
        SortKey::Mtime => a.mtime.cmp(&b.mtime),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// Filters, sorts and paginates; computes validators.
pub fn apply_query(projects: Vec<Project>, latest_mtime: i64, query: &ProjectQuery) -> ProjectPage {
    let mut matched: Vec<Project> = projects
        .into_iter()
        .filter(|p| {
            query.q.is_empty()
                || icontains(&p.name, &query.q)
                || icontains(&p.kind, &query.q)
                || p.entry.as_deref().is_some_and(|e| icontains(e, &query.q))
                || icontains(&p.url, &query.q)
        })
        .collect();
    matched.sort_by(|a, b| {
        let primary = compare(a, b, query.sort);
        let primary = match query.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| natural_cmp(&a.name, &b.name))
    });

    let total = matched.len();
    let page: Vec<Project> = matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();
    let names: Vec<&str> = page.iter().map(|p| p.name.as_str()).collect();
    let etag = short_hash(
        &serde_json::json!([total, query.q, query.sort, query.order, names]),
        16,
    );
    ProjectPage {
        count: page.len(),
        projects: page,
        query: query.clone(),
        total,
        last_modified: if latest_mtime > 0 { latest_mtime } else { unix_now() },
        etag,
    }
}

/// First `len` hex chars of SHA-256 over the value's JSON encoding.
pub fn short_hash(value: &serde_json::Value, len: usize) -> String {
    let digest = hex::encode(Sha256::digest(value.to_string().as_bytes()));
    digest[..len.min(digest.len())].to_string()
}

pub fn cache_key(root: &Path, query: &ProjectQuery) -> String {
    let sig = serde_json::json!([
        query.q,
        query.sort,
        query.order,
        query.limit,
        query.offset,
        root.to_string_lossy()
    ]);
    format!("projects:list:{}", short_hash(&sig, 32))
}

/// Answers a project list query, from the cache when possible.
pub async fn list_projects(ctx: &AppContext, query: &ProjectQuery) -> Result<ProjectPage> {
    let key = cache_key(ctx.root(), query);
    let ttl = Duration::from_secs(ctx.config.projects.list_cache_ttl_secs);
    if let Some(page) = ctx.cache.get_json::<ProjectPage>(&key, ttl).await {
        debug!("Project list served from cache ({})", key);
        return Ok(page);
    }
    let (projects, latest) = discover(ctx).await?;
    let page = apply_query(projects, latest, query);
    ctx.cache.set_json(&key, &page, ttl).await;
    Ok(page)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::tests::test_context;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    fn project(name: &str, kind: &str, mtime: i64, created_at: i64) -> Project {
        Project {
            name: name.into(),
            entry: None,
            kind: kind.into(),
            url: format!("/{}/", name),
            mtime,
            created_at,
        }
    }

    #[test]
    fn test_find_entry_priority() {
        let dir = tempdir().unwrap();
        assert_eq!(find_entry(dir.path()), None);
        touch(&dir.path().join("sub/public/index.php"));
        assert_eq!(find_entry(dir.path()).as_deref(), Some("/sub/public/index.php"));
        touch(&dir.path().join("index.html"));
        assert_eq!(find_entry(dir.path()).as_deref(), Some("/index.html"));
        touch(&dir.path().join("index.php"));
        assert_eq!(find_entry(dir.path()).as_deref(), Some("/index.php"));
        touch(&dir.path().join("dist/index.html"));
        assert_eq!(find_entry(dir.path()).as_deref(), Some("/dist/index.html"));
        touch(&dir.path().join("public/index.php"));
        assert_eq!(find_entry(dir.path()).as_deref(), Some("/public/index.php"));
    }

    #[test]
    fn test_detect_type() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_type(dir.path(), None), "Unknown");
        assert_eq!(detect_type(dir.path(), Some("/index.php")), "Plain PHP");
        touch(&dir.path().join("package.json"));
        assert_eq!(detect_type(dir.path(), Some("/index.php")), "Node");
        touch(&dir.path().join("composer.json"));
        assert_eq!(detect_type(dir.path(), None), "PHP (Composer)");
        touch(&dir.path().join("artisan"));
        assert_eq!(detect_type(dir.path(), None), "Laravel");
        assert_eq!(detect_type(dir.path(), Some("/dist/index.html")), "Frontend Build (dist)");
        assert_eq!(detect_type(dir.path(), Some("/public/index.php")), "Symfony/Laravel (public)");
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url("a", None), "/a/");
        assert_eq!(build_url("a", Some("/index.php")), "/a/");
        assert_eq!(build_url("a", Some("/index.html")), "/a/");
        assert_eq!(build_url("a", Some("/dist/index.html")), "/a/dist/");
        assert_eq!(build_url("a", Some("/public/index.php")), "/a/public/");
        assert_eq!(build_url("a", Some("/app/public/index.php")), "/a/app/public/");
        assert_eq!(build_url("a", Some("/main.php")), "/a/main.php");
    }

    #[test]
    fn test_query_parsing_clamps() {
        let q = ProjectQuery::new(Some(" shop "), Some("bogus"), Some("DESC"), Some(0), Some(-3), 500);
        assert_eq!(q.q, "shop");
        assert_eq!(q.sort, SortKey::Name);
        assert_eq!(q.order, SortOrder::Asc);
        assert_eq!(q.limit, 1);
        assert_eq!(q.offset, 0);
        let q = ProjectQuery::new(None, Some("createdAt"), Some("desc"), Some(9999), None, 500);
        assert_eq!(q.sort, SortKey::CreatedAt);
        assert_eq!(q.order, SortOrder::Desc);
        assert_eq!(q.limit, 500);
    }

    #[test]
    fn test_apply_query_filter_sort_page() {
        let projects = vec![
            project("shop10", "Node", 30, 3),
            project("Shop2", "Plain PHP", 20, 1),
            project("blog", "Laravel", 10, 2),
        ];
        let q = ProjectQuery::new(Some("shop"), None, None, None, None, 500);
        let page = apply_query(projects.clone(), 30, &q);
        let names: Vec<&str> = page.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Shop2", "shop10"]);
        assert_eq!(page.total, 2);
        assert_eq!(page.last_modified, 30);
        assert_eq!(page.etag.len(), 16);

        let q = ProjectQuery::new(None, Some("createdAt"), Some("desc"), Some(2), Some(1), 500);
        let page = apply_query(projects, 30, &q);
        let names: Vec<&str> = page.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["blog", "Shop2"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.count, 2);
    }

    #[test]
    fn test_etag_depends_on_page_names() {
        let a = apply_query(vec![project("a", "Node", 1, 1)], 1, &ProjectQuery::new(None, None, None, None, None, 500));
        let b = apply_query(vec![project("b", "Node", 1, 1)], 1, &ProjectQuery::new(None, None, None, None, None, 500));
        assert_ne!(a.etag, b.etag);
    }

    #[tokio::test]
    async fn test_discover_backfills_and_excludes() -> Result<()> {
        let docroot = tempdir()?;
        let cache_dir = tempdir()?;
        touch(&docroot.path().join("site/index.php"));
        touch(&docroot.path().join("_dashboard/dist/index.html"));
        touch(&docroot.path().join(".hidden/index.php"));
        fs::create_dir(docroot.path().join(".idea"))?;
        touch(&docroot.path().join("README.txt"));
        let ctx = test_context(docroot.path(), cache_dir.path());

        let (projects, latest) = discover(&ctx).await?;
        assert_eq!(projects.len(), 1);
        let site = &projects[0];
        assert_eq!(site.name, "site");
        assert_eq!(site.kind, "Plain PHP");
        assert_eq!(site.url, "/site/");
        assert_eq!(site.created_at, site.mtime);
        assert!(latest >= site.mtime);

        let persisted = metadata::load(&docroot.path().join("site"));
        assert_eq!(persisted.created_at, Some(site.mtime));
        assert_eq!(persisted.entry.as_deref(), Some("/index.php"));
        assert_eq!(persisted.kind.as_deref(), Some("Plain PHP"));
        let mirrored = metadata::mirror_get(&ctx.cache, "site", Duration::from_secs(60)).await;
        assert_eq!(mirrored.created_at, Some(site.mtime));
        Ok(())
    }

    #[tokio::test]
    async fn test_file_metadata_wins() -> Result<()> {
        let docroot = tempdir()?;
        let cache_dir = tempdir()?;
        let dir = docroot.path().join("app");
        fs::create_dir(&dir)?;
        metadata::save(&dir, &ProjectMeta { created_at: Some(1234), notes: Some("n".into()), ..Default::default() })?;
        let ctx = test_context(docroot.path(), cache_dir.path());
        let (projects, _) = discover(&ctx).await?;
        assert_eq!(projects[0].created_at, 1234);
        // The file keeps its notes and is not rewritten with detected fields.
        let on_disk = metadata::load(&dir);
        assert_eq!(on_disk.notes.as_deref(), Some("n"));
        assert_eq!(on_disk.kind, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_projects_uses_cache() -> Result<()> {
        let docroot = tempdir()?;
        let cache_dir = tempdir()?;
        fs::create_dir(docroot.path().join("one"))?;
        let ctx = test_context(docroot.path(), cache_dir.path());
        let query = ProjectQuery::new(None, None, None, None, None, 500);
        let first = list_projects(&ctx, &query).await?;
        assert_eq!(first.total, 1);
        fs::create_dir(docroot.path().join("two"))?;
        let second = list_projects(&ctx, &query).await?;
        assert_eq!(second, first);
        Ok(())
    }

    #[test]
    fn test_project_names_sorted() -> Result<()> {
        let docroot = tempdir()?;
        for name in ["b10", "b2", "A", "_dashboard", ".git"] {
            fs::create_dir(docroot.path().join(name))?;
        }
        let cfg = DashboardConfig::for_root(docroot.path());
        assert_eq!(project_names(&cfg)?, vec!["A", "b2", "b10"]);
        Ok(())
    }
}
