//! # DevDash Server Configuration
//!
//! File: cli/src/commands/serve/config.rs
//!
//! ## Overview
//!
//! Command-line arguments for `devdash serve` and their merge into the loaded
//! `DashboardConfig`. File and environment settings come from
//! `core::config::load_config`; flags given on the command line win over both.
//!
//! ## Examples
//!
//! ```bash
//! # Serve the projects below the current directory
//! devdash serve
//!
//! # Another root, all interfaces, custom port, no CORS headers
//! devdash serve /var/www/html --host 0.0.0.0 --port 9000 --no-cors
//! ```
//!
use crate::core::config::{self, DashboardConfig};
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::debug;

/// # Serve Arguments (`ServeArgs`)
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Document root holding the project directories.
    #[arg(env = "DEVDASH_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Port to listen on; the next free port is used if it is taken.
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Interface to bind.
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Do not send CORS headers.
    #[arg(long)]
    pub no_cors: bool,

    /// Directory with the built dashboard frontend.
    #[arg(long)]
    pub frontend: Option<PathBuf>,

    /// Extra TOML configuration file (highest file precedence).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Loads the configuration for `args.root` and applies the flags on top.
///
/// ## Returns
///
/// * `Result<DashboardConfig>` - The effective configuration, or an error if
///   the root is not a directory or a config file is invalid
pub fn load_and_merge_config(args: &ServeArgs) -> Result<DashboardConfig> {
    let mut cfg = config::load_config(&args.root, args.config.as_deref())
        .context("Failed to load devdash configuration")?;
    apply_flags(&mut cfg, args);
    debug!("Effective server settings: {:?}", cfg.server);
    Ok(cfg)
}

fn apply_flags(cfg: &mut DashboardConfig, args: &ServeArgs) {
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if args.no_cors {
        cfg.server.enable_cors = false;
    }
    if let Some(dir) = &args.frontend {
        cfg.server.frontend_dir = Some(dir.to_string_lossy().into_owned());
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(root: &std::path::Path) -> ServeArgs {
        ServeArgs {
            root: root.to_path_buf(),
            port: None,
            host: None,
            no_cors: false,
            frontend: None,
            config: None,
        }
    }

    #[test]
    fn test_flags_override_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join(config::ROOT_CONFIG_FILENAME),
            "[server]\nport = 9100\nenable_cors = true\n",
        )?;

        let cfg = load_and_merge_config(&args(temp_dir.path()))?;
        assert_eq!(cfg.server.port, 9100);
        assert!(cfg.server.enable_cors);

        let mut with_flags = args(temp_dir.path());
        with_flags.port = Some(9200);
        with_flags.no_cors = true;
        with_flags.host = Some("0.0.0.0".parse()?);
        let cfg = load_and_merge_config(&with_flags)?;
        assert_eq!(cfg.server.port, 9200);
        assert!(!cfg.server.enable_cors);
        assert_eq!(cfg.server.host.to_string(), "0.0.0.0");
        Ok(())
    }

    #[test]
    fn test_frontend_flag() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut a = args(temp_dir.path());
        a.frontend = Some(PathBuf::from("/opt/dash/dist"));
        let cfg = load_and_merge_config(&a)?;
        assert_eq!(cfg.frontend_dir(), PathBuf::from("/opt/dash/dist"));
        Ok(())
    }

    #[test]
    fn test_missing_root_fails() {
        let a = args(std::path::Path::new("/definitely/not/here/devdash"));
        assert!(load_and_merge_config(&a).is_err());
    }
}
