//! # DevDash Project Scaffolder
//!
//! File: cli/src/dashboard/scaffold.rs
//!
//! ## Overview
//!
//! Creates a new project directory under the document root. Four project
//! types are supported:
//!
//! - `plain-php`: `index.php` and `.htaccess` from the built-in templates.
//! - `plain-html`: `index.html`.
//! - `symfony`: `composer create-project symfony/skeleton`, the preset pack,
//!   `symfony/apache-pack`, then `var/cache`, `var/log` and a fallback
//!   `public/.htaccess`.
//! - `vue`: `npm create vite@latest <name> -- --template vue`.
//!
//! `addReadme` writes a README and `initGit` makes an initial commit. Git
//! problems are logged and never fail the request.
//!
//! ## Architecture
//!
//! Package-manager steps go through the context's `CommandRunner` with the
//! scaffold timeout and the shutdown token. Each step appends its output to
//! `<scaffold.log_dir>/<step>-<name>.log`; a failing step aborts the request
//! with `DashError::StepFailed` naming the log. Steps that already ran are not
//! rolled back.
//!
//! ## Examples
//!
//! ```rust
//! let request = CreateRequest::new("shop", "symfony").with_options(CreateOptions {
//!     symfony_version: Some("7.2".into()),
//!     init_git: true,
//!     ..Default::default()
//! });
//! let created = scaffold::create(&ctx, &request).await?;
//! println!("{} -> {}", created.name, created.path);
//! ```
//!
use crate::common::fs::io;
use crate::common::process::{sanitize_log_name, CommandSpec};
use crate::core::context::AppContext;
use crate::core::error::{DashError, Result};
use crate::core::templating::{self, ScaffoldContext, ScaffoldTemplate};
use crate::dashboard::sandbox;
use anyhow::Context;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const COMPOSER_QUIET_FLAGS: [&str; 4] = ["-q", "--no-ansi", "--no-progress", "--no-interaction"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    PlainPhp,
    PlainHtml,
    Symfony,
    Vue,
}

impl ProjectKind {
    pub const ALL: [ProjectKind; 4] = [
        ProjectKind::PlainPhp,
        ProjectKind::PlainHtml,
        ProjectKind::Symfony,
        ProjectKind::Vue,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKind::PlainPhp => "plain-php",
            ProjectKind::PlainHtml => "plain-html",
            ProjectKind::Symfony => "symfony",
            ProjectKind::Vue => "vue",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra packages installed after the Symfony skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymfonyPreset {
    Webapp,
    Api,
    Minimal,
}

impl SymfonyPreset {
    /// Absent means `webapp`; empty and unknown values install nothing extra.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("webapp") => SymfonyPreset::Webapp,
            Some("api") => SymfonyPreset::Api,
            Some(_) => SymfonyPreset::Minimal,
        }
    }

    /// `(package, step label)` to require, if any.
    fn package(self) -> Option<(&'static str, &'static str)> {
        match self {
            SymfonyPreset::Webapp => Some(("symfony/webapp-pack", "webapp-pack")),
            SymfonyPreset::Api => Some(("api", "api-pack")),
            SymfonyPreset::Minimal => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub init_git: bool,
    pub add_readme: bool,
    pub symfony_preset: Option<String>,
    pub symfony_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub name: String,
    pub kind: String,
    pub options: CreateOptions,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options: CreateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CreateOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedProject {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `symfony/skeleton`, with `:^X.Y` for a bare `X.Y` version and the raw
/// constraint otherwise.
pub fn symfony_package(version: Option<&str>) -> String {
    match version.map(str::trim).filter(|v| !v.is_empty()) {
        None => "symfony/skeleton".to_string(),
        Some(v) if is_major_minor(v) => format!("symfony/skeleton:^{}", v),
        Some(v) => format!("symfony/skeleton:{}", v),
    }
}

fn is_major_minor(v: &str) -> bool {
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    v.split_once('.')
        .is_some_and(|(major, minor)| digits(major) && digits(minor))
}

/// Validates name and type and returns the (not yet existing) target path.
fn prepare_target(ctx: &AppContext, request: &CreateRequest) -> Result<(String, ProjectKind, PathBuf)> {
    let name = request.name.trim().to_string();
    if !sandbox::is_valid_project_name(&name) || name == ctx.config.projects.dashboard_dir {
        return Err(DashError::invalid("Invalid project name").into());
    }
    let kind = ProjectKind::parse(request.kind.trim())
        .ok_or_else(|| DashError::invalid("Invalid type"))?;
    let target = ctx.root().join(&name);
    if fs::symlink_metadata(&target).is_ok() {
        return Err(DashError::Conflict("Project already exists".into()).into());
    }
    Ok((name, kind, target))
}

/// Runs one package-manager step, logging to `<log_dir>/<log_stem>.log`.
async fn run_step(
    ctx: &AppContext,
    tool: &str,
    step: &str,
    log_stem: &str,
    spec: CommandSpec,
) -> Result<()> {
    let log_dir = ctx.config.scaffold_log_dir();
    io::ensure_dir_exists(&log_dir)?;
    let log = log_dir.join(format!("{}.log", sanitize_log_name(log_stem)));
    let spec = spec.log_to(log.clone()).timeout(ctx.scaffold_timeout());
    info!("Scaffold step: {}", spec.display());

    let failed = || DashError::StepFailed {
        tool: tool.to_string(),
        step: step.to_string(),
        log: log.display().to_string(),
    };
    match ctx.runner.run(&spec, &ctx.shutdown).await {
        Ok(out) if out.success() => Ok(()),
        Ok(out) => {
            warn!("'{}' exited with {}", spec.display(), out.status_label());
            Err(failed().into())
        }
        Err(e) if matches!(e.downcast_ref::<DashError>(), Some(DashError::Cancelled(_))) => Err(e),
        Err(e) => {
            warn!("'{}' failed: {:#}", spec.display(), e);
            Err(failed().into())
        }
    }
}

fn program(ctx: &AppContext, name: &str) -> String {
    ctx.runner
        .locate(name)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

fn composer(ctx: &AppContext, cwd: &Path, args: &[&str]) -> CommandSpec {
    CommandSpec::new(program(ctx, "composer"))
        .args(args.iter().copied())
        .args(COMPOSER_QUIET_FLAGS)
        .cwd(cwd)
        .env("HOME", "/tmp")
        .env("COMPOSER_HOME", ctx.config.scaffold.composer_home.as_str())
        .env("COMPOSER_ALLOW_SUPERUSER", "1")
        .env("COMPOSER_MEMORY_LIMIT", "-1")
        .env("COMPOSER_PROCESS_TIMEOUT", "2000")
        .env("LC_ALL", "C")
}

async fn create_symfony(
    ctx: &AppContext,
    name: &str,
    target: &Path,
    options: &CreateOptions,
) -> Result<()> {
    let composer_home = PathBuf::from(&ctx.config.scaffold.composer_home);
    if let Err(e) = io::ensure_dir_exists(&composer_home) {
        warn!("Could not prepare COMPOSER_HOME: {:#}", e);
    }

    let package = symfony_package(options.symfony_version.as_deref());
    run_step(
        ctx,
        "Composer",
        "create-project",
        &format!("symfony-create-{}", name),
        composer(ctx, ctx.root(), &["create-project", &package, name]),
    )
    .await?;

    if let Some((pack, label)) = SymfonyPreset::parse(options.symfony_preset.as_deref()).package() {
        run_step(
            ctx,
            "Composer",
            label,
            &format!("symfony-{}-{}", label, name),
            composer(ctx, target, &["require", pack]),
        )
        .await?;
    }

    run_step(
        ctx,
        "Composer",
        "apache-pack",
        &format!("symfony-apache-pack-{}", name),
        composer(ctx, target, &["require", "symfony/apache-pack"]),
    )
    .await?;

    for sub in ["var/cache", "var/log"] {
        if let Err(e) = fs::create_dir_all(target.join(sub)) {
            warn!("Could not create {}: {}", sub, e);
        }
    }
    if !target.join(ScaffoldTemplate::PublicHtaccess.target()).exists() {
        templating::write_templates(
            target,
            &[ScaffoldTemplate::PublicHtaccess],
            &ScaffoldContext::new(name, ProjectKind::Symfony.as_str()),
        )?;
    }
    Ok(())
}

async fn create_vue(ctx: &AppContext, name: &str) -> Result<()> {
    let spec = CommandSpec::new(program(ctx, "npm"))
        .args(["create", "--yes", "vite@latest", name, "--", "--template", "vue"])
        .cwd(ctx.root())
        .env("CI", "1");
    run_step(ctx, "npm", "create-vite", &format!("vue-create-{}", name), spec).await
}

/// `git init`, `.gitignore`, `git add .`, `git commit`. Never fails the request.
async fn init_git(ctx: &AppContext, target: &Path, scaffold_ctx: &ScaffoldContext) {
    let git = ctx.runner.locate("git");
    if git.is_none() {
        warn!("git not found on PATH; skipping repository initialization");
    }
    let run = |args: &'static [&'static str]| {
        let git = git.clone();
        async move {
            let Some(git) = git else { return };
            let spec = CommandSpec::new(git.to_string_lossy())
                .args(args.iter().copied())
                .cwd(target)
                .timeout(ctx.git_timeout());
            match ctx.runner.run(&spec, &ctx.shutdown).await {
                Ok(out) if out.success() => debug!("{} ok", spec.display()),
                Ok(out) => warn!(
                    "{} exited with {}: {}",
                    spec.display(),
                    out.status_label(),
                    out.stderr.trim()
                ),
                Err(e) => warn!("{} failed: {:#}", spec.display(), e),
            }
        }
    };

    run(&["init"]).await;
    if let Err(e) = templating::write_templates(target, &[ScaffoldTemplate::GitIgnore], scaffold_ctx) {
        warn!("Could not write .gitignore: {:#}", e);
    }
    run(&["add", "."]).await;
    run(&["commit", "-m", "Initial scaffold"]).await;
}

/// Creates a project and returns its name, absolute path and type.
///
/// ## Arguments
///
/// * `ctx` - Application context (root, runner, timeouts)
/// * `request` - Name, type and options as sent by the dashboard
///
/// ## Returns
///
/// * `Result<CreatedProject>` - 400 on a bad name or type, 409 if the target
///   exists, 500 with the log path when a package-manager step fails
pub async fn create(ctx: &AppContext, request: &CreateRequest) -> Result<CreatedProject> {
    let (name, kind, target) = prepare_target(ctx, request)?;
    info!("Creating {} project '{}' in {:?}", kind, name, target);
    let scaffold_ctx = ScaffoldContext::new(&name, kind.as_str());

    match kind {
        ProjectKind::PlainPhp | ProjectKind::PlainHtml => {
            fs::create_dir_all(&target)
                .with_context(|| format!("Cannot create directory: {}", target.display()))?;
            let templates: &[ScaffoldTemplate] = if kind == ProjectKind::PlainPhp {
                &[ScaffoldTemplate::PhpIndex, ScaffoldTemplate::RootHtaccess]
            } else {
                &[ScaffoldTemplate::HtmlIndex]
            };
            templating::write_templates(&target, templates, &scaffold_ctx)?;
        }
        ProjectKind::Symfony => create_symfony(ctx, &name, &target, &request.options).await?,
        ProjectKind::Vue => create_vue(ctx, &name).await?,
    }

    if request.options.add_readme {
        templating::write_templates(&target, &[ScaffoldTemplate::Readme], &scaffold_ctx)?;
    }
    if request.options.init_git {
        init_git(ctx, &target, &scaffold_ctx).await;
    }

    info!("Project '{}' created", name);
    Ok(CreatedProject {
        name,
        path: target.display().to_string(),
        kind: kind.as_str().to_string(),
    })
}
