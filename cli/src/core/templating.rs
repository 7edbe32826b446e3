//! # DevDash Template System
//!
//! File: cli/src/core/templating.rs
//!
//! ## Overview
//!
//! This module holds the built-in scaffold templates used when creating new
//! projects and renders them with the Tera templating engine. The templates
//! are compiled into the binary, so scaffolding a plain project needs no files
//! besides the target directory.
//!
//! ## Architecture
//!
//! - `ScaffoldTemplate` names each built-in file and knows its relative
//!   target path and Tera source.
//! - `render_template` renders one template against a serializable context.
//! - `write_templates` renders a set of templates into a target directory,
//!   creating intermediate directories as needed.
//!
//! Rendering uses `Tera::one_off` with autoescaping disabled, because the
//! output is source code rather than HTML fragments.
//!
//! ## Examples
//!
//! ```rust
//! let ctx = ScaffoldContext::new("shop", "plain-php");
//! templating::write_templates(
//!     &target,
//!     &[ScaffoldTemplate::PhpIndex, ScaffoldTemplate::RootHtaccess],
//!     &ctx,
//! )?;
//! ```
//!
use crate::core::error::{DashError, Result};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Tera;
use tracing::debug;

/// Variables available to every scaffold template.
#[derive(Serialize, Debug, Clone)]
pub struct ScaffoldContext {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ScaffoldContext {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// The files devdash can generate without a package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffoldTemplate {
    PhpIndex,
    RootHtaccess,
    HtmlIndex,
    Readme,
    GitIgnore,
    /// Front-controller rewrite rules for `public/`.
    PublicHtaccess,
}

impl ScaffoldTemplate {
    /// Path of the generated file, relative to the project directory.
    pub fn target(self) -> &'static str {
        match self {
            ScaffoldTemplate::PhpIndex => "index.php",
            ScaffoldTemplate::RootHtaccess => ".htaccess",
            ScaffoldTemplate::HtmlIndex => "index.html",
            ScaffoldTemplate::Readme => "README.md",
            ScaffoldTemplate::GitIgnore => ".gitignore",
            ScaffoldTemplate::PublicHtaccess => "public/.htaccess",
        }
    }

    fn source(self) -> &'static str {
        match self {
            ScaffoldTemplate::PhpIndex => "<?php echo 'Hello from {{ name }}!';",
            ScaffoldTemplate::RootHtaccess => {
                "<IfModule mod_rewrite.c>\nRewriteEngine On\nDirectoryIndex index.php\n</IfModule>\n"
            }
            ScaffoldTemplate::HtmlIndex => {
                "<!doctype html><meta charset=utf-8><title>{{ name }}</title><h1>{{ name }}</h1><p>Hello!</p>"
            }
            ScaffoldTemplate::Readme => "# {{ name }}\nCreated via Dashboard\nType: `{{ type }}`\n",
            ScaffoldTemplate::GitIgnore => ".env\n/vendor/\n/node_modules/\n/dist/\n",
            ScaffoldTemplate::PublicHtaccess => {
                "<IfModule mod_rewrite.c>\nRewriteEngine On\nRewriteCond %{REQUEST_FILENAME} !-f\nRewriteCond %{REQUEST_FILENAME} !-d\nRewriteRule ^ index.php [QSA,L]\n</IfModule>\n"
            }
        }
    }
}

/// Renders a single built-in template.
///
/// ## Arguments
///
/// * `template` - Which built-in file to render
/// * `ctx` - Variables exposed to the template
///
/// ## Returns
///
/// * `Result<String>` - The rendered file content
pub fn render_template<C: Serialize>(template: ScaffoldTemplate, ctx: &C) -> Result<String> {
    let tera_context = tera::Context::from_serialize(ctx).map_err(|e| {
        anyhow!(DashError::Template { source: e }).context("Failed to create Tera context")
    })?;
    Tera::one_off(template.source(), &tera_context, false).map_err(|e| {
        anyhow!(DashError::Template { source: e })
            .context(format!("Tera rendering failed for '{}'", template.target()))
    })
}

/// Renders templates into `target_dir`, overwriting existing files.
///
/// ## Returns
///
/// * `Result<Vec<PathBuf>>` - Absolute paths of the written files, in input order
pub fn write_templates<C: Serialize>(
    target_dir: &Path,
    templates: &[ScaffoldTemplate],
    ctx: &C,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(templates.len());
    for &template in templates {
        let content = render_template(template, ctx)?;
        let path = target_dir.join(template.target());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Cannot create directory: {}", parent.display())
            })?;
        }
        fs::write(&path, content)
            .with_context(|| format!("Cannot write file: {}", path.display()))?;
        debug!("Rendered {} -> {}", template.target(), path.display());
        written.push(path);
    }
    Ok(written)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_substitutes_name_and_type() -> Result<()> {
        let ctx = ScaffoldContext::new("shop", "plain-php");
        assert_eq!(
            render_template(ScaffoldTemplate::PhpIndex, &ctx)?,
            "<?php echo 'Hello from shop!';"
        );
        assert_eq!(
            render_template(ScaffoldTemplate::Readme, &ctx)?,
            "# shop\nCreated via Dashboard\nType: `plain-php`\n"
        );
        Ok(())
    }

    #[test]
    fn test_apache_variables_are_left_alone() -> Result<()> {
        let ctx = ScaffoldContext::new("api", "symfony");
        let out = render_template(ScaffoldTemplate::PublicHtaccess, &ctx)?;
        assert!(out.contains("RewriteCond %{REQUEST_FILENAME} !-f"));
        Ok(())
    }

    #[test]
    fn test_write_templates_creates_nested_dirs() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ScaffoldContext::new("site", "symfony");
        let written = write_templates(
            dir.path(),
            &[ScaffoldTemplate::PublicHtaccess, ScaffoldTemplate::GitIgnore],
            &ctx,
        )?;
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("public/.htaccess").is_file());
        assert_eq!(
            fs::read_to_string(dir.path().join(".gitignore"))?,
            ".env\n/vendor/\n/node_modules/\n/dist/\n"
        );
        Ok(())
    }
}
