//! # DevDash Projects and Git Integration Tests
//!
//! File: cli/tests/projects.rs
//!
//! ## Overview
//!
//! Runs `devdash projects` and `devdash git` against a temporary document
//! root and checks both the table and the JSON output.
//!

mod common;
use common::*;
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn test_projects_table() {
    let ws = Workspace::new();
    ws.cmd(&["projects"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blog"))
        .stdout(predicate::str::contains("Symfony/Laravel (public)"))
        .stdout(predicate::str::contains("_dashboard").not())
        .stdout(predicate::str::contains("2 of 2 project(s)."));
}

#[test]
fn test_projects_json_with_filter() {
    let ws = Workspace::new();
    let output = ws
        .cmd(&["projects", "--json", "--filter", "SHOP"])
        .output()
        .expect("Failed to run devdash projects");
    assert!(output.status.success());

    let page: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["projects"][0]["name"], "shop");
    assert_eq!(page["projects"][0]["entry"], "/public/index.php");
    assert_eq!(page["projects"][0]["url"], "/shop/public/");
    assert_eq!(page["etag"].as_str().unwrap().len(), 16);
}

#[test]
fn test_projects_backfills_metadata() {
    let ws = Workspace::new();
    ws.cmd(&["projects", "--json"]).assert().success();
    assert!(ws.root.path().join("blog/.ftx_meta.json").is_file());
}

#[test]
fn test_git_without_repository() {
    let ws = Workspace::new();
    ws.cmd(&["git", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blog  (not a git repository)"));

    let output = ws.cmd(&["git", "--json"]).output().unwrap();
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["items"][0]["project"], "blog");
    assert_eq!(report["items"][0]["is_git"], false);
    assert_eq!(report["items"][0]["branch"], Value::Null);
}

#[test]
fn test_git_unknown_project() {
    let ws = Workspace::new();
    ws.cmd(&["git", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project not found"));
}
