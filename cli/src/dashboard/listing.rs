//! # DevDash Directory Lister
//!
//! File: cli/src/dashboard/listing.rs
//!
//! ## Overview
//!
//! Walks a project directory to a bounded depth and returns the result in
//! two shapes: a flat, sorted list of entries and a nested tree.
//!
//! ## Architecture
//!
//! - `walk` uses `walkdir` with `filter_entry`, so ignored directories are
//!   pruned rather than descended. Top-level entries have depth 1. Symlinks
//!   are listed but never followed.
//! - The flat list is sorted directories first, then by natural
//!   case-insensitive comparison of the whole path.
//! - `build_nested` creates a node for every ancestor directory implied by a
//!   path, attaches files to their parent (or the root level), then sorts each
//!   level directories first and by name.
//!
//! Walking is blocking I/O; the HTTP layer runs it on `spawn_blocking`.
//!
use crate::common::fs::io::mtime_secs;
use crate::common::text::natural_cmp;
use crate::core::error::Result;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dir,
    File,
}

/// One entry of the flat listing.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub size: u64,
    pub mtime: i64,
}

/// One node of the nested tree. Only directories carry `children`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub size: u64,
    pub mtime: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub flat: Vec<FlatEntry>,
    pub nested: Vec<TreeNode>,
    pub depth: usize,
}

impl Listing {
    pub fn file_count(&self) -> usize {
        self.flat.iter().filter(|e| e.kind == NodeKind::File).count()
    }

    pub fn dir_count(&self) -> usize {
        self.flat.iter().filter(|e| e.kind == NodeKind::Dir).count()
    }
}

/// Clamps a requested depth into `1..=limit`; absent means `limit`.
pub fn clamp_depth(requested: Option<i64>, limit: usize) -> usize {
    match requested {
        Some(d) => d.clamp(1, limit as i64) as usize,
        None => limit,
    }
}

/// Lists `project_root` to `depth`, skipping names in `ignore`.
pub fn list_project(project_root: &Path, depth: usize, ignore: &[String]) -> Result<Listing> {
    let flat = walk(project_root, depth, ignore);
    let nested = build_nested(&flat);
    debug!(
        "Listed {} entries under {:?} (depth {})",
        flat.len(),
        project_root,
        depth
    );
    Ok(Listing {
        flat,
        nested,
        depth,
    })
}

/// Depth-bounded walk producing the sorted flat list.
pub fn walk(root: &Path, depth: usize, ignore: &[String]) -> Vec<FlatEntry> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !ignore.iter().any(|ignored| *ignored == name)
        });

    let mut flat = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };
        let rel = match entry.path().strip_prefix(root) {
            Ok(p) => p.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        let file_type = entry.file_type();
        let is_dir = file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir());
        let (size, mtime) = match entry.metadata() {
            Ok(meta) => (if is_dir { 0 } else { meta.len() }, mtime_secs(&meta)),
            Err(_) => (0, 0),
        };
        flat.push(FlatEntry {
            path: rel,
            kind: if is_dir { NodeKind::Dir } else { NodeKind::File },
            size,
            mtime,
        });
    }
    flat.sort_by(|a, b| dirs_first(a.kind, b.kind).then_with(|| natural_cmp(&a.path, &b.path)));
    flat
}

fn dirs_first(a: NodeKind, b: NodeKind) -> Ordering {
    match (a, b) {
        (NodeKind::Dir, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Dir) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Intermediate directory level while building the tree.
#[derive(Default)]
struct Level {
    dirs: BTreeMap<String, DirSlot>,
    files: Vec<TreeNode>,
}

struct DirSlot {
    path: String,
    mtime: i64,
    level: Level,
}

impl Level {
    /// Returns the level for `segments`, creating missing directories.
    fn descend(&mut self, segments: &[&str]) -> &mut Level {
        let mut current = self;
        let mut walked = String::new();
        for seg in segments {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(seg);
            current = &mut current
                .dirs
                .entry((*seg).to_string())
                .or_insert_with(|| DirSlot {
                    path: walked.clone(),
                    mtime: 0,
                    level: Level::default(),
                })
                .level;
        }
        current
    }

    fn into_nodes(self) -> Vec<TreeNode> {
        let mut nodes: Vec<TreeNode> = self
            .dirs
            .into_iter()
            .map(|(name, slot)| TreeNode {
                name,
                path: slot.path,
                kind: NodeKind::Dir,
                size: 0,
                mtime: slot.mtime,
                children: Some(slot.level.into_nodes()),
            })
            .chain(self.files)
            .collect();
        nodes.sort_by(|a, b| dirs_first(a.kind, b.kind).then_with(|| natural_cmp(&a.name, &b.name)));
        nodes
    }
}

/// Builds the nested tree from a flat listing.
pub fn build_nested(flat: &[FlatEntry]) -> Vec<TreeNode> {
    let mut root = Level::default();
    for entry in flat {
        let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            continue;
        };
        match entry.kind {
            NodeKind::Dir => {
                let parent = root.descend(parents);
                let slot = parent
                    .dirs
                    .entry((*last).to_string())
                    .or_insert_with(|| DirSlot {
                        path: entry.path.clone(),
                        mtime: 0,
                        level: Level::default(),
                    });
                slot.mtime = entry.mtime;
            }
            NodeKind::File => {
                root.descend(parents).files.push(TreeNode {
                    name: (*last).to_string(),
                    path: entry.path.clone(),
                    kind: NodeKind::File,
                    size: entry.size,
                    mtime: entry.mtime,
                    children: None,
                });
            }
        }
    }
    root.into_nodes()
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn ignore_defaults() -> Vec<String> {
        crate::core::config::ListingConfig::default().ignore
    }

    fn paths(flat: &[FlatEntry]) -> Vec<&str> {
        flat.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_clamp_depth() {
        assert_eq!(clamp_depth(None, 12), 12);
        assert_eq!(clamp_depth(Some(0), 12), 1);
        assert_eq!(clamp_depth(Some(-4), 12), 1);
        assert_eq!(clamp_depth(Some(3), 12), 3);
        assert_eq!(clamp_depth(Some(99), 12), 12);
    }

    #[test]
    fn test_demo_scenario_flat_and_nested() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("a"))?;
        fs::write(dir.path().join("a/b.txt"), "hi")?;

        let listing = list_project(dir.path(), 12, &ignore_defaults())?;
        assert_eq!(paths(&listing.flat), vec!["a", "a/b.txt"]);
        assert_eq!(listing.flat[0].kind, NodeKind::Dir);
        assert_eq!(listing.flat[1].kind, NodeKind::File);
        assert_eq!(listing.flat[1].size, 2);

        assert_eq!(listing.nested.len(), 1);
        let a = &listing.nested[0];
        assert_eq!(a.name, "a");
        let children = a.children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "b.txt");
        assert_eq!(children[0].path, "a/b.txt");
        assert!(children[0].children.is_none());
        Ok(())
    }

    #[test]
    fn test_dirs_first_natural_order_at_every_level() -> Result<()> {
        let dir = tempdir()?;
        for d in ["src", "Docs", "src/v10", "src/v2"] {
            fs::create_dir_all(dir.path().join(d))?;
        }
        for f in ["b.txt", "A.txt", "src/file10.rs", "src/file2.rs", "src/v2/x"] {
            fs::write(dir.path().join(f), "")?;
        }
        let listing = list_project(dir.path(), 12, &[])?;
        assert_eq!(
            paths(&listing.flat),
            vec!["Docs", "src", "src/v2", "src/v10", "A.txt", "b.txt", "src/file2.rs", "src/file10.rs", "src/v2/x"]
        );

        let top: Vec<&str> = listing.nested.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(top, vec!["Docs", "src", "A.txt", "b.txt"]);
        let src = listing.nested[1].children.as_ref().unwrap();
        let src_names: Vec<&str> = src.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(src_names, vec!["v2", "v10", "file2.rs", "file10.rs"]);
        Ok(())
    }

    #[test]
    fn test_ignored_directories_are_pruned() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("node_modules/pkg"))?;
        fs::create_dir_all(dir.path().join(".git/objects"))?;
        fs::write(dir.path().join("node_modules/pkg/index.js"), "")?;
        fs::write(dir.path().join("index.php"), "")?;
        let listing = list_project(dir.path(), 12, &ignore_defaults())?;
        assert_eq!(paths(&listing.flat), vec!["index.php"]);
        Ok(())
    }

    #[test]
    fn test_depth_bound() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("a/b/c"))?;
        fs::write(dir.path().join("a/b/c/deep.txt"), "")?;
        let listing = list_project(dir.path(), 2, &[])?;
        assert_eq!(paths(&listing.flat), vec!["a", "a/b"]);
        assert_eq!(listing.dir_count(), 2);
        assert_eq!(listing.file_count(), 0);
        Ok(())
    }

    #[test]
    fn test_nested_creates_implied_ancestors() {
        let flat = vec![FlatEntry {
            path: "x/y/z.txt".into(),
            kind: NodeKind::File,
            size: 1,
            mtime: 5,
        }];
        let nested = build_nested(&flat);
        assert_eq!(nested[0].path, "x");
        let y = &nested[0].children.as_ref().unwrap()[0];
        assert_eq!(y.path, "x/y");
        assert_eq!(y.children.as_ref().unwrap()[0].name, "z.txt");
    }

    #[test]
    fn test_tree_serializes_children_only_for_dirs() {
        let flat = vec![
            FlatEntry { path: "d".into(), kind: NodeKind::Dir, size: 0, mtime: 1 },
            FlatEntry { path: "f".into(), kind: NodeKind::File, size: 3, mtime: 2 },
        ];
        let json = serde_json::to_value(build_nested(&flat)).unwrap();
        assert_eq!(json[0]["type"], "dir");
        assert!(json[0]["children"].is_array());
        assert_eq!(json[1]["type"], "file");
        assert!(json[1].get("children").is_none());
    }
}
