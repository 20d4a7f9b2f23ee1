//! Read-only file trees that hold catalog files.
//!
//! The catalog store and the reload supervisor only need two capabilities:
//! a recursive walk that yields entries with modification times, and a byte
//! read for a single entry. `DirFileTree` serves a directory on disk,
//! `MemoryFileTree` serves embedded or test content.

use crate::error::{I18nError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One entry produced by a walk. Paths are relative to the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified: Option<DateTime<Utc>>,
}

impl FileEntry {
    /// Base filename as a string, or an empty string for the root.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A read-only tree of catalog files.
pub trait FileTree: Send + Sync {
    /// Walk every entry in a deterministic order.
    ///
    /// Errors are yielded in place so callers can keep what they saw before
    /// the failure.
    fn walk(&self) -> Box<dyn Iterator<Item = Result<FileEntry>> + '_>;

    /// Read the full contents of a file entry.
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirFileTree {
    root: PathBuf,
}

impl DirFileTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileTree for DirFileTree {
    fn walk(&self) -> Box<dyn Iterator<Item = Result<FileEntry>> + '_> {
        let iter = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(move |entry| {
                let entry = entry.map_err(|e| I18nError::Walk {
                    path: e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone()),
                    reason: e.to_string(),
                })?;
                let metadata = entry.metadata().map_err(|e| I18nError::Walk {
                    path: entry.path().to_path_buf(),
                    reason: e.to_string(),
                })?;
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_path_buf();

                Ok(FileEntry {
                    path: relative,
                    is_dir: metadata.is_dir(),
                    modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                })
            });
        Box::new(iter)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    modified: DateTime<Utc>,
}

/// An in-memory tree, keyed by relative path.
///
/// Directories are implied by file paths. Files can be replaced at runtime
/// which makes this tree usable for reload scenarios.
#[derive(Debug, Default)]
pub struct MemoryFileTree {
    files: RwLock<BTreeMap<PathBuf, MemoryFile>>,
}

impl MemoryFileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert stamped with the current time.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Insert or replace a file, stamped with the current time.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.insert_at(path, contents, Utc::now());
    }

    /// Insert or replace a file with an explicit modification time.
    pub fn insert_at(
        &self,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
        modified: DateTime<Utc>,
    ) {
        self.files.write().insert(
            path.into(),
            MemoryFile {
                contents: contents.into(),
                modified,
            },
        );
    }

    /// Set only the modification time of an existing file.
    pub fn touch(&self, path: &Path, modified: DateTime<Utc>) -> bool {
        match self.files.write().get_mut(path) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }
}

impl FileTree for MemoryFileTree {
    fn walk(&self) -> Box<dyn Iterator<Item = Result<FileEntry>> + '_> {
        let files = self.files.read();
        let mut entries: BTreeMap<PathBuf, FileEntry> = BTreeMap::new();

        for (path, file) in files.iter() {
            for ancestor in path.ancestors().skip(1) {
                if ancestor.as_os_str().is_empty() {
                    break;
                }
                entries
                    .entry(ancestor.to_path_buf())
                    .or_insert_with(|| FileEntry {
                        path: ancestor.to_path_buf(),
                        is_dir: true,
                        modified: None,
                    });
            }
            entries.insert(
                path.clone(),
                FileEntry {
                    path: path.clone(),
                    is_dir: false,
                    modified: Some(file.modified),
                },
            );
        }

        Box::new(entries.into_values().map(Ok))
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.files
            .read()
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn collect(tree: &dyn FileTree) -> Vec<FileEntry> {
        tree.walk().map(|e| e.expect("walk entry")).collect()
    }

    // ==================== DirFileTree Tests ====================

    #[test]
    fn test_dir_tree_walks_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("fr")).unwrap();
        std::fs::write(dir.path().join("en.json"), "{}").unwrap();
        std::fs::write(dir.path().join("fr").join("messages.yaml"), "a: b").unwrap();

        let tree = DirFileTree::new(dir.path());
        let entries = collect(&tree);
        let paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("en.json"),
                PathBuf::from("fr"),
                PathBuf::from("fr/messages.yaml"),
            ]
        );
        assert!(entries[1].is_dir);
        assert!(entries[0].modified.is_some());
    }

    #[test]
    fn test_dir_tree_reads_relative_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("en.json"), "{\"a\":\"b\"}").unwrap();

        let tree = DirFileTree::new(dir.path());
        let bytes = tree.read(Path::new("en.json")).unwrap();
        assert_eq!(bytes, b"{\"a\":\"b\"}");
    }

    #[test]
    fn test_dir_tree_missing_root_yields_error() {
        let tree = DirFileTree::new("/definitely/not/here/locales");
        let results: Vec<_> = tree.walk().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(I18nError::Walk { .. })));
    }

    // ==================== MemoryFileTree Tests ====================

    #[test]
    fn test_memory_tree_implies_directories() {
        let tree = MemoryFileTree::new()
            .with_file("es/messages.json", "{}")
            .with_file("en.json", "{}");

        let entries = collect(&tree);
        let rendered: Vec<(String, bool)> = entries
            .iter()
            .map(|e| (e.path.display().to_string(), e.is_dir))
            .collect();

        assert_eq!(
            rendered,
            vec![
                ("en.json".to_string(), false),
                ("es".to_string(), true),
                ("es/messages.json".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_memory_tree_touch_and_remove() {
        let tree = MemoryFileTree::new().with_file("en.json", "{}");
        let stamp = Utc::now() + chrono::Duration::hours(1);

        assert!(tree.touch(Path::new("en.json"), stamp));
        assert_eq!(collect(&tree)[0].modified, Some(stamp));

        assert!(tree.remove(Path::new("en.json")));
        assert!(collect(&tree).is_empty());
        assert!(tree.read(Path::new("en.json")).is_err());
    }
}
