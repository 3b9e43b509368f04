//! Directory enumeration boundary.
//!
//! The tree model never touches the filesystem itself; it asks a
//! [`DirectoryLister`] for the immediate children of a path. Failures are
//! absorbed here and surface as an empty listing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One immediate child of a listed directory.
///
/// Serialized as `{ "name", "path", "isDirectory" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory,
        }
    }
}

/// Source of directory listings for the tree model.
#[allow(async_fn_in_trait)]
pub trait DirectoryLister {
    /// List the immediate children of `path`. Never fails: an unreadable
    /// directory yields an empty vector.
    async fn list_children(&self, path: &Path) -> Vec<DirEntry>;
}

/// Lister backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    async fn list_children(&self, path: &Path) -> Vec<DirEntry> {
        list_children(path.to_path_buf()).await
    }
}

/// Read the immediate children of `dir` with `tokio::fs`.
///
/// Takes an owned path so it can be moved into a spawned task.
/// Permission errors are expected while browsing and only logged at debug.
pub async fn list_children(dir: PathBuf) -> Vec<DirEntry> {
    let mut read_dir = match tokio::fs::read_dir(&dir).await {
        Ok(rd) => rd,
        Err(e) => {
            log_listing_error(&dir, &e);
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                log_listing_error(&dir, &e);
                break;
            }
        };
        // Broken entries are skipped rather than failing the whole listing.
        let is_directory = match entry.file_type().await {
            Ok(ft) => ft.is_dir(),
            Err(_) => continue,
        };
        let name = entry.file_name();
        entries.push(DirEntry::new(
            name.to_string_lossy(),
            dir.join(&name),
            is_directory,
        ));
    }

    tracing::trace!(dir = %dir.display(), count = entries.len(), "listed directory");
    entries
}

fn log_listing_error(dir: &Path, err: &std::io::Error) {
    if err.kind() == ErrorKind::PermissionDenied {
        tracing::debug!(dir = %dir.display(), "permission denied while listing");
    } else {
        tracing::warn!(dir = %dir.display(), error = %err, "failed to list directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[tokio::test]
    async fn lists_files_and_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        File::create(dir.path().join("Cargo.toml")).unwrap();

        let mut entries = FsLister.list_children(dir.path()).await;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                DirEntry::new("Cargo.toml", dir.path().join("Cargo.toml"), false),
                DirEntry::new("src", dir.path().join("src"), true),
            ]
        );
    }

    #[tokio::test]
    async fn listing_is_one_level_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a").join("b")).unwrap();
        let entries = list_children(dir.path().to_path_buf()).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
    }

    #[tokio::test]
    async fn missing_directory_lists_empty() {
        let dir = TempDir::new().unwrap();
        let entries = list_children(dir.path().join("does-not-exist")).await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn listing_a_file_lists_empty() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        File::create(&file).unwrap();
        assert!(list_children(file).await.is_empty());
    }

    #[test]
    fn dir_entry_wire_shape() {
        let entry = DirEntry::new("main.rs", "/p/src/main.rs", false);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "main.rs",
                "path": "/p/src/main.rs",
                "isDirectory": false
            })
        );
    }
}
