//! services/api/src/adapters/file_store.rs
//!
//! Stores uploaded files in one directory on the local filesystem.
//! Implements the `FileStore` port from the `core` crate.

use async_trait::async_trait;
use pdf_qa_core::ports::{FileStore, PortError, PortResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A `FileStore` rooted at a single shared upload directory.
#[derive(Clone, Debug)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Creates a new `LocalFileStore`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reduces a client-supplied filename to its final path component.
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<&str> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

//=========================================================================================
// `FileStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, filename: &str, contents: &[u8]) -> PortResult<()> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| PortError::Unexpected(format!("Invalid upload filename '{}'", filename)))?;

        fs::create_dir_all(&self.root).await.map_err(|e| {
            PortError::Unexpected(format!(
                "Failed to create upload directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let path = self.root.join(name);
        fs::write(&path, contents)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write {}: {}", path.display(), e)))
    }

    async fn list(&self) -> PortResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_only_the_final_component() {
        assert_eq!(sanitize_filename("report.pdf"), Some("report.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.pdf"), Some("notes.pdf"));
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
    }

    #[tokio::test]
    async fn list_is_empty_before_the_directory_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(tmp.path().join("uploaded_docs"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_creates_the_directory_and_overwrites_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(tmp.path().join("uploaded_docs"));

        store.save("b.pdf", b"first").await.unwrap();
        store.save("a.pdf", b"other").await.unwrap();
        store.save("b.pdf", b"second").await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a.pdf", "b.pdf"]);
        let contents = std::fs::read(store.root().join("b.pdf")).unwrap();
        assert_eq!(contents, b"second");
    }

    #[tokio::test]
    async fn save_cannot_escape_the_upload_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(tmp.path().join("uploads"));

        store.save("../outside.pdf", b"x").await.unwrap();
        assert!(store.root().join("outside.pdf").exists());
        assert!(!tmp.path().join("outside.pdf").exists());
    }
}
