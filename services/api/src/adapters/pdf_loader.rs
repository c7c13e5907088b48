//! services/api/src/adapters/pdf_loader.rs
//!
//! Loads the text of every PDF in the upload directory.
//! Implements the `DocumentLoader` port from the `core` crate.

use async_trait::async_trait;
use pdf_qa_core::domain::LoadedDocument;
use pdf_qa_core::ports::{DocumentLoader, PortError, PortResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A `DocumentLoader` that extracts text from the PDFs directly inside one directory.
#[derive(Clone, Debug)]
pub struct PdfDirectoryLoader {
    dir: PathBuf,
}

impl PdfDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Non-hidden `*.pdf` files (any case) directly inside `dir`, sorted by name.
/// A missing directory holds no files.
pub fn discover_pdf_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && !name.starts_with('.') {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn extract_text(path: &Path) -> PortResult<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| PortError::Unexpected(format!("Failed to read {}: {}", path.display(), e)))?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        PortError::Unexpected(format!("Failed to extract text from {}: {}", path.display(), e))
    })
}

#[async_trait]
impl DocumentLoader for PdfDirectoryLoader {
    async fn load(&self) -> PortResult<Vec<LoadedDocument>> {
        let dir = self.dir.clone();

        // Parsing is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            let files = discover_pdf_files(&dir).map_err(|e| {
                PortError::Unexpected(format!("Failed to list {}: {}", dir.display(), e))
            })?;

            let mut documents = Vec::with_capacity(files.len());
            for path in files {
                let text = extract_text(&path)?;
                let source = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!(source = %source, chars = text.len(), "Loaded PDF");
                documents.push(LoadedDocument { source, text });
            }
            Ok(documents)
        })
        .await
        .map_err(|e| PortError::Unexpected(format!("PDF loading task failed: {}", e)))?
    }
}
