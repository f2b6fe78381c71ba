//! Bulk document ingestion: walk a path, pick up supported files and store
//! them, converting PDFs to one entry per page.

use crate::entry::{Entry, Metadata, PdfPageEntry, metadata_keys};
use crate::errors::MemoryError;
use crate::pdf::PdfPageExtractor;
use crate::qdrant::QdrantConnector;

use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Extensions picked up by directory walks. PDFs are handled separately.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Text documents
    "txt", "md", "markdown",
    // Code files
    "py", "js", "ts", "tsx", "jsx", "java", "go", "rs", "c", "cpp", "h", "hpp", "rb", "php", "sh",
    "bash",
    // Config files
    "json", "yaml", "yml", "toml", "xml", "ini", "env",
    // Web
    "html", "css", "scss",
    // Data
    "csv", "sql",
];

/// File-selection options for a directory walk.
#[derive(Clone, Debug, Default)]
pub struct IngestOptions {
    /// Only paths matching this pattern are ingested.
    pub include: Option<Regex>,
    /// Paths matching this pattern are skipped.
    pub exclude: Option<Regex>,
    /// Metadata attached to every ingested entry.
    pub extra_metadata: Metadata,
}

/// Per-run ingestion counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub successful: usize,
    pub failed: usize,
}

/// Recursively finds supported files under `path`, honoring the
/// include/exclude patterns. A direct file path skips pattern checks.
pub fn find_files(path: &Path, options: &IngestOptions) -> Result<Vec<PathBuf>, MemoryError> {
    let mut files = Vec::new();

    if path.is_file() {
        if is_supported(path) {
            files.push(path.to_path_buf());
        }
        return Ok(files);
    }

    walk(path, options, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, options: &IngestOptions, out: &mut Vec<PathBuf>) -> Result<(), MemoryError> {
    for dirent in std::fs::read_dir(dir)? {
        let path = dirent?.path();
        if path.is_dir() {
            walk(&path, options, out)?;
            continue;
        }
        if !is_supported(&path) {
            continue;
        }
        let text = path.to_string_lossy();
        if let Some(include) = &options.include {
            if !include.is_match(&text) {
                continue;
            }
        }
        if let Some(exclude) = &options.exclude {
            if exclude.is_match(&text) {
                continue;
            }
        }
        out.push(path);
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e) || e == "pdf")
}

/// Walks a path and stores everything it finds.
pub struct DocumentIngestor {
    connector: Arc<QdrantConnector>,
    pdf_ingestion: bool,
}

impl DocumentIngestor {
    pub fn new(connector: Arc<QdrantConnector>, pdf_ingestion: bool) -> Self {
        Self {
            connector,
            pdf_ingestion,
        }
    }

    pub fn connector(&self) -> &QdrantConnector {
        &self.connector
    }

    /// Ingests a file or a directory tree into `collection`.
    ///
    /// Per-file failures are logged and counted; the run continues.
    ///
    /// # Errors
    /// Returns `MemoryError::Io` when the path does not exist or the walk
    /// itself fails.
    pub async fn ingest_path(
        &self,
        path: &Path,
        collection: Option<&str>,
        options: &IngestOptions,
    ) -> Result<IngestReport, MemoryError> {
        if !path.exists() {
            return Err(MemoryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("path does not exist: {}", path.display()),
            )));
        }

        let files = find_files(path, options)?;
        info!("Found {} files to ingest under {}", files.len(), path.display());

        let mut report = IngestReport::default();
        for file in &files {
            let outcome = self
                .ingest_file(file, collection, &options.extra_metadata)
                .await;
            match outcome {
                Ok(true) => report.successful += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to ingest {}: {e}", file.display());
                    report.failed += 1;
                }
            }
        }

        info!(
            "Ingestion complete: {} successful, {} failed",
            report.successful, report.failed
        );
        Ok(report)
    }

    /// Ingests one file; `Ok(false)` means the file was skipped.
    async fn ingest_file(
        &self,
        path: &Path,
        collection: Option<&str>,
        extra: &Metadata,
    ) -> Result<bool, MemoryError> {
        if path.extension().and_then(|e| e.to_str()) == Some("pdf") {
            if !self.pdf_ingestion {
                warn!("Skipping PDF (ingestion disabled): {}", path.display());
                return Ok(false);
            }
            self.ingest_pdf(path, collection, extra).await?;
            return Ok(true);
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            warn!("Skipping empty file: {}", path.display());
            return Ok(false);
        }

        let entry = Entry::new(content, Some(file_metadata(path, extra)));
        self.connector.store(entry, collection).await?;
        info!("Ingested: {}", path.display());
        Ok(true)
    }

    /// Stores one entry per PDF page, carrying the page metadata fields.
    async fn ingest_pdf(
        &self,
        path: &Path,
        collection: Option<&str>,
        extra: &Metadata,
    ) -> Result<(), MemoryError> {
        let extractor = PdfPageExtractor::new(path)?;
        let pages = extractor.extract_all_pages().await?;
        let total_pages = pages.len() as u32;
        let document_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();

        for page in pages {
            if page.content.trim().is_empty() {
                continue;
            }
            let entry = PdfPageEntry {
                content: page.content,
                metadata: Some(file_metadata(path, extra)),
                physical_page_index: page.physical_index,
                page_label: page.label,
                document_id: document_id.clone(),
                total_pages,
            }
            .to_entry();
            self.connector.store(entry, collection).await?;
        }
        info!("Ingested PDF '{document_id}' ({total_pages} pages)");
        Ok(())
    }
}

fn file_metadata(path: &Path, extra: &Metadata) -> Metadata {
    let mut metadata = extra.clone();
    metadata.insert(
        metadata_keys::FILENAME.into(),
        Value::from(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
    );
    metadata.insert(
        metadata_keys::FILEPATH.into(),
        Value::from(path.to_string_lossy().into_owned()),
    );
    metadata.insert(
        metadata_keys::EXTENSION.into(),
        Value::from(
            path.extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
        ),
    );
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn finds_only_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.md"), "text");
        touch(&dir.path().join("b.rs"), "fn main() {}");
        touch(&dir.path().join("c.bin"), "binary");

        let files = find_files(dir.path(), &IngestOptions::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.md", "b.rs"]);
    }

    #[test]
    fn include_and_exclude_patterns_filter_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("keep_me.md"), "x");
        touch(&dir.path().join("skip_me.md"), "x");
        touch(&dir.path().join("other.md"), "x");

        let options = IngestOptions {
            include: Some(Regex::new(r"_me\.md$").unwrap()),
            exclude: Some(Regex::new(r"skip").unwrap()),
            extra_metadata: Metadata::new(),
        };
        let files = find_files(dir.path(), &options).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep_me.md"));
    }

    #[test]
    fn direct_file_path_bypasses_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("skip_me.md");
        touch(&file, "x");

        let options = IngestOptions {
            exclude: Some(Regex::new(r"skip").unwrap()),
            ..Default::default()
        };
        let files = find_files(&file, &options).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn file_metadata_carries_name_path_and_extension() {
        let meta = file_metadata(Path::new("/tmp/notes/today.md"), &Metadata::new());
        assert_eq!(meta["filename"], Value::from("today.md"));
        assert_eq!(meta["filepath"], Value::from("/tmp/notes/today.md"));
        assert_eq!(meta["extension"], Value::from(".md"));
    }

    #[test]
    fn extra_metadata_is_merged_into_file_metadata() {
        let mut extra = Metadata::new();
        extra.insert("knowledge_base".into(), Value::from("handbook"));
        let meta = file_metadata(Path::new("a.txt"), &extra);
        assert_eq!(meta["knowledge_base"], Value::from("handbook"));
        assert_eq!(meta["filename"], Value::from("a.txt"));
    }
}
