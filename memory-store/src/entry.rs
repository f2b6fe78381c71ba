//! Core data model: stored entries and their metadata keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Arbitrary JSON metadata attached to an entry.
///
/// `BTreeMap` keeps key order stable across serialization round trips.
pub type Metadata = BTreeMap<String, Value>;

/// Well-known metadata keys used across the store.
pub mod metadata_keys {
    pub const DOCUMENT_ID: &str = "document_id";
    pub const PAGE_LABEL: &str = "page_label";
    pub const PHYSICAL_PAGE_INDEX: &str = "physical_page_index";
    pub const TOTAL_PAGES: &str = "total_pages";
    pub const FILENAME: &str = "filename";
    pub const FILEPATH: &str = "filepath";
    pub const EXTENSION: &str = "extension";
    pub const CHUNK_INDEX: &str = "chunk_index";
    pub const TOTAL_CHUNKS: &str = "total_chunks";
    pub const IS_CHUNK: &str = "is_chunk";
}

/// A single entry in a Qdrant collection: free text plus optional metadata.
///
/// Immutable once constructed; one entry maps to one stored point, or to
/// several when chunking splits it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Entry {
    pub fn new(content: impl Into<String>, metadata: Option<Metadata>) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A specialized entry for PDF pages with explicit page metadata.
///
/// `physical_page_index` is 0-based; `page_label` is the human-facing page
/// numbering (e.g. "iv", "45", "Appendix A") and is independent of the
/// physical index.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PdfPageEntry {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    pub physical_page_index: u32,
    pub page_label: String,
    pub document_id: String,
    pub total_pages: u32,
}

impl PdfPageEntry {
    /// Converts to a plain [`Entry`], merging the page fields into metadata
    /// under their fixed keys. Pure; the receiver is consumed.
    pub fn to_entry(self) -> Entry {
        let mut metadata = self.metadata.unwrap_or_default();
        metadata.insert(
            metadata_keys::PHYSICAL_PAGE_INDEX.into(),
            Value::from(self.physical_page_index),
        );
        metadata.insert(
            metadata_keys::PAGE_LABEL.into(),
            Value::from(self.page_label),
        );
        metadata.insert(
            metadata_keys::DOCUMENT_ID.into(),
            Value::from(self.document_id),
        );
        metadata.insert(
            metadata_keys::TOTAL_PAGES.into(),
            Value::from(self.total_pages),
        );
        Entry {
            content: self.content,
            metadata: Some(metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_page_entry_round_trips_page_fields() {
        let page = PdfPageEntry {
            content: "body".into(),
            metadata: None,
            physical_page_index: 4,
            page_label: "45".into(),
            document_id: "doc1".into(),
            total_pages: 120,
        };
        let entry = page.to_entry();
        let meta = entry.metadata.expect("metadata must be populated");
        assert_eq!(meta["physical_page_index"], Value::from(4));
        assert_eq!(meta["page_label"], Value::from("45"));
        assert_eq!(meta["document_id"], Value::from("doc1"));
        assert_eq!(meta["total_pages"], Value::from(120));
        assert_eq!(entry.content, "body");
    }

    #[test]
    fn to_entry_keeps_existing_metadata() {
        let mut extra = Metadata::new();
        extra.insert("source".into(), Value::from("shelf"));
        let entry = PdfPageEntry {
            content: "x".into(),
            metadata: Some(extra),
            physical_page_index: 0,
            page_label: "Page 1".into(),
            document_id: "d".into(),
            total_pages: 1,
        }
        .to_entry();
        let meta = entry.metadata.unwrap();
        assert_eq!(meta["source"], Value::from("shelf"));
        assert_eq!(meta["document_id"], Value::from("d"));
    }
}
