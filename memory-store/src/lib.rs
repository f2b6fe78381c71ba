//! Memory store over Qdrant: entries, filters, chunking, embeddings and
//! PDF-aware ingestion.
//!
//! This crate provides the storage side of the memory service:
//! - Store free-text entries (optionally chunked) with JSON metadata
//! - Search them semantically, with compiled per-field filters
//! - Extract PDF pages into per-page entries with page metadata
//!
//! The design is flat and splits responsibilities into focused modules;
//! [`QdrantConnector`] is the single entry point recommended for
//! application code.

pub mod chunking;
pub mod config;
pub mod embed;
pub mod entry;
pub mod errors;
pub mod filters;
pub mod formatters;
pub mod ingest;
pub mod pdf;
pub mod qdrant;
pub mod sets;

pub use chunking::{ChunkStrategy, DocumentChunker};
pub use config::{
    ChunkingSettings, EmbeddingSettings, QdrantSettings, Settings, StorageMode, ToolSettings,
};
pub use embed::EmbeddingProvider;
pub use entry::{Entry, Metadata, PdfPageEntry, metadata_keys};
pub use errors::MemoryError;
pub use filters::{
    ConditionOp, FieldType, FilterRegistry, FilterableField, StructuredFilter, compile_filter,
    make_indexes,
};
pub use formatters::EntryFormatter;
pub use ingest::{DocumentIngestor, IngestOptions, IngestReport};
pub use pdf::{PdfPage, PdfPageExtractor};
pub use qdrant::QdrantConnector;
pub use sets::{DocumentSet, SetMatcher};
