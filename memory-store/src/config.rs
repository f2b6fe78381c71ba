//! Runtime configuration, read once from the environment at startup.
//!
//! Components never look up environment variables themselves; they receive
//! immutable settings structs built here. `.env` loading stays in the
//! binary.

use crate::chunking::{ChunkStrategy, DocumentChunker};
use crate::errors::MemoryError;
use crate::filters::{FilterRegistry, FilterableField};

use std::env;

/// Where point data lives, as reported by the schema tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// Ephemeral in-process storage (`:memory:` or no location at all).
    Memory,
    /// On-disk storage next to the process.
    Local,
    /// A remote Qdrant server.
    Remote,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Memory => "memory",
            StorageMode::Local => "local",
            StorageMode::Remote => "remote",
        }
    }
}

/// Connection and tool-surface settings for the Qdrant backend.
#[derive(Clone, Debug)]
pub struct QdrantSettings {
    /// Server URL, e.g. `http://localhost:6334`; `:memory:` selects the
    /// ephemeral mode.
    pub url: Option<String>,
    /// Optional API key for Qdrant Cloud.
    pub api_key: Option<String>,
    /// On-disk storage path; mutually exclusive with `url`.
    pub local_path: Option<String>,
    /// Default collection; when set, tools stop asking for one.
    pub collection_name: Option<String>,
    /// Max results returned by a search.
    pub search_limit: usize,
    /// Drop the store tool entirely.
    pub read_only: bool,
    /// Expose a free-form filter parameter instead of per-field ones.
    pub allow_arbitrary_filter: bool,
    /// Declared filterable fields, from `QDRANT_FILTERABLE_FIELDS` (JSON).
    pub filterable_fields: Option<Vec<FilterableField>>,
}

impl QdrantSettings {
    /// Reads settings from the environment.
    ///
    /// # Errors
    /// Returns `MemoryError::Config` when `QDRANT_URL` and
    /// `QDRANT_LOCAL_PATH` are both set, or when
    /// `QDRANT_FILTERABLE_FIELDS` is not valid JSON.
    pub fn from_env() -> Result<Self, MemoryError> {
        let url = env_string("QDRANT_URL");
        let local_path = env_string("QDRANT_LOCAL_PATH");
        if url.is_some() && local_path.is_some() {
            return Err(MemoryError::Config(
                "QDRANT_URL and QDRANT_LOCAL_PATH are mutually exclusive".into(),
            ));
        }

        let filterable_fields = env_string("QDRANT_FILTERABLE_FIELDS")
            .map(|raw| parse_filterable_fields(&raw))
            .transpose()?;

        Ok(Self {
            url,
            api_key: env_string("QDRANT_API_KEY"),
            local_path,
            collection_name: env_string("COLLECTION_NAME"),
            search_limit: env_parse("QDRANT_SEARCH_LIMIT", 10)?,
            read_only: env_flag("QDRANT_READ_ONLY", false)?,
            allow_arbitrary_filter: env_flag("QDRANT_ALLOW_ARBITRARY_FILTER", false)?,
            filterable_fields,
        })
    }

    /// Classifies the configured location.
    pub fn storage_mode(&self) -> StorageMode {
        derive_storage_mode(self.url.as_deref(), self.local_path.as_deref())
    }

    /// Builds the filter registry from the declared fields, or the built-in
    /// PDF registry when none are declared and PDF ingestion is on.
    ///
    /// # Errors
    /// Returns `MemoryError::Config` on duplicate field names.
    pub fn filter_registry(&self, pdf_ingestion: bool) -> Result<FilterRegistry, MemoryError> {
        match &self.filterable_fields {
            Some(fields) => FilterRegistry::new(fields.clone()),
            None if pdf_ingestion => Ok(FilterRegistry::default_pdf_fields()),
            None => Ok(FilterRegistry::empty()),
        }
    }
}

/// Embedding backend settings (Ollama).
#[derive(Clone, Debug)]
pub struct EmbeddingSettings {
    /// Provider identifier, reported by the schema tool.
    pub provider: String,
    /// Ollama base URL.
    pub url: String,
    /// Model name.
    pub model: String,
    /// Expected embedding dimension.
    pub dim: usize,
    /// Named-vector identifier; `None` selects the legacy single-vector
    /// collection layout.
    pub vector_name: Option<String>,
    /// Max in-flight embedding requests.
    pub concurrency: usize,
}

impl EmbeddingSettings {
    /// Reads settings from the environment with local-Ollama defaults.
    ///
    /// # Errors
    /// Returns `MemoryError::Config` on unparseable numeric values.
    pub fn from_env() -> Result<Self, MemoryError> {
        Ok(Self {
            provider: "ollama".into(),
            url: env_string("OLLAMA_URL").unwrap_or_else(|| "http://localhost:11434".into()),
            model: env_string("EMBEDDING_MODEL").unwrap_or_else(|| "nomic-embed-text".into()),
            dim: env_parse("EMBEDDING_DIM", 768)?,
            vector_name: env_string("EMBEDDING_VECTOR_NAME"),
            concurrency: env_parse("EMBEDDING_CONCURRENCY", 4)?,
        })
    }
}

/// Document chunking settings.
#[derive(Clone, Debug)]
pub struct ChunkingSettings {
    pub enable_chunking: bool,
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
    pub strategy: ChunkStrategy,
}

impl ChunkingSettings {
    /// Reads settings from the environment; chunking is off by default.
    ///
    /// # Errors
    /// Returns `MemoryError::Config` on unparseable values or an unknown
    /// `CHUNK_STRATEGY`.
    pub fn from_env() -> Result<Self, MemoryError> {
        let strategy = match env_string("CHUNK_STRATEGY").as_deref() {
            None | Some("semantic") => ChunkStrategy::Semantic,
            Some("sentence") => ChunkStrategy::Sentence,
            Some("fixed") => ChunkStrategy::Fixed,
            Some(other) => {
                return Err(MemoryError::Config(format!(
                    "unknown CHUNK_STRATEGY '{other}' (expected semantic, sentence or fixed)"
                )));
            }
        };
        Ok(Self {
            enable_chunking: env_flag("ENABLE_CHUNKING", false)?,
            max_chunk_size: env_parse("MAX_CHUNK_SIZE", 512)?,
            chunk_overlap: env_parse("CHUNK_OVERLAP", 50)?,
            strategy,
        })
    }

    /// Builds the chunker, `None` when chunking is disabled.
    pub fn to_chunker(&self) -> Option<DocumentChunker> {
        self.enable_chunking.then(|| {
            DocumentChunker::new(self.strategy, self.max_chunk_size, self.chunk_overlap)
        })
    }
}

/// Tool descriptions and feature toggles for the callable surface.
#[derive(Clone, Debug)]
pub struct ToolSettings {
    pub store_description: String,
    pub find_description: String,
    pub enable_pdf_ingestion: bool,
    /// Optional document-set configuration file.
    pub sets_config_path: Option<String>,
}

impl ToolSettings {
    /// Reads settings from the environment.
    ///
    /// # Errors
    /// Returns `MemoryError::Config` on an unparseable boolean flag.
    pub fn from_env() -> Result<Self, MemoryError> {
        Ok(Self {
            store_description: env_string("TOOL_STORE_DESCRIPTION").unwrap_or_else(|| {
                "Keep the memory for later use, when you are asked to remember something.".into()
            }),
            find_description: env_string("TOOL_FIND_DESCRIPTION").unwrap_or_else(|| {
                "Look up memories in Qdrant. Use this tool when you need to find stored \
                 information by its meaning."
                    .into()
            }),
            enable_pdf_ingestion: env_flag("ENABLE_PDF_INGESTION", true)?,
            sets_config_path: env_string("QDRANT_SETS_CONFIG"),
        })
    }
}

/// Everything the server needs, read in one pass.
#[derive(Clone, Debug)]
pub struct Settings {
    pub qdrant: QdrantSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub tools: ToolSettings,
}

impl Settings {
    /// Reads all settings from the environment.
    ///
    /// # Errors
    /// Propagates the first configuration error encountered.
    pub fn from_env() -> Result<Self, MemoryError> {
        Ok(Self {
            qdrant: QdrantSettings::from_env()?,
            embedding: EmbeddingSettings::from_env()?,
            chunking: ChunkingSettings::from_env()?,
            tools: ToolSettings::from_env()?,
        })
    }
}

/// Parses the `QDRANT_FILTERABLE_FIELDS` JSON document.
pub fn parse_filterable_fields(raw: &str) -> Result<Vec<FilterableField>, MemoryError> {
    serde_json::from_str(raw)
        .map_err(|e| MemoryError::Config(format!("invalid QDRANT_FILTERABLE_FIELDS: {e}")))
}

fn derive_storage_mode(url: Option<&str>, local_path: Option<&str>) -> StorageMode {
    if local_path.is_some() {
        return StorageMode::Local;
    }
    match url {
        Some(":memory:") | None => StorageMode::Memory,
        Some(_) => StorageMode::Remote,
    }
}

/// Reads a variable, treating empty values as unset.
fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> Result<bool, MemoryError> {
    match env_string(key) {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(MemoryError::Config(format!(
                "{key} must be a boolean, got '{other}'"
            ))),
        },
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, MemoryError>
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| MemoryError::Config(format!("{key} must be numeric: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{ConditionOp, FieldType};

    #[test]
    fn storage_mode_classification() {
        assert_eq!(derive_storage_mode(None, None), StorageMode::Memory);
        assert_eq!(derive_storage_mode(Some(":memory:"), None), StorageMode::Memory);
        assert_eq!(
            derive_storage_mode(Some("http://localhost:6334"), None),
            StorageMode::Remote
        );
        assert_eq!(
            derive_storage_mode(None, Some("/var/qdrant")),
            StorageMode::Local
        );
    }

    #[test]
    fn filterable_fields_parse_from_json() {
        let raw = r#"[
            {"name": "author", "field_type": "keyword", "condition": "==", "description": "Author name"},
            {"name": "year", "field_type": "integer", "condition": ">=", "description": "Publication year"}
        ]"#;
        let fields = parse_filterable_fields(raw).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "author");
        assert_eq!(fields[0].field_type, FieldType::Keyword);
        assert_eq!(fields[1].condition, Some(ConditionOp::Gte));
    }

    #[test]
    fn filterable_fields_reject_bad_json() {
        assert!(parse_filterable_fields("not json").is_err());
        assert!(parse_filterable_fields(r#"[{"name": "x"}]"#).is_err());
    }

    #[test]
    fn chunking_settings_build_a_chunker_only_when_enabled() {
        let settings = ChunkingSettings {
            enable_chunking: false,
            max_chunk_size: 512,
            chunk_overlap: 50,
            strategy: ChunkStrategy::Semantic,
        };
        assert!(settings.to_chunker().is_none());

        let settings = ChunkingSettings {
            enable_chunking: true,
            ..settings
        };
        assert!(settings.to_chunker().is_some());
    }
}
