//! Tool assembly: builds the connector, the base tools and the wrapped
//! surface exposed over HTTP.

use memory_store::embed::ollama::{OllamaConfig, OllamaEmbedder};
use memory_store::formatters::XmlEntryFormatter;
use memory_store::{
    DocumentIngestor, Entry, EntryFormatter, FilterRegistry, Metadata, QdrantConnector,
    SetMatcher, Settings, StructuredFilter, make_indexes,
};
use memory_tools::{
    ParamKind, ParamSpec, Tool, ToolError, ToolSpec, make_partial_function, wrap_filters,
};

use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};

/// The assembled memory server: connector, ingestor and the tool list in
/// registration order.
pub struct MemoryServer {
    tools: Vec<Tool>,
    ingestor: DocumentIngestor,
    sets: SetMatcher,
    settings: Settings,
}

impl MemoryServer {
    /// Wires the embedding provider, the Qdrant connector and the tools.
    ///
    /// Tool assembly order: the find tool gets per-field filter parameters
    /// when the registry declares any conditions; otherwise the filter slot
    /// is pinned to null unless arbitrary filters are allowed. A default
    /// collection pins `collection_name` on both tools. The store tool is
    /// skipped entirely in read-only mode.
    ///
    /// # Errors
    /// Configuration errors from the registry or the wrappers.
    pub fn build(settings: Settings) -> Result<Self, ToolError> {
        let provider = Arc::new(OllamaEmbedder::new(OllamaConfig {
            url: settings.embedding.url.clone(),
            model: settings.embedding.model.clone(),
            dim: settings.embedding.dim,
            vector_name: settings.embedding.vector_name.clone(),
            concurrency: settings.embedding.concurrency,
        }));

        let registry = settings
            .qdrant
            .filter_registry(settings.tools.enable_pdf_ingestion)?;

        let url = settings
            .qdrant
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:6334".into());
        let connector = Arc::new(QdrantConnector::new(
            &url,
            settings.qdrant.api_key.as_deref(),
            settings.qdrant.collection_name.clone(),
            provider,
            make_indexes(&registry),
            settings.chunking.to_chunker(),
        )?);

        let formatter: Arc<dyn EntryFormatter> = Arc::new(XmlEntryFormatter);

        let mut find = find_tool(
            Arc::clone(&connector),
            Arc::clone(&formatter),
            settings.qdrant.search_limit as u64,
            &settings.tools.find_description,
        );
        let mut store = store_tool(Arc::clone(&connector), &settings.tools.store_description);

        let has_conditions = registry.fields_with_conditions().next().is_some();
        debug!(
            "Assembling tools: filter conditions={} arbitrary_filter={}",
            has_conditions, settings.qdrant.allow_arbitrary_filter
        );

        if has_conditions {
            find = wrap_filters(find, &registry)?;
        } else if !settings.qdrant.allow_arbitrary_filter {
            let mut fixed = Map::new();
            fixed.insert("query_filter".into(), Value::Null);
            find = make_partial_function(find, fixed)?;
        }

        if let Some(collection) = &settings.qdrant.collection_name {
            let mut fixed = Map::new();
            fixed.insert("collection_name".into(), Value::from(collection.clone()));
            find = make_partial_function(find, fixed.clone())?;
            store = make_partial_function(store, fixed)?;
        }

        let mut tools = vec![find];
        if !settings.qdrant.read_only {
            tools.push(store);
        }
        tools.push(schema_tool(&settings, &registry));

        info!(
            "Memory server ready: {} tools, storage mode {}",
            tools.len(),
            settings.qdrant.storage_mode().as_str()
        );

        let ingestor =
            DocumentIngestor::new(connector, settings.tools.enable_pdf_ingestion);
        let sets = match &settings.tools.sets_config_path {
            Some(path) => SetMatcher::from_config_file(path)?,
            None => SetMatcher::empty(),
        };

        Ok(Self {
            tools,
            ingestor,
            sets,
            settings,
        })
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn ingestor(&self) -> &DocumentIngestor {
        &self.ingestor
    }

    pub fn set_matcher(&self) -> &SetMatcher {
        &self.sets
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgument(format!("missing string parameter '{name}'")))
}

/// Base semantic-search tool, before any wrapping.
fn find_tool(
    connector: Arc<QdrantConnector>,
    formatter: Arc<dyn EntryFormatter>,
    limit: u64,
    description: &str,
) -> Tool {
    let spec = ToolSpec::new(
        "qdrant-find",
        description,
        vec![
            ParamSpec::required("query", ParamKind::String, "What to search for"),
            ParamSpec::required(
                "collection_name",
                ParamKind::String,
                "The collection to search in",
            ),
            ParamSpec::optional(
                "query_filter",
                ParamKind::Filter,
                "The filter to apply to the query",
            ),
        ],
    );

    Tool::new(
        spec,
        Arc::new(move |args: Map<String, Value>| {
            let connector = Arc::clone(&connector);
            let formatter = Arc::clone(&formatter);
            Box::pin(async move {
                let query = required_str(&args, "query")?.to_string();
                let collection = required_str(&args, "collection_name")?.to_string();

                let filter: Option<StructuredFilter> = match args.get("query_filter") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(serde_json::from_value(v.clone()).map_err(|e| {
                        ToolError::InvalidArgument(format!("invalid query_filter: {e}"))
                    })?),
                };

                debug!("Finding results for query '{query}' in '{collection}'");
                let entries = connector
                    .search(&query, Some(&collection), limit, filter.as_ref())
                    .await?;

                if entries.is_empty() {
                    return Ok(Value::Null);
                }
                let mut content = vec![Value::from(format!("Results for the query '{query}'"))];
                for entry in &entries {
                    content.push(Value::from(formatter.format(entry)));
                }
                Ok(Value::Array(content))
            })
        }),
    )
}

/// Base store tool, before any wrapping.
fn store_tool(connector: Arc<QdrantConnector>, description: &str) -> Tool {
    let spec = ToolSpec::new(
        "qdrant-store",
        description,
        vec![
            ParamSpec::required("information", ParamKind::String, "Text to store"),
            ParamSpec::required(
                "collection_name",
                ParamKind::String,
                "The collection to store the information in",
            ),
            ParamSpec::optional(
                "metadata",
                ParamKind::Object,
                "Extra metadata stored along with memorised information. Any json is accepted.",
            ),
        ],
    );

    Tool::new(
        spec,
        Arc::new(move |args: Map<String, Value>| {
            let connector = Arc::clone(&connector);
            Box::pin(async move {
                let information = required_str(&args, "information")?.to_string();
                let collection = required_str(&args, "collection_name")?.to_string();
                let metadata: Option<Metadata> = match args.get("metadata") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(serde_json::from_value(v.clone()).map_err(|e| {
                        ToolError::InvalidArgument(format!("invalid metadata: {e}"))
                    })?),
                };

                debug!("Storing information in '{collection}'");
                connector
                    .store(Entry::new(information.clone(), metadata), Some(&collection))
                    .await?;
                Ok(Value::from(format!(
                    "Remembered: {information} in collection {collection}"
                )))
            })
        }),
    )
}

/// Introspection tool reporting the server configuration.
fn schema_tool(settings: &Settings, registry: &FilterRegistry) -> Tool {
    let spec = ToolSpec::new(
        "qdrant-get-schema",
        "Get the current server configuration schema including collection name, embedding \
         provider, filterable fields, and RAG settings. Use this to discover what filters are \
         available before searching.",
        vec![],
    );

    let filters: Vec<Value> = registry
        .fields()
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "type": f.field_type,
                "description": f.description,
                "condition": f.condition,
            })
        })
        .collect();

    let schema = json!({
        "collection_name": settings.qdrant.collection_name.as_deref().unwrap_or("default"),
        "storage_mode": settings.qdrant.storage_mode().as_str(),
        "embedding": {
            "provider": settings.embedding.provider,
            "model": settings.embedding.model,
            "vector_size": settings.embedding.dim,
            "vector_name": settings.embedding.vector_name,
        },
        "filters": filters,
        "rag_settings": {
            "chunking_enabled": settings.chunking.enable_chunking,
            "pdf_ingestion_enabled": settings.tools.enable_pdf_ingestion,
        },
    });

    Tool::new(
        spec,
        Arc::new(move |_args: Map<String, Value>| {
            let schema = schema.clone();
            Box::pin(async move { Ok(schema) })
        }),
    )
}
