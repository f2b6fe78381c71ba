//! Thin connector around `qdrant-client` owning the session to the server.
//!
//! Concentrates all Qdrant interactions behind a minimal API: idempotent
//! collection creation, chunked storage, and filtered similarity search.
//! The connector reconciles two storage layouts on both write and read:
//! named vectors with a `document` + `metadata` payload, and the legacy
//! single unnamed vector with a `text` + flattened payload.

use crate::chunking::DocumentChunker;
use crate::entry::{Entry, Metadata, metadata_keys};
use crate::errors::MemoryError;
use crate::filters::{StructuredFilter, to_qdrant_filter};
use crate::embed::EmbeddingProvider;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance,
    FieldType as QdrantFieldType, ListValue, NamedVectors, PointStruct, ScoredPoint,
    SearchPointsBuilder, Struct, UpsertPointsBuilder, Value as QValue, Vector, VectorParamsBuilder,
    Vectors, VectorsConfig, value, vectors, vectors_config,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Marker Qdrant emits when a named vector does not exist in a collection.
/// Detecting it lets us fall back to the legacy unnamed-vector layout.
const VECTOR_NAME_NOT_FOUND: &str = "not found in the collection";

/// Encapsulates the connection to a Qdrant server and all the methods to
/// interact with it.
pub struct QdrantConnector {
    client: Qdrant,
    default_collection: Option<String>,
    provider: Arc<dyn EmbeddingProvider>,
    field_indexes: Vec<(String, QdrantFieldType)>,
    chunker: Option<DocumentChunker>,
}

impl QdrantConnector {
    /// Creates a connector from a URL and optional API key.
    ///
    /// `field_indexes` are declared on every collection this connector
    /// creates; `chunker` being `None` disables chunked storage (the
    /// capability is resolved once, here, not per call).
    pub fn new(
        url: &str,
        api_key: Option<&str>,
        default_collection: Option<String>,
        provider: Arc<dyn EmbeddingProvider>,
        field_indexes: Vec<(String, QdrantFieldType)>,
        chunker: Option<DocumentChunker>,
    ) -> Result<Self, MemoryError> {
        let mut builder = Qdrant::from_url(url.trim_end_matches('/'));
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| MemoryError::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            default_collection,
            provider,
            field_indexes,
            chunker,
        })
    }

    /// Names of all collections on the server.
    pub async fn list_collections(&self) -> Result<Vec<String>, MemoryError> {
        let res = self
            .client
            .list_collections()
            .await
            .map_err(|e| MemoryError::Qdrant(e.to_string()))?;
        Ok(res.collections.into_iter().map(|c| c.name).collect())
    }

    fn resolve_collection<'a>(
        &'a self,
        collection_name: Option<&'a str>,
    ) -> Result<&'a str, MemoryError> {
        collection_name
            .or(self.default_collection.as_deref())
            .ok_or_else(|| MemoryError::Config("collection name must be provided".into()))
    }

    /// Stores an entry, splitting it into independent chunk points when the
    /// chunker is enabled and produces more than one chunk.
    ///
    /// Each chunk is embedded and upserted on its own; a failure mid-way
    /// leaves earlier chunks persisted (no cross-chunk rollback). Callers
    /// needing atomicity must dedupe at a higher layer.
    pub async fn store(
        &self,
        entry: Entry,
        collection_name: Option<&str>,
    ) -> Result<(), MemoryError> {
        let collection = self.resolve_collection(collection_name)?;
        self.ensure_collection(collection).await?;

        if let Some(chunker) = &self.chunker {
            let chunks = chunker.chunk_text(&entry.content);
            if chunks.len() > 1 {
                info!("Document split into {} chunks", chunks.len());
                let total = chunks.len();
                for (i, chunk) in chunks.into_iter().enumerate() {
                    let mut metadata = entry.metadata.clone().unwrap_or_default();
                    metadata.insert(metadata_keys::CHUNK_INDEX.into(), Value::from(i));
                    metadata.insert(metadata_keys::TOTAL_CHUNKS.into(), Value::from(total));
                    metadata.insert(metadata_keys::IS_CHUNK.into(), Value::from(true));
                    self.store_single(Entry::new(chunk, Some(metadata)), collection)
                        .await?;
                }
                return Ok(());
            }
        }

        self.store_single(entry, collection).await
    }

    /// Embeds and upserts exactly one point for one entry.
    async fn store_single(&self, entry: Entry, collection: &str) -> Result<(), MemoryError> {
        let texts = [entry.content.clone()];
        let mut embeddings = self.provider.embed_documents(&texts).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| MemoryError::Embedding("provider returned no vectors".into()))?;

        let (vectors, payload) = match self.provider.vector_name() {
            Some(name) => {
                // Named-vector layout: metadata kept as a nested object.
                let vectors = Vectors {
                    vectors_options: Some(vectors::VectorsOptions::Vectors(NamedVectors {
                        vectors: HashMap::from([(name, plain_vector(embedding))]),
                    })),
                };
                let mut payload: HashMap<String, QValue> = HashMap::new();
                payload.insert("document".into(), qstring(&entry.content));
                if let Some(meta) = &entry.metadata {
                    payload.insert("metadata".into(), metadata_to_qvalue(meta));
                }
                (vectors, payload)
            }
            None => {
                // Legacy layout: single unnamed vector, metadata flattened
                // next to a `text` field.
                let vectors = Vectors {
                    vectors_options: Some(vectors::VectorsOptions::Vector(plain_vector(embedding))),
                };
                let mut payload: HashMap<String, QValue> = HashMap::new();
                payload.insert("text".into(), qstring(&entry.content));
                if let Some(meta) = &entry.metadata {
                    for (k, v) in meta {
                        payload.insert(k.clone(), json_to_qvalue(v.clone()));
                    }
                }
                (vectors, payload)
            }
        };

        let point = PointStruct {
            id: Some(Uuid::new_v4().to_string().into()),
            vectors: Some(vectors),
            payload,
            ..Default::default()
        };

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![point]))
            .await
            .map_err(|e| MemoryError::Qdrant(e.to_string()))?;

        debug!("Stored one point in collection '{}'", collection);
        Ok(())
    }

    /// Similarity search over a collection.
    ///
    /// Returns an empty list when the collection does not exist. The query
    /// is embedded once; a named-vector search is attempted first when the
    /// provider names its vectors, falling back a single time to an unnamed
    /// search when the collection predates named vectors. Any other error
    /// propagates unmodified.
    pub async fn search(
        &self,
        query: &str,
        collection_name: Option<&str>,
        limit: u64,
        filter: Option<&StructuredFilter>,
    ) -> Result<Vec<Entry>, MemoryError> {
        let collection = self.resolve_collection(collection_name)?;

        let exists = self
            .client
            .collection_exists(collection)
            .await
            .map_err(|e| MemoryError::Qdrant(e.to_string()))?;
        if !exists {
            debug!("Collection '{}' does not exist; empty result", collection);
            return Ok(Vec::new());
        }

        let query_vector = self.provider.embed_query(query).await?;
        let qfilter = filter.map(to_qdrant_filter);

        let points = match self.provider.vector_name() {
            Some(name) => {
                let result = self
                    .run_search(collection, query_vector.clone(), limit, qfilter.clone(), Some(&name))
                    .await;
                match result {
                    Ok(points) => points,
                    Err(err) if err.to_string().contains(VECTOR_NAME_NOT_FOUND) => {
                        warn!(
                            "Vector name '{}' not found in collection '{}'; falling back to single-vector query",
                            name, collection
                        );
                        self.run_search(collection, query_vector, limit, qfilter, None)
                            .await
                            .map_err(|e| MemoryError::Qdrant(e.to_string()))?
                    }
                    Err(err) => return Err(MemoryError::Qdrant(err.to_string())),
                }
            }
            None => self
                .run_search(collection, query_vector, limit, qfilter, None)
                .await
                .map_err(|e| MemoryError::Qdrant(e.to_string()))?,
        };

        let entries = points
            .into_iter()
            .map(|p| {
                let payload = qpayload_to_json(p.payload);
                let (content, metadata) = decode_payload(&payload);
                Entry::new(content, metadata)
            })
            .collect();
        Ok(entries)
    }

    async fn run_search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<qdrant_client::qdrant::Filter>,
        vector_name: Option<&str>,
    ) -> Result<Vec<ScoredPoint>, qdrant_client::QdrantError> {
        let mut builder = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        if let Some(f) = filter {
            builder = builder.filter(f);
        }
        if let Some(name) = vector_name {
            builder = builder.vector_name(name);
        }
        let res = self.client.search_points(builder).await?;
        Ok(res.result)
    }

    /// Ensures that the collection exists, creating it if necessary.
    ///
    /// Idempotent. New collections take their vector size and naming from
    /// the embedding provider; payload indexes are declared per configured
    /// field, and index-creation failures are logged rather than failing
    /// the store operation that triggered them.
    pub async fn ensure_collection(&self, collection: &str) -> Result<(), MemoryError> {
        let exists = self
            .client
            .collection_exists(collection)
            .await
            .map_err(|e| MemoryError::Qdrant(e.to_string()))?;
        if exists {
            return Ok(());
        }

        let size = self.provider.vector_size() as u64;
        let params = VectorParamsBuilder::new(size, Distance::Cosine).build();
        let config = match self.provider.vector_name() {
            Some(name) => VectorsConfig {
                config: Some(vectors_config::Config::ParamsMap(
                    qdrant_client::qdrant::VectorParamsMap {
                        map: HashMap::from([(name, params)]),
                    },
                )),
            },
            None => VectorsConfig {
                config: Some(vectors_config::Config::Params(params)),
            },
        };

        info!("Creating collection '{}' (size={})", collection, size);
        self.client
            .create_collection(CreateCollectionBuilder::new(collection).vectors_config(config))
            .await
            .map_err(|e| MemoryError::Qdrant(e.to_string()))?;

        for (field, schema) in &self.field_indexes {
            let res = self
                .client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    collection,
                    field.clone(),
                    *schema,
                ))
                .await;
            if let Err(err) = res {
                warn!(
                    "Failed to create payload index '{}' on '{}': {}",
                    field, collection, err
                );
            }
        }

        Ok(())
    }
}

/// Reconstructs entry content and metadata from a decoded payload.
///
/// Branches on payload shape: the named-vector layout carries a `document`
/// key with a nested `metadata` object; the legacy layout carries `text`
/// with metadata flattened beside it. Unknown shapes fall back to
/// stringifying the whole payload as content; malformed legacy data never
/// raises.
pub fn decode_payload(payload: &Value) -> (String, Option<Metadata>) {
    let Some(obj) = payload.as_object() else {
        return (payload.to_string(), None);
    };

    if let Some(document) = obj.get("document").and_then(|v| v.as_str()) {
        let metadata = obj
            .get("metadata")
            .and_then(|v| v.as_object())
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        return (document.to_string(), metadata);
    }

    if let Some(text) = obj.get("text").and_then(|v| v.as_str()) {
        let metadata: Metadata = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "text")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let metadata = (!metadata.is_empty()).then_some(metadata);
        return (text.to_string(), metadata);
    }

    (payload.to_string(), None)
}

// ---------- payload conversion helpers ----------

fn plain_vector(data: Vec<f32>) -> Vector {
    Vector {
        data,
        indices: None,
        vectors_count: None,
        vector: None,
    }
}

/// Wraps a string into Qdrant `Value`.
fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(value::Kind::StringValue(s.to_string())),
    }
}

fn metadata_to_qvalue(meta: &Metadata) -> QValue {
    let fields = meta
        .iter()
        .map(|(k, v)| (k.clone(), json_to_qvalue(v.clone())))
        .collect();
    QValue {
        kind: Some(value::Kind::StructValue(Struct { fields })),
    }
}

/// Converts `serde_json::Value` into Qdrant `Value` (handles arrays/objects).
fn json_to_qvalue(v: Value) -> QValue {
    use value::Kind as K;
    match v {
        Value::String(s) => QValue {
            kind: Some(K::StringValue(s)),
        },
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                QValue {
                    kind: Some(K::IntegerValue(i)),
                }
            } else if let Some(f) = n.as_f64() {
                QValue {
                    kind: Some(K::DoubleValue(f)),
                }
            } else {
                QValue {
                    kind: Some(K::StringValue(n.to_string())),
                }
            }
        }
        Value::Bool(b) => QValue {
            kind: Some(K::BoolValue(b)),
        },
        Value::Array(arr) => {
            let vals: Vec<QValue> = arr.into_iter().map(json_to_qvalue).collect();
            QValue {
                kind: Some(K::ListValue(ListValue { values: vals })),
            }
        }
        Value::Object(map) => {
            let fields = map
                .into_iter()
                .map(|(k, v)| (k, json_to_qvalue(v)))
                .collect();
            QValue {
                kind: Some(K::StructValue(Struct { fields })),
            }
        }
        Value::Null => QValue { kind: None },
    }
}

/// Converts a Qdrant payload (`HashMap<String, qdrant::Value>`) into JSON,
/// recursing into nested structs and lists.
fn qpayload_to_json(p: HashMap<String, QValue>) -> Value {
    let mut m = serde_json::Map::new();
    for (k, v) in p {
        m.insert(k, qvalue_to_json(v));
    }
    Value::Object(m)
}

fn qvalue_to_json(v: QValue) -> Value {
    use value::Kind as K;
    match v.kind {
        Some(K::StringValue(s)) => Value::String(s),
        Some(K::IntegerValue(i)) => Value::Number(i.into()),
        Some(K::DoubleValue(f)) => serde_json::json!(f),
        Some(K::BoolValue(b)) => Value::Bool(b),
        Some(K::ListValue(list)) => Value::Array(list.values.into_iter().map(qvalue_to_json).collect()),
        Some(K::StructValue(st)) => Value::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, qvalue_to_json(v)))
                .collect(),
        ),
        Some(K::NullValue(_)) | None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_named_vector_payload_shape() {
        let payload = json!({
            "document": "the content",
            "metadata": {"document_id": "doc1", "physical_page_index": 4}
        });
        let (content, metadata) = decode_payload(&payload);
        assert_eq!(content, "the content");
        let meta = metadata.unwrap();
        assert_eq!(meta["document_id"], json!("doc1"));
        assert_eq!(meta["physical_page_index"], json!(4));
    }

    #[test]
    fn decodes_legacy_payload_shape() {
        let payload = json!({"text": "legacy content", "source": "old.db", "year": 2019});
        let (content, metadata) = decode_payload(&payload);
        assert_eq!(content, "legacy content");
        let meta = metadata.unwrap();
        assert_eq!(meta["source"], json!("old.db"));
        assert_eq!(meta["year"], json!(2019));
        assert!(!meta.contains_key("text"));
    }

    #[test]
    fn legacy_payload_with_only_text_has_no_metadata() {
        let payload = json!({"text": "bare"});
        let (content, metadata) = decode_payload(&payload);
        assert_eq!(content, "bare");
        assert!(metadata.is_none());
    }

    #[test]
    fn unknown_shape_falls_back_to_stringified_content() {
        let payload = json!({"blob": [1, 2, 3]});
        let (content, metadata) = decode_payload(&payload);
        assert!(content.contains("blob"));
        assert!(metadata.is_none());
    }

    #[test]
    fn json_qvalue_round_trip_preserves_nested_metadata() {
        let original = json!({
            "document_id": "doc1",
            "nested": {"tags": ["a", "b"], "depth": 2},
            "flag": true,
            "ratio": 0.5
        });
        let q = json_to_qvalue(original.clone());
        assert_eq!(qvalue_to_json(q), original);
    }
}
