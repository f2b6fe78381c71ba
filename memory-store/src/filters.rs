//! Filterable-field registry and filter compilation.
//!
//! The registry declares which metadata attributes are externally
//! filterable. [`compile_filter`] turns a name→value mapping into a
//! [`StructuredFilter`], a serde-friendly AND-tree that
//! [`to_qdrant_filter`] lowers to a Qdrant [`Filter`]. Clause order always
//! follows registry order, so equal inputs produce identical output.

use crate::entry::metadata_keys;
use crate::errors::MemoryError;

use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::{
    Condition, FieldCondition, FieldType as QdrantFieldType, Filter, Match, Range,
    condition::ConditionOneOf,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Semantic type of a filterable metadata field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Keyword,
    Integer,
    Float,
    Boolean,
}

/// Comparison operator a field supports in query filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

/// Declarative description of one externally filterable field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterableField {
    pub name: String,
    pub field_type: FieldType,
    /// `None` means the field is declared (indexed, reported in the schema)
    /// but never exposed as a search parameter.
    #[serde(default)]
    pub condition: Option<ConditionOp>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// Ordered collection of filterable fields. Names are unique; iteration
/// order is declaration order and drives compiled clause order.
#[derive(Clone, Debug, Default)]
pub struct FilterRegistry {
    fields: Vec<FilterableField>,
}

impl FilterRegistry {
    /// Builds a registry, rejecting duplicate field names.
    pub fn new(fields: Vec<FilterableField>) -> Result<Self, MemoryError> {
        for (i, f) in fields.iter().enumerate() {
            if fields.iter().skip(i + 1).any(|g| g.name == f.name) {
                return Err(MemoryError::Config(format!(
                    "duplicate filterable field '{}'",
                    f.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// The default registry exposes the PDF page fields with equality
    /// conditions; `total_pages` is declared without a condition, so it is
    /// indexed and reported but not exposed as a search parameter.
    pub fn default_pdf_fields() -> Self {
        Self {
            fields: vec![
                FilterableField {
                    name: metadata_keys::DOCUMENT_ID.into(),
                    field_type: FieldType::Keyword,
                    condition: Some(ConditionOp::Eq),
                    description: "Filter by source document identifier".into(),
                    required: false,
                },
                FilterableField {
                    name: metadata_keys::PAGE_LABEL.into(),
                    field_type: FieldType::Keyword,
                    condition: Some(ConditionOp::Eq),
                    description: "Filter by human-facing page label (e.g. 'iv', '45')".into(),
                    required: false,
                },
                FilterableField {
                    name: metadata_keys::PHYSICAL_PAGE_INDEX.into(),
                    field_type: FieldType::Integer,
                    condition: Some(ConditionOp::Eq),
                    description: "Filter by 0-based physical page index".into(),
                    required: false,
                },
                FilterableField {
                    name: metadata_keys::TOTAL_PAGES.into(),
                    field_type: FieldType::Integer,
                    condition: None,
                    description: "Total pages of the source document".into(),
                    required: false,
                },
            ],
        }
    }

    /// A registry with no fields; filtering is effectively disabled.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FilterableField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FilterableField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that carry a comparison condition, in registry order. Only
    /// these become externally visible search parameters.
    pub fn fields_with_conditions(&self) -> impl Iterator<Item = &FilterableField> {
        self.fields.iter().filter(|f| f.condition.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One AND-clause of a structured filter: an exact match or a range test
/// on a payload path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FilterClause {
    pub key: String,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none", default)]
    pub match_value: Option<MatchClause>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub range: Option<RangeClause>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MatchClause {
    pub value: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct RangeClause {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lte: Option<f64>,
}

/// Boolean AND-combination of per-field clauses, in registry order.
///
/// Serializes to the same JSON shape Qdrant's REST filter uses, so it can
/// travel through tool arguments as a plain JSON object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StructuredFilter {
    pub must: Vec<FilterClause>,
}

/// Compiles supplied field values into a [`StructuredFilter`].
///
/// Returns `Ok(None)` when no non-null values are supplied, so callers can
/// distinguish "no filtering" from a filter that matches nothing. `Null`
/// values are treated as absent.
///
/// Determinism contract: clauses appear in registry order. A value for a
/// name the registry does not know is a caller bug and fails with
/// [`MemoryError::Config`]; a value for a declared field without a
/// condition is skipped (with a debug log), never compiled.
pub fn compile_filter(
    registry: &FilterRegistry,
    values: &Map<String, Value>,
) -> Result<Option<StructuredFilter>, MemoryError> {
    for name in values.keys() {
        if registry.get(name).is_none() {
            return Err(MemoryError::Config(format!(
                "unknown filterable field '{name}'"
            )));
        }
    }

    let mut must = Vec::new();
    for field in registry.fields() {
        let Some(value) = values.get(&field.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let Some(op) = field.condition else {
            debug!(
                "field '{}' has no condition; excluded from compiled filter",
                field.name
            );
            continue;
        };

        let key = format!("metadata.{}", field.name);
        let clause = match op {
            ConditionOp::Eq => FilterClause {
                key,
                match_value: Some(MatchClause {
                    value: value.clone(),
                }),
                range: None,
            },
            _ => {
                let bound = value.as_f64().ok_or_else(|| {
                    MemoryError::Config(format!(
                        "field '{}' uses a range condition but value is not numeric",
                        field.name
                    ))
                })?;
                let mut range = RangeClause::default();
                match op {
                    ConditionOp::Gt => range.gt = Some(bound),
                    ConditionOp::Gte => range.gte = Some(bound),
                    ConditionOp::Lt => range.lt = Some(bound),
                    ConditionOp::Lte => range.lte = Some(bound),
                    ConditionOp::Eq => unreachable!(),
                }
                FilterClause {
                    key,
                    match_value: None,
                    range: Some(range),
                }
            }
        };
        must.push(clause);
    }

    if must.is_empty() {
        return Ok(None);
    }
    Ok(Some(StructuredFilter { must }))
}

/// Lowers a [`StructuredFilter`] to a Qdrant [`Filter`] with `must`
/// conditions.
pub fn to_qdrant_filter(f: &StructuredFilter) -> Filter {
    debug!("filters::to_qdrant_filter must={}", f.must.len());

    let mut must: Vec<Condition> = Vec::new();

    for clause in &f.must {
        let mut field = FieldCondition {
            key: clause.key.clone(),
            ..Default::default()
        };

        if let Some(m) = &clause.match_value {
            let mv = match &m.value {
                Value::String(s) => Some(MatchValue::Keyword(s.clone())),
                Value::Number(n) => n.as_i64().map(MatchValue::Integer),
                Value::Bool(b) => Some(MatchValue::Boolean(*b)),
                _ => None, // skip unsupported types
            };
            let Some(mv) = mv else { continue };
            field.r#match = Some(Match {
                match_value: Some(mv),
            });
        } else if let Some(r) = &clause.range {
            field.range = Some(Range {
                gt: r.gt,
                gte: r.gte,
                lt: r.lt,
                lte: r.lte,
            });
        } else {
            continue;
        }

        must.push(Condition {
            condition_one_of: Some(ConditionOneOf::Field(field)),
        });
    }

    Filter {
        must,
        ..Default::default()
    }
}

/// Payload index declarations for all registry fields, keyed by the
/// namespaced payload path. Used at collection-creation time.
pub fn make_indexes(registry: &FilterRegistry) -> Vec<(String, QdrantFieldType)> {
    registry
        .fields()
        .iter()
        .map(|f| {
            let schema = match f.field_type {
                FieldType::Keyword => QdrantFieldType::Keyword,
                FieldType::Integer => QdrantFieldType::Integer,
                FieldType::Float => QdrantFieldType::Float,
                FieldType::Boolean => QdrantFieldType::Bool,
            };
            (format!("metadata.{}", f.name), schema)
        })
        .collect()
}
