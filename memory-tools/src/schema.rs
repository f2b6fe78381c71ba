//! Explicit parameter schemas for JSON-argument tools.
//!
//! Every tool declares its parameters up front as data, so hosting layers
//! can render a JSON Schema without inspecting handler code, and wrappers
//! can rewrite the parameter list without touching the handler.

use memory_store::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Kind of a single tool parameter.
///
/// `Filter` marks the placeholder slot that [`wrap_filters`] replaces with
/// per-field parameters; it renders as a JSON object.
///
/// [`wrap_filters`]: crate::wrap::wrap_filters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    Filter,
}

impl ParamKind {
    /// JSON Schema `type` keyword for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Float => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Object | ParamKind::Filter => "object",
        }
    }

    /// Whether a JSON value is acceptable for this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Float => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Object | ParamKind::Filter => value.is_object(),
        }
    }
}

impl From<FieldType> for ParamKind {
    fn from(t: FieldType) -> Self {
        match t {
            FieldType::Keyword => ParamKind::String,
            FieldType::Integer => ParamKind::Integer,
            FieldType::Float => ParamKind::Float,
            FieldType::Boolean => ParamKind::Boolean,
        }
    }
}

/// One declared tool parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
        }
    }
}

/// Name, description and parameter list of a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<ParamSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Renders the parameter list as a JSON Schema object, in declaration
    /// order.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for p in &self.params {
            properties.insert(
                p.name.clone(),
                json!({
                    "type": p.kind.json_type(),
                    "description": p.description,
                }),
            );
            if p.required {
                required.push(Value::from(p.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_schema_lists_properties_and_required_names() {
        let spec = ToolSpec::new(
            "qdrant-find",
            "Find memories",
            vec![
                ParamSpec::required("query", ParamKind::String, "Search query"),
                ParamSpec::optional("query_filter", ParamKind::Filter, "Optional filter"),
            ],
        );
        let schema = spec.json_schema();
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["query_filter"]["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn param_kinds_accept_matching_json_values() {
        assert!(ParamKind::String.accepts(&json!("x")));
        assert!(!ParamKind::String.accepts(&json!(1)));
        assert!(ParamKind::Integer.accepts(&json!(3)));
        assert!(!ParamKind::Integer.accepts(&json!(3.5)));
        assert!(ParamKind::Float.accepts(&json!(3)));
        assert!(ParamKind::Filter.accepts(&json!({"must": []})));
    }

    #[test]
    fn field_types_map_to_param_kinds() {
        assert_eq!(ParamKind::from(FieldType::Keyword), ParamKind::String);
        assert_eq!(ParamKind::from(FieldType::Integer), ParamKind::Integer);
        assert_eq!(ParamKind::from(FieldType::Float), ParamKind::Float);
        assert_eq!(ParamKind::from(FieldType::Boolean), ParamKind::Boolean);
    }
}
