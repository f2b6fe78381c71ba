//! Partial application for tools.
//!
//! [`make_partial_function`] pins some parameters to fixed values and
//! removes them from the visible spec, so hosting layers stop asking
//! callers for them.

use crate::tool::{Tool, ToolError, ToolHandler};

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Pins `fixed` parameter values on `tool`.
///
/// The pinned parameters disappear from the visible spec; their values are
/// injected into every call before the inner tool runs. Callers that still
/// pass a pinned name are rejected by the wrapped tool's own argument
/// validation, since the name is no longer declared.
///
/// # Errors
/// `ToolError::Config` when a fixed name does not match any declared
/// parameter.
pub fn make_partial_function(tool: Tool, fixed: Map<String, Value>) -> Result<Tool, ToolError> {
    for name in fixed.keys() {
        if tool.spec().param(name).is_none() {
            return Err(ToolError::Config(format!(
                "cannot fix unknown parameter '{name}' on tool '{}'",
                tool.spec().name
            )));
        }
    }

    let (mut spec, _) = tool.clone().into_parts();
    spec.params.retain(|p| !fixed.contains_key(&p.name));

    debug!(
        "make_partial_function tool='{}' fixed={}",
        spec.name,
        fixed.len()
    );

    let inner = Arc::new(tool);
    let handler: ToolHandler = Arc::new(move |mut args: Map<String, Value>| {
        let inner = Arc::clone(&inner);
        let fixed = fixed.clone();
        Box::pin(async move {
            for (name, value) in fixed {
                args.insert(name, value);
            }
            inner.invoke(args).await
        })
    });

    Ok(Tool::new(spec, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamKind, ParamSpec, ToolSpec};
    use serde_json::json;

    fn store_tool() -> Tool {
        let spec = ToolSpec::new(
            "qdrant-store",
            "Store a memory",
            vec![
                ParamSpec::required("information", ParamKind::String, "Text to remember"),
                ParamSpec::required("collection_name", ParamKind::String, "Target collection"),
            ],
        );
        Tool::new(
            spec,
            Arc::new(|args| Box::pin(async move { Ok(Value::Object(args)) })),
        )
    }

    #[test]
    fn fixed_parameters_disappear_from_the_spec() {
        let mut fixed = Map::new();
        fixed.insert("collection_name".into(), json!("memories"));
        let partial = make_partial_function(store_tool(), fixed).unwrap();
        let names: Vec<_> = partial.spec().params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["information"]);
    }

    #[test]
    fn unknown_fixed_name_fails_at_construction() {
        let mut fixed = Map::new();
        fixed.insert("nope".into(), json!(1));
        assert!(matches!(
            make_partial_function(store_tool(), fixed),
            Err(ToolError::Config(_))
        ));
    }

    #[tokio::test]
    async fn fixed_values_reach_the_inner_handler() {
        let mut fixed = Map::new();
        fixed.insert("collection_name".into(), json!("memories"));
        let partial = make_partial_function(store_tool(), fixed).unwrap();

        let mut args = Map::new();
        args.insert("information".into(), json!("the wifi password"));
        let out = partial.invoke(args).await.unwrap();
        assert_eq!(out["collection_name"], json!("memories"));
        assert_eq!(out["information"], json!("the wifi password"));
    }

    #[tokio::test]
    async fn callers_cannot_override_a_fixed_parameter() {
        let mut fixed = Map::new();
        fixed.insert("collection_name".into(), json!("memories"));
        let partial = make_partial_function(store_tool(), fixed).unwrap();

        let mut args = Map::new();
        args.insert("information".into(), json!("x"));
        args.insert("collection_name".into(), json!("other"));
        // The name is no longer declared, so it is rejected outright.
        assert!(partial.invoke(args).await.is_err());
    }

    #[tokio::test]
    async fn fixing_a_parameter_to_null_satisfies_optional_slots() {
        let spec = ToolSpec::new(
            "find",
            "",
            vec![
                ParamSpec::required("query", ParamKind::String, ""),
                ParamSpec::optional("query_filter", ParamKind::Filter, ""),
            ],
        );
        let tool = Tool::new(
            spec,
            Arc::new(|args| Box::pin(async move { Ok(Value::Object(args)) })),
        );
        let mut fixed = Map::new();
        fixed.insert("query_filter".into(), Value::Null);
        let partial = make_partial_function(tool, fixed).unwrap();

        let mut args = Map::new();
        args.insert("query".into(), json!("q"));
        let out = partial.invoke(args).await.unwrap();
        assert_eq!(out["query_filter"], Value::Null);
    }
}
