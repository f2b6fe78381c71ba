//! Filter-aware signature rewriting.
//!
//! [`wrap_filters`] replaces a tool's single filter placeholder parameter
//! with one optional parameter per filterable field. Callers see plain
//! per-field parameters; the inner handler still receives one structured
//! filter under the placeholder name.

use crate::schema::{ParamKind, ParamSpec};
use crate::tool::{Tool, ToolError, ToolHandler};

use memory_store::{FilterRegistry, compile_filter};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Rewrites `tool` so each registry field with a condition becomes its own
/// optional parameter, in registry order, at the placeholder's position.
///
/// At call time the per-field arguments are collected, compiled into a
/// structured filter and injected under the placeholder name before the
/// inner tool runs. Omitted and null fields compile to no filter at all.
///
/// # Errors
/// `ToolError::Config` when the tool has no `ParamKind::Filter` parameter,
/// has more than one, or a field name collides with an existing parameter.
pub fn wrap_filters(tool: Tool, registry: &FilterRegistry) -> Result<Tool, ToolError> {
    let spec = tool.spec();
    let placeholders: Vec<usize> = spec
        .params
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind == ParamKind::Filter)
        .map(|(i, _)| i)
        .collect();
    let placeholder_index = match placeholders.as_slice() {
        [i] => *i,
        [] => {
            return Err(ToolError::Config(format!(
                "tool '{}' has no filter placeholder parameter",
                spec.name
            )));
        }
        _ => {
            return Err(ToolError::Config(format!(
                "tool '{}' has more than one filter placeholder",
                spec.name
            )));
        }
    };

    let dynamic: Vec<ParamSpec> = registry
        .fields_with_conditions()
        .map(|f| ParamSpec {
            name: f.name.clone(),
            kind: ParamKind::from(f.field_type),
            description: f.description.clone(),
            required: f.required,
        })
        .collect();

    for field in &dynamic {
        if spec
            .params
            .iter()
            .enumerate()
            .any(|(i, p)| i != placeholder_index && p.name == field.name)
        {
            return Err(ToolError::Config(format!(
                "filterable field '{}' collides with a parameter of tool '{}'",
                field.name, spec.name
            )));
        }
    }

    let (mut new_spec, _) = tool.clone().into_parts();
    let placeholder_name = new_spec.params.remove(placeholder_index).name;
    for (offset, param) in dynamic.iter().cloned().enumerate() {
        new_spec.params.insert(placeholder_index + offset, param);
    }

    debug!(
        "wrap_filters tool='{}' fields={}",
        new_spec.name,
        dynamic.len()
    );

    let inner = Arc::new(tool);
    let registry = registry.clone();
    let dynamic_names: Vec<String> = dynamic.into_iter().map(|p| p.name).collect();

    let handler: ToolHandler = Arc::new(move |mut args: Map<String, Value>| {
        let inner = Arc::clone(&inner);
        let registry = registry.clone();
        let placeholder_name = placeholder_name.clone();
        let dynamic_names = dynamic_names.clone();
        Box::pin(async move {
            let mut values = Map::new();
            for name in &dynamic_names {
                if let Some(v) = args.remove(name) {
                    values.insert(name.clone(), v);
                }
            }

            let filter = compile_filter(&registry, &values)
                .map_err(|e| ToolError::InvalidArgument(e.to_string()))?;
            let filter_value = match filter {
                Some(f) => serde_json::to_value(f)
                    .map_err(|e| ToolError::Config(e.to_string()))?,
                None => Value::Null,
            };
            args.insert(placeholder_name, filter_value);

            inner.invoke(args).await
        })
    });

    Ok(Tool::new(new_spec, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partial::make_partial_function;
    use crate::schema::ToolSpec;
    use memory_store::{ConditionOp, FieldType, FilterableField};
    use proptest::prelude::*;
    use serde_json::json;

    fn base_find_tool() -> Tool {
        let spec = ToolSpec::new(
            "qdrant-find",
            "Find memories",
            vec![
                ParamSpec::required("query", ParamKind::String, "Search query"),
                ParamSpec::required("collection_name", ParamKind::String, "Target collection"),
                ParamSpec::optional("query_filter", ParamKind::Filter, "Structured filter"),
            ],
        );
        // The handler reflects its arguments back so tests can observe what
        // the wrapper injected.
        Tool::new(
            spec,
            Arc::new(|args| Box::pin(async move { Ok(Value::Object(args)) })),
        )
    }

    fn registry() -> FilterRegistry {
        FilterRegistry::default_pdf_fields()
    }

    fn param_names(tool: &Tool) -> Vec<String> {
        tool.spec().params.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn placeholder_is_replaced_by_per_field_parameters() {
        let wrapped = wrap_filters(base_find_tool(), &registry()).unwrap();
        // 3 base params, minus the placeholder, plus the 3 fields that
        // carry conditions (total_pages has none).
        assert_eq!(
            param_names(&wrapped),
            vec![
                "query",
                "collection_name",
                "document_id",
                "page_label",
                "physical_page_index"
            ]
        );
        assert!(!wrapped.spec().param("document_id").unwrap().required);
    }

    #[test]
    fn missing_placeholder_fails_at_wrap_time() {
        let spec = ToolSpec::new(
            "no-filter",
            "",
            vec![ParamSpec::required("query", ParamKind::String, "")],
        );
        let tool = Tool::new(spec, Arc::new(|args| Box::pin(async move { Ok(Value::Object(args)) })));
        assert!(matches!(
            wrap_filters(tool, &registry()),
            Err(ToolError::Config(_))
        ));
    }

    #[test]
    fn field_name_collision_fails_at_wrap_time() {
        let spec = ToolSpec::new(
            "clashing",
            "",
            vec![
                ParamSpec::required("document_id", ParamKind::String, ""),
                ParamSpec::optional("query_filter", ParamKind::Filter, ""),
            ],
        );
        let tool = Tool::new(spec, Arc::new(|args| Box::pin(async move { Ok(Value::Object(args)) })));
        assert!(matches!(
            wrap_filters(tool, &registry()),
            Err(ToolError::Config(_))
        ));
    }

    #[tokio::test]
    async fn field_arguments_compile_into_the_injected_filter() {
        let wrapped = wrap_filters(base_find_tool(), &registry()).unwrap();
        let mut args = Map::new();
        args.insert("query".into(), json!("q"));
        args.insert("collection_name".into(), json!("c"));
        args.insert("document_id".into(), json!("doc1"));

        let out = wrapped.invoke(args).await.unwrap();
        assert_eq!(
            out["query_filter"],
            json!({"must": [{"key": "metadata.document_id", "match": {"value": "doc1"}}]})
        );
        // Field arguments never leak through to the inner handler.
        assert!(out.get("document_id").is_none());
    }

    #[tokio::test]
    async fn no_field_arguments_injects_a_null_filter() {
        let wrapped = wrap_filters(base_find_tool(), &registry()).unwrap();
        let mut args = Map::new();
        args.insert("query".into(), json!("q"));
        args.insert("collection_name".into(), json!("c"));

        let out = wrapped.invoke(args).await.unwrap();
        assert_eq!(out["query_filter"], Value::Null);
    }

    proptest! {
        /// Applying the filter wrapper and partial application in either
        /// order must expose the same parameter list.
        #[test]
        fn wrapper_composition_is_order_invariant(
            fixed_collection in "[a-z]{1,12}",
            field_names in proptest::collection::btree_set("[a-z]{3,8}", 1..4),
        ) {
            // Reserved names would collide with the base parameters.
            prop_assume!(!field_names.contains("query"));
            prop_assume!(!field_names.contains("collection_name"));
            prop_assume!(!field_names.contains("query_filter"));

            let fields: Vec<FilterableField> = field_names
                .iter()
                .map(|n| FilterableField {
                    name: n.clone(),
                    field_type: FieldType::Keyword,
                    condition: Some(ConditionOp::Eq),
                    description: String::new(),
                    required: false,
                })
                .collect();
            let registry = FilterRegistry::new(fields).unwrap();

            let mut fixed = Map::new();
            fixed.insert("collection_name".to_string(), json!(fixed_collection));

            let wrapped_then_partial = make_partial_function(
                wrap_filters(base_find_tool(), &registry).unwrap(),
                fixed.clone(),
            )
            .unwrap();
            let partial_then_wrapped = wrap_filters(
                make_partial_function(base_find_tool(), fixed).unwrap(),
                &registry,
            )
            .unwrap();

            prop_assert_eq!(
                param_names(&wrapped_then_partial),
                param_names(&partial_then_wrapped)
            );
        }
    }
}
