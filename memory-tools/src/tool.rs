//! JSON-in, JSON-out tools with declared parameter lists.

use crate::schema::ToolSpec;

use memory_store::MemoryError;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Errors raised by tool construction and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A wrapper or tool was misconfigured at build time.
    #[error("tool config error: {0}")]
    Config(String),

    /// The caller supplied bad arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store operation failed.
    #[error(transparent)]
    Execution(#[from] MemoryError),
}

/// Future returned by a tool handler.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>>;

/// The invocable part of a tool: a JSON argument map in, a JSON value out.
pub type ToolHandler = Arc<dyn Fn(Map<String, Value>) -> ToolFuture + Send + Sync>;

/// A callable tool: a [`ToolSpec`] plus an async handler.
///
/// The spec is the single source of truth for the visible parameter list;
/// wrappers rewrite the spec and intercept arguments without the handler
/// knowing.
#[derive(Clone)]
pub struct Tool {
    spec: ToolSpec,
    handler: ToolHandler,
}

impl Tool {
    pub fn new(spec: ToolSpec, handler: ToolHandler) -> Self {
        Self { spec, handler }
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Splits the tool into its spec and handler, for wrappers that need to
    /// rebuild both.
    pub fn into_parts(self) -> (ToolSpec, ToolHandler) {
        (self.spec, self.handler)
    }

    /// Validates arguments against the spec and runs the handler.
    ///
    /// # Errors
    /// `InvalidArgument` when a required parameter is missing or null, when
    /// an argument name is not declared, or when a value's JSON type does
    /// not match the declared kind.
    pub async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        trace!("Tool::invoke name={} args={}", self.spec.name, args.len());

        for name in args.keys() {
            if self.spec.param(name).is_none() {
                return Err(ToolError::InvalidArgument(format!(
                    "tool '{}' has no parameter '{name}'",
                    self.spec.name
                )));
            }
        }
        for param in &self.spec.params {
            match args.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(ToolError::InvalidArgument(format!(
                            "missing required parameter '{}'",
                            param.name
                        )));
                    }
                }
                Some(value) => {
                    if !param.kind.accepts(value) {
                        return Err(ToolError::InvalidArgument(format!(
                            "parameter '{}' expects {}",
                            param.name,
                            param.kind.json_type()
                        )));
                    }
                }
            }
        }

        (self.handler)(args).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("spec", &self.spec).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamKind, ParamSpec};
    use serde_json::json;

    fn echo_tool() -> Tool {
        let spec = ToolSpec::new(
            "echo",
            "Echoes its arguments back",
            vec![
                ParamSpec::required("message", ParamKind::String, "Text to echo"),
                ParamSpec::optional("count", ParamKind::Integer, "Repeat count"),
            ],
        );
        Tool::new(
            spec,
            Arc::new(|args| Box::pin(async move { Ok(Value::Object(args)) })),
        )
    }

    #[tokio::test]
    async fn invoke_passes_validated_args_to_the_handler() {
        let tool = echo_tool();
        let mut args = Map::new();
        args.insert("message".into(), json!("hi"));
        let out = tool.invoke(args).await.unwrap();
        assert_eq!(out["message"], json!("hi"));
    }

    #[tokio::test]
    async fn missing_required_parameter_is_rejected() {
        let tool = echo_tool();
        let err = tool.invoke(Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn null_counts_as_absent_for_required_parameters() {
        let tool = echo_tool();
        let mut args = Map::new();
        args.insert("message".into(), Value::Null);
        assert!(tool.invoke(args).await.is_err());
    }

    #[tokio::test]
    async fn undeclared_argument_is_rejected() {
        let tool = echo_tool();
        let mut args = Map::new();
        args.insert("message".into(), json!("hi"));
        args.insert("bogus".into(), json!(1));
        assert!(tool.invoke(args).await.is_err());
    }

    #[tokio::test]
    async fn wrong_type_is_rejected() {
        let tool = echo_tool();
        let mut args = Map::new();
        args.insert("message".into(), json!("hi"));
        args.insert("count".into(), json!("three"));
        assert!(tool.invoke(args).await.is_err());
    }
}
