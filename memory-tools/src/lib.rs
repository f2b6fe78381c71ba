//! Callable tool surface: declared parameter schemas, JSON-argument tools
//! and the wrappers that reshape their signatures.
//!
//! Tools carry their parameter list as data ([`ToolSpec`]), so the hosting
//! layer can render schemas without reflection and the two wrappers can
//! rewrite what callers see:
//! - [`wrap_filters`] turns a filter placeholder into per-field parameters
//! - [`make_partial_function`] pins parameters to fixed values

pub mod partial;
pub mod schema;
pub mod tool;
pub mod wrap;

pub use partial::make_partial_function;
pub use schema::{ParamKind, ParamSpec, ToolSpec};
pub use tool::{Tool, ToolError, ToolFuture, ToolHandler};
pub use wrap::wrap_filters;
