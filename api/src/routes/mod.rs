pub mod ingest_route;
pub mod tools_route;
