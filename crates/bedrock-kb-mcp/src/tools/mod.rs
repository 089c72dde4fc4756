//! MCP tool implementations.

pub mod query_strands_docs;
pub mod registry;

pub use registry::{ToolHandler, ToolRegistry};
