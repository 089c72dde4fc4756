//! bedrock-kb MCP Server: Strands Agents documentation queries over stdio.

pub mod config;
pub mod protocol;
pub mod repl;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{ConfigOverrides, ServerConfig};
pub use protocol::ProtocolHandler;
pub use tools::ToolRegistry;
pub use transport::StdioTransport;
