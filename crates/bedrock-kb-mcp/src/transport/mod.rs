//! Transport layer for MCP communication.

pub mod framing;
pub mod stdio;

pub use framing::{FrameReader, FrameWriter};
pub use stdio::StdioTransport;
