//! Error types and JSON-RPC error codes for the MCP server.

use serde_json::{json, Value};

use super::capabilities::SUPPORTED_PROTOCOL_VERSIONS;
use super::message::{JsonRpcErrorObject, JsonRpcResponse, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    /// Request arrived before the initialize handshake.
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    pub const TOOL_NOT_FOUND: i32 = -32803;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Server not initialized: '{0}' received before initialization completed")]
    ServerNotInitialized(String),

    #[error("Invalid request: server is already initialized")]
    AlreadyInitialized,

    #[error("Invalid request: session is closed")]
    SessionClosed,

    #[error("Unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Incomplete stream: {0} bytes without a message boundary at end of input")]
    IncompleteStream(usize),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::ServerNotInitialized(_) => SERVER_NOT_INITIALIZED,
            McpError::AlreadyInitialized | McpError::SessionClosed => INVALID_REQUEST,
            McpError::UnsupportedProtocolVersion(_) => INVALID_PARAMS,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::IncompleteStream(_) | McpError::Transport(_) | McpError::Io(_) => {
                INTERNAL_ERROR
            }
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Structured detail attached to the error object, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::UnsupportedProtocolVersion(requested) => Some(json!({
                "requested": requested,
                "supported": SUPPORTED_PROTOCOL_VERSIONS,
            })),
            _ => None,
        }
    }

    /// Transport-level failures end the connection; everything else is
    /// answered and the session continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            McpError::IncompleteStream(_) | McpError::Transport(_) | McpError::Io(_)
        )
    }

    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: self.data(),
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::failure(id, self.to_error_object())
    }
}

pub type McpResult<T> = Result<T, McpError>;
