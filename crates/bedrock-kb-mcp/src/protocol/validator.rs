//! JSON-RPC envelope validation per MCP spec.

use serde_json::{Map, Value};

use crate::types::{McpError, McpResult, JSONRPC_VERSION};

/// Validate that the envelope declares JSON-RPC 2.0.
pub fn validate_version(envelope: &Map<String, Value>) -> McpResult<()> {
    match envelope.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => Ok(()),
        Some(other) => Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{other}\""
        ))),
        None => Err(McpError::InvalidRequest(
            "Missing jsonrpc version".to_string(),
        )),
    }
}

/// Extract a non-empty method name.
pub fn validate_method(envelope: &Map<String, Value>) -> McpResult<String> {
    match envelope.get("method") {
        Some(Value::String(method)) if !method.is_empty() => Ok(method.clone()),
        Some(Value::String(_)) => Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        )),
        Some(_) => Err(McpError::InvalidRequest(
            "Method name must be a string".to_string(),
        )),
        None => Err(McpError::InvalidRequest("Missing method".to_string())),
    }
}

/// Params are optional, but when present must be a key/value mapping.
pub fn validate_params(params: Option<Value>) -> McpResult<Option<Value>> {
    match params {
        None | Some(Value::Null) => Ok(None),
        Some(obj @ Value::Object(_)) => Ok(Some(obj)),
        Some(_) => Err(McpError::InvalidRequest(
            "Params must be an object".to_string(),
        )),
    }
}
