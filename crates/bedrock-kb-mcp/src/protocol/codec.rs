//! Conversion between wire JSON and typed JSON-RPC messages.

use serde::Serialize;
use serde_json::Value;

use crate::types::{
    JsonRpcErrorObject, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    McpError, McpResult, RequestId,
};

use super::validator::{validate_method, validate_params, validate_version};

/// A message that could not be decoded.
///
/// `id` is set when the correlation id survived, in which case the caller
/// gets an error response. Otherwise the message is dropped.
#[derive(Debug)]
pub struct DecodeFailure {
    pub id: Option<RequestId>,
    pub error: McpError,
}

impl DecodeFailure {
    fn unrecoverable(error: McpError) -> Self {
        Self { id: None, error }
    }

    fn for_id(id: Option<RequestId>, error: McpError) -> Self {
        Self { id, error }
    }

    pub fn into_response(self) -> Option<JsonRpcResponse> {
        let DecodeFailure { id, error } = self;
        id.map(|id| error.to_json_rpc_error(id))
    }
}

impl std::fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} (id {id})", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Decode one framed line.
pub fn decode(line: &str) -> Result<JsonRpcMessage, DecodeFailure> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| DecodeFailure::unrecoverable(McpError::ParseError(e.to_string())))?;
    decode_value(value)
}

/// Decode an already-parsed JSON value.
pub fn decode_value(value: Value) -> Result<JsonRpcMessage, DecodeFailure> {
    let Value::Object(mut envelope) = value else {
        return Err(DecodeFailure::unrecoverable(McpError::InvalidRequest(
            "Message must be a JSON object".to_string(),
        )));
    };

    let id = match envelope.remove("id") {
        None => None,
        Some(raw) => match serde_json::from_value::<RequestId>(raw.clone()) {
            Ok(id) => Some(id),
            Err(_) => {
                return Err(DecodeFailure::unrecoverable(McpError::InvalidRequest(
                    format!("Id must be a string or integer, got {raw}"),
                )))
            }
        },
    };

    let is_response = envelope.contains_key("result") || envelope.contains_key("error");
    if is_response && !envelope.contains_key("method") {
        // Never answer a response, so failures here are always dropped.
        return decode_response(id, envelope).map_err(DecodeFailure::unrecoverable);
    }

    validate_version(&envelope).map_err(|e| DecodeFailure::for_id(id.clone(), e))?;
    let method = validate_method(&envelope).map_err(|e| DecodeFailure::for_id(id.clone(), e))?;
    let params = validate_params(envelope.remove("params"))
        .map_err(|e| DecodeFailure::for_id(id.clone(), e))?;

    Ok(match id {
        Some(id) => JsonRpcMessage::Request(JsonRpcRequest::new(id, method, params)),
        None => JsonRpcMessage::Notification(JsonRpcNotification::new(method, params)),
    })
}

fn decode_response(
    id: Option<RequestId>,
    mut envelope: serde_json::Map<String, Value>,
) -> McpResult<JsonRpcMessage> {
    validate_version(&envelope)?;
    let id = id.ok_or_else(|| McpError::InvalidRequest("Response without id".to_string()))?;

    match (envelope.remove("result"), envelope.remove("error")) {
        (Some(result), None) => Ok(JsonRpcMessage::Response(JsonRpcResponse::success(
            id, result,
        ))),
        (None, Some(error)) => {
            let error: JsonRpcErrorObject = serde_json::from_value(error)
                .map_err(|e| McpError::InvalidRequest(format!("Malformed error object: {e}")))?;
            Ok(JsonRpcMessage::Response(JsonRpcResponse::failure(id, error)))
        }
        _ => Err(McpError::InvalidRequest(
            "Response must carry exactly one of result or error".to_string(),
        )),
    }
}

/// Encode a message as a single line of JSON (no trailing newline).
pub fn encode<T: Serialize>(message: &T) -> McpResult<String> {
    serde_json::to_string(message).map_err(McpError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::error_codes;
    use serde_json::json;

    #[test]
    fn test_decode_request() {
        let msg = decode(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#).unwrap();
        match msg {
            JsonRpcMessage::Request(req) => {
                assert_eq!(req.id, RequestId::Number(1));
                assert_eq!(req.method, "tools/list");
                assert_eq!(req.params, Some(json!({})));
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_string_id() {
        let msg = decode(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#).unwrap();
        assert!(matches!(
            msg,
            JsonRpcMessage::Request(JsonRpcRequest { id: RequestId::String(ref s), .. }) if s == "abc"
        ));
    }

    #[test]
    fn test_decode_notification() {
        let msg = decode(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Notification(ref n) if n.method == "notifications/initialized"));
    }

    #[test]
    fn test_malformed_json_is_unrecoverable() {
        let failure = decode(r#"{"broken":"#).unwrap_err();
        assert!(failure.id.is_none());
        assert_eq!(failure.error.code(), error_codes::PARSE_ERROR);
        assert!(failure.into_response().is_none());
    }

    #[test]
    fn test_missing_method_with_id_gets_response() {
        let failure = decode(r#"{"jsonrpc":"2.0","id":9}"#).unwrap_err();
        let response = failure.into_response().expect("id is recoverable");
        assert_eq!(response.id, RequestId::Number(9));
        assert_eq!(response.error().unwrap().code, error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_wrong_version_with_id_gets_response() {
        let failure = decode(r#"{"jsonrpc":"1.0","id":"x","method":"ping"}"#).unwrap_err();
        let response = failure.into_response().unwrap();
        assert_eq!(response.id, RequestId::String("x".to_string()));
        assert_eq!(response.error().unwrap().code, error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_bad_id_type_is_dropped() {
        for line in [
            r#"{"jsonrpc":"2.0","id":1.5,"method":"ping"}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#,
            r#"{"jsonrpc":"2.0","id":{"a":1},"method":"ping"}"#,
        ] {
            let failure = decode(line).unwrap_err();
            assert!(failure.id.is_none(), "{line}");
        }
    }

    #[test]
    fn test_array_params_rejected() {
        let failure = decode(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":[1]}"#).unwrap_err();
        assert_eq!(failure.id, Some(RequestId::Number(2)));
        assert_eq!(failure.error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_non_object_is_unrecoverable() {
        let failure = decode("[1,2,3]").unwrap_err();
        assert!(failure.id.is_none());
    }

    #[test]
    fn test_response_exclusivity() {
        let ok = decode(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#).unwrap();
        assert!(matches!(ok, JsonRpcMessage::Response(ref r) if r.result().is_some()));

        let err = decode(r#"{"jsonrpc":"2.0","id":3,"error":{"code":-1,"message":"x"}}"#).unwrap();
        assert!(matches!(err, JsonRpcMessage::Response(ref r) if r.error().is_some()));

        let both = decode(r#"{"jsonrpc":"2.0","id":3,"result":{},"error":{"code":-1,"message":"x"}}"#)
            .unwrap_err();
        assert!(both.into_response().is_none());
    }

    #[test]
    fn test_encode_response_has_one_outcome() {
        let success = encode(&JsonRpcResponse::success(RequestId::Number(1), json!({ "ok": true }))).unwrap();
        let value: Value = serde_json::from_str(&success).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 1);
        assert_eq!(value["result"]["ok"], true);
        assert!(value.get("error").is_none());

        let failure = encode(
            &McpError::MethodNotFound("nope".to_string()).to_json_rpc_error(RequestId::from("a")),
        )
        .unwrap();
        let value: Value = serde_json::from_str(&failure).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["error"]["code"], error_codes::METHOD_NOT_FOUND);
        assert!(value.get("result").is_none());
        assert!(!failure.contains('\n'));
    }
}
