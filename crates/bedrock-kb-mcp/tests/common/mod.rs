//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use bedrock_kb::{BackendError, BackendResult, GeneratedAnswer, KnowledgeBackend, RetrievalTarget};
use bedrock_kb_mcp::protocol::{codec, ProtocolHandler};
use bedrock_kb_mcp::tools::ToolRegistry;

/// Queries starting with this prefix wait on [`MockBackend::release`].
pub const SLOW_PREFIX: &str = "slow:";

/// Scripted knowledge base: returns one fixed outcome and counts calls.
pub struct MockBackend {
    outcome: Mutex<BackendResult<GeneratedAnswer>>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    gate: Notify,
}

impl MockBackend {
    pub fn answering(answer: GeneratedAnswer) -> Arc<Self> {
        Arc::new(Self::with_outcome(Ok(answer)))
    }

    pub fn failing(error: BackendError) -> Arc<Self> {
        Arc::new(Self::with_outcome(Err(error)))
    }

    fn with_outcome(outcome: BackendResult<GeneratedAnswer>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            gate: Notify::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Let one waiting slow query finish.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl KnowledgeBackend for MockBackend {
    async fn retrieve_and_generate(
        &self,
        query: &str,
        _target: &RetrievalTarget,
    ) -> BackendResult<GeneratedAnswer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());

        if query.starts_with(SLOW_PREFIX) {
            self.gate.notified().await;
        }

        let outcome = self.outcome.lock().unwrap().clone();
        outcome.map(|mut answer| {
            answer.text = format!("{} ({query})", answer.text);
            answer
        })
    }
}

pub fn target() -> RetrievalTarget {
    RetrievalTarget::new("KBTEST", "arn:aws:bedrock:us-west-2::foundation-model/test")
}

pub fn handler_with(backend: Arc<MockBackend>) -> ProtocolHandler {
    ProtocolHandler::new(ToolRegistry::standard(backend, target()))
}

/// Build an MCP JSON-RPC request.
pub fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

pub fn notification(method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "method": method })
}

/// Build an initialize request.
pub fn init_request_for(version: &str) -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": version,
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

pub fn init_request() -> Value {
    init_request_for("2025-06-18")
}

pub fn query_request(id: i64, query: &str) -> Value {
    mcp_request(
        id,
        "tools/call",
        json!({ "name": "query_strands_docs", "arguments": { "query": query } }),
    )
}

/// Send a JSON-RPC message through the handler and return the response.
pub async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    let parsed = codec::decode_value(msg).expect("well-formed message");
    handler
        .handle_message(parsed)
        .await
        .map(|r| serde_json::to_value(r).unwrap())
}

/// Send and unwrap the response.
pub async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

/// Run the initialize handshake to completion.
pub async fn ready(handler: &ProtocolHandler) {
    let resp = send_unwrap(handler, init_request()).await;
    assert!(resp.get("result").is_some(), "initialize failed: {resp}");
    assert!(send(handler, notification("notifications/initialized")).await.is_none());
}

/// Text of the first content block of a tools/call result.
pub fn tool_text(resp: &Value) -> &str {
    resp["result"]["content"][0]["text"].as_str().unwrap_or_default()
}
