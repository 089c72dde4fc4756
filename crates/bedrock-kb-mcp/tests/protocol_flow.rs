//! Handshake, dispatch and tool-call behaviour through the protocol handler.

mod common;

use serde_json::json;

use bedrock_kb::{BackendError, Citation, GeneratedAnswer};
use bedrock_kb_mcp::protocol::SessionState;
use bedrock_kb_mcp::types::{error_codes, mcp_error_codes};

use common::*;

fn plain_answer() -> GeneratedAnswer {
    GeneratedAnswer::new("Agents are built from a model and tools.")
}

// ─────────────────────── lifecycle ───────────────────────

#[tokio::test]
async fn test_handshake_reaches_ready() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    assert_eq!(handler.state().await, SessionState::Uninitialized);

    let resp = send_unwrap(&handler, init_request()).await;
    assert_eq!(resp["id"], 0);
    assert_eq!(resp["result"]["protocolVersion"], "2025-06-18");
    assert_eq!(resp["result"]["serverInfo"]["name"], "bedrock-kb");
    assert_eq!(resp["result"]["capabilities"]["tools"]["listChanged"], false);
    assert_eq!(handler.state().await, SessionState::Initializing);

    assert!(send(&handler, notification("notifications/initialized")).await.is_none());
    assert_eq!(handler.state().await, SessionState::Ready);
    println!("TEST lifecycle handshake: PASS");
}

#[tokio::test]
async fn test_older_supported_version_is_echoed() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    let resp = send_unwrap(&handler, init_request_for("2024-11-05")).await;
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(
        handler.negotiated().await.protocol_version.as_deref(),
        Some("2024-11-05")
    );
}

#[tokio::test]
async fn test_unsupported_version_rejected() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    let resp = send_unwrap(&handler, init_request_for("1999-01-01")).await;
    assert_eq!(resp["error"]["code"], error_codes::INVALID_PARAMS);
    assert_eq!(resp["error"]["data"]["requested"], "1999-01-01");
    assert_eq!(
        resp["error"]["data"]["supported"],
        json!(["2025-06-18", "2025-03-26", "2024-11-05"])
    );
    assert!(resp.get("result").is_none());
    assert_eq!(handler.state().await, SessionState::Uninitialized);

    // A failed negotiation leaves the door open for a retry.
    let resp = send_unwrap(&handler, init_request()).await;
    assert!(resp.get("result").is_some());
}

#[tokio::test]
async fn test_requests_before_initialize_are_rejected() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    for (id, method) in [(1, "tools/list"), (2, "tools/call"), (3, "ping"), (4, "no/such")] {
        let resp = send_unwrap(&handler, mcp_request(id, method, json!({}))).await;
        assert_eq!(resp["id"], id);
        assert_eq!(
            resp["error"]["code"],
            mcp_error_codes::SERVER_NOT_INITIALIZED,
            "{method}"
        );
    }
    assert_eq!(handler.state().await, SessionState::Uninitialized);
}

#[tokio::test]
async fn test_tools_list_waits_for_initialized_notification() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    send_unwrap(&handler, init_request()).await;

    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], mcp_error_codes::SERVER_NOT_INITIALIZED);

    let resp = send_unwrap(&handler, mcp_request(2, "ping", json!({}))).await;
    assert_eq!(resp["result"], json!({}));
}

#[tokio::test]
async fn test_second_initialize_rejected() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    ready(&handler).await;

    let resp = send_unwrap(&handler, init_request()).await;
    assert_eq!(resp["error"]["code"], error_codes::INVALID_REQUEST);
    assert_eq!(handler.state().await, SessionState::Ready);
}

#[tokio::test]
async fn test_legacy_initialized_notification() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    send_unwrap(&handler, init_request()).await;
    assert!(send(&handler, notification("initialized")).await.is_none());
    assert_eq!(handler.state().await, SessionState::Ready);
}

#[tokio::test]
async fn test_closed_session_rejects_requests() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    ready(&handler).await;
    handler.close().await;

    let resp = send_unwrap(&handler, mcp_request(5, "tools/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], error_codes::INVALID_REQUEST);
}

// ─────────────────────── dispatch ───────────────────────

#[tokio::test]
async fn test_unknown_method_after_ready() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    ready(&handler).await;

    let resp = send_unwrap(&handler, mcp_request(7, "resources/list", json!({}))).await;
    assert_eq!(resp["id"], 7);
    assert_eq!(resp["error"]["code"], error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_notifications_never_answered() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    ready(&handler).await;

    assert!(send(&handler, notification("notifications/unknown")).await.is_none());
    let cancelled = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 3, "reason": "user" }
    });
    assert!(send(&handler, cancelled).await.is_none());
}

#[tokio::test]
async fn test_tools_list_is_stable() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    ready(&handler).await;

    let first = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    let second = send_unwrap(&handler, mcp_request(2, "tools/list", json!({}))).await;
    assert_eq!(first["result"], second["result"]);

    let tools = first["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "query_strands_docs");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["query"]));
}

#[tokio::test]
async fn test_unknown_tool() {
    let backend = MockBackend::answering(plain_answer());
    let handler = handler_with(backend.clone());
    ready(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(4, "tools/call", json!({ "name": "query_aws_docs", "arguments": {} })),
    )
    .await;
    assert_eq!(resp["error"]["code"], mcp_error_codes::TOOL_NOT_FOUND);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_tool_call_without_params() {
    let handler = handler_with(MockBackend::answering(plain_answer()));
    ready(&handler).await;

    let resp = send_unwrap(
        &handler,
        json!({ "jsonrpc": "2.0", "id": 8, "method": "tools/call" }),
    )
    .await;
    assert_eq!(resp["error"]["code"], error_codes::INVALID_PARAMS);
}

// ─────────────────────── query_strands_docs ───────────────────────

#[tokio::test]
async fn test_blank_query_skips_backend() {
    let backend = MockBackend::answering(plain_answer());
    let handler = handler_with(backend.clone());
    ready(&handler).await;

    for (id, args) in [
        (1, json!({ "query": "" })),
        (2, json!({ "query": "   \t " })),
        (3, json!({})),
    ] {
        let resp = send_unwrap(
            &handler,
            mcp_request(id, "tools/call", json!({ "name": "query_strands_docs", "arguments": args })),
        )
        .await;
        assert_eq!(
            tool_text(&resp),
            "Please provide a query to search the Strands Agent documentation."
        );
        assert!(resp["result"].get("isError").is_none());
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_answer_without_citations() {
    let backend = MockBackend::answering(GeneratedAnswer::new("Use @tool."));
    let handler = handler_with(backend.clone());
    ready(&handler).await;

    let resp = send_unwrap(&handler, query_request(1, "How do I define a tool?")).await;
    assert_eq!(
        tool_text(&resp),
        "**Query**: How do I define a tool?\n\n**Answer**: Use @tool. (How do I define a tool?)"
    );
    assert!(!tool_text(&resp).contains("**Sources**"));
    assert_eq!(backend.queries(), vec!["How do I define a tool?"]);
}

#[tokio::test]
async fn test_answer_with_one_citation() {
    let answer = GeneratedAnswer::new("A").with_citations(vec![Citation::new("s3://docs/agents.md")]);
    let handler = handler_with(MockBackend::answering(answer));
    ready(&handler).await;

    let resp = send_unwrap(&handler, query_request(1, "agents")).await;
    assert!(tool_text(&resp).ends_with("\n\n**Sources**:\n1. s3://docs/agents.md"));
}

#[tokio::test]
async fn test_answer_with_many_citations_in_order() {
    let answer = GeneratedAnswer::new("A").with_citations(vec![
        Citation::new("s3://docs/b.md"),
        Citation::new("Unknown source"),
        Citation::new("s3://docs/a.md"),
    ]);
    let handler = handler_with(MockBackend::answering(answer));
    ready(&handler).await;

    let resp = send_unwrap(&handler, query_request(1, "q")).await;
    assert!(tool_text(&resp).ends_with(
        "**Sources**:\n1. s3://docs/b.md\n2. Unknown source\n3. s3://docs/a.md"
    ));
}

#[tokio::test]
async fn test_backend_failures_are_distinct_tool_errors() {
    let failures = [
        BackendError::NoCredentials,
        BackendError::AccessDenied("not allowed".to_string()),
        BackendError::Service {
            code: "ResourceNotFoundException".to_string(),
            message: "no such knowledge base".to_string(),
        },
        BackendError::Unexpected("connection reset".to_string()),
    ];

    let mut texts = Vec::new();
    for failure in failures {
        let handler = handler_with(MockBackend::failing(failure));
        ready(&handler).await;

        let resp = send_unwrap(&handler, query_request(9, "q")).await;
        assert_eq!(resp["id"], 9);
        assert!(resp.get("error").is_none(), "backend failure is not a protocol error");
        assert_eq!(resp["result"]["isError"], true);
        let text = tool_text(&resp).to_string();
        assert!(text.starts_with('\u{274c}'), "{text}");
        texts.push(text);
    }

    assert!(texts[1].contains("bedrock:RetrieveAndGenerate permissions"));
    assert!(texts[2].contains("ResourceNotFoundException"));
    assert!(texts[2].contains("no such knowledge base"));
    assert!(texts[3].contains("connection reset"));
    for (i, a) in texts.iter().enumerate() {
        for b in &texts[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[tokio::test]
async fn test_failed_call_leaves_session_usable() {
    let handler = handler_with(MockBackend::failing(BackendError::NoCredentials));
    ready(&handler).await;

    send_unwrap(&handler, query_request(1, "q")).await;
    let resp = send_unwrap(&handler, mcp_request(2, "tools/list", json!({}))).await;
    assert!(resp.get("result").is_some());
    assert_eq!(handler.state().await, SessionState::Ready);
}
