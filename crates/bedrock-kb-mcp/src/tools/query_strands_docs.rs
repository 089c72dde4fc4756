//! Tool: query_strands_docs: ask the Strands Agents documentation knowledge base.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use bedrock_kb::{BackendError, GeneratedAnswer, KnowledgeBackend, RetrievalTarget};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::registry::ToolHandler;

pub const TOOL_NAME: &str = "query_strands_docs";

/// Returned for a blank query; no backend call is made.
pub const EMPTY_QUERY_GUIDANCE: &str =
    "Please provide a query to search the Strands Agent documentation.";

/// Prefix on every failure message.
pub const FAILURE_MARKER: &str = "\u{274c}";

#[derive(Debug, Default, Deserialize)]
struct QueryParams {
    #[serde(default)]
    query: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: Some(
            "Query AWS Strands Agent documentation using Bedrock Knowledge Base".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question or topic to search for in the documentation"
                }
            },
            "required": ["query"]
        }),
    }
}

pub struct QueryStrandsDocs {
    backend: Arc<dyn KnowledgeBackend>,
    target: RetrievalTarget,
}

impl QueryStrandsDocs {
    pub fn new(backend: Arc<dyn KnowledgeBackend>, target: RetrievalTarget) -> Self {
        Self { backend, target }
    }

    /// Run the backend call on its own task so a panicking backend surfaces
    /// as an unclassified failure instead of taking the request down.
    async fn retrieve(&self, query: &str) -> Result<GeneratedAnswer, BackendError> {
        let backend = Arc::clone(&self.backend);
        let target = self.target.clone();
        let query = query.to_string();

        tokio::spawn(async move { backend.retrieve_and_generate(&query, &target).await })
            .await
            .unwrap_or_else(|e| Err(BackendError::Unexpected(format!("backend task failed: {e}"))))
    }
}

#[async_trait]
impl ToolHandler for QueryStrandsDocs {
    fn definition(&self) -> ToolDefinition {
        definition()
    }

    async fn call(&self, arguments: Value) -> McpResult<ToolCallResult> {
        let params: QueryParams =
            serde_json::from_value(arguments).map_err(|e| McpError::InvalidParams(e.to_string()))?;
        let query = params.query.unwrap_or_default();

        if query.trim().is_empty() {
            return Ok(ToolCallResult::text(EMPTY_QUERY_GUIDANCE.to_string()));
        }

        tracing::info!(
            "Querying knowledge base {} ({} chars)",
            self.target.knowledge_base_id,
            query.len()
        );

        match self.retrieve(&query).await {
            Ok(answer) => {
                tracing::debug!("Answer with {} citation(s)", answer.citations.len());
                Ok(ToolCallResult::text(format_answer(&query, &answer)))
            }
            Err(e) => {
                tracing::warn!("Knowledge base query failed: {e}");
                Ok(ToolCallResult::error(format_failure(&e)))
            }
        }
    }
}

/// Render a successful answer, with sources numbered in backend order.
pub fn format_answer(query: &str, answer: &GeneratedAnswer) -> String {
    let mut text = format!("**Query**: {query}\n\n**Answer**: {}", answer.text);

    if !answer.citations.is_empty() {
        text.push_str("\n\n**Sources**:");
        for (i, citation) in answer.citations.iter().enumerate() {
            let _ = write!(text, "\n{}. {}", i + 1, citation.source_uri);
        }
    }

    text
}

/// One distinct message per failure class.
pub fn format_failure(error: &BackendError) -> String {
    match error {
        BackendError::NoCredentials => format!(
            "{FAILURE_MARKER} AWS credentials not found. Set {} to a Bedrock API key; access keys and profiles are not supported.",
            bedrock_kb::BEARER_TOKEN_ENV
        ),
        BackendError::AccessDenied(_) => format!(
            "{FAILURE_MARKER} Access denied. Please ensure your AWS credentials have bedrock:RetrieveAndGenerate permissions."
        ),
        BackendError::Service { code, message } => {
            format!("{FAILURE_MARKER} AWS error ({code}): {message}")
        }
        BackendError::Unexpected(message) => {
            format!("{FAILURE_MARKER} Unexpected error: {message}")
        }
    }
}
