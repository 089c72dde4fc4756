//! Tool registration and dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use bedrock_kb::{KnowledgeBackend, RetrievalTarget};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::query_strands_docs::QueryStrandsDocs;

/// A callable tool. Failures of the tool's own backend belong in the
/// returned [`ToolCallResult`]; `Err` is reserved for protocol problems
/// such as malformed arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, arguments: Value) -> McpResult<ToolCallResult>;
}

#[derive(Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

/// Ordered, append-only set of tools. Listing order is registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The server's tool set, backed by the given knowledge base.
    pub fn standard(backend: Arc<dyn KnowledgeBackend>, target: RetrievalTarget) -> Self {
        let mut registry = Self::new();
        registry.push(Arc::new(QueryStrandsDocs::new(backend, target)));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        let name = handler.definition().name;
        if self.contains(&name) {
            return Err(McpError::InternalError(format!(
                "Tool '{name}' is already registered"
            )));
        }
        self.push(handler);
        Ok(())
    }

    fn push(&mut self, handler: Arc<dyn ToolHandler>) {
        let definition = handler.definition();
        tracing::debug!("Registered tool {}", definition.name);
        self.tools.push(RegisteredTool {
            definition,
            handler,
        });
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.definition.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(&self, name: &str, arguments: Option<Value>) -> McpResult<ToolCallResult> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.definition.name == name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        let args = match arguments {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(obj @ Value::Object(_)) => obj,
            Some(_) => {
                return Err(McpError::InvalidParams(
                    "Tool arguments must be an object".to_string(),
                ))
            }
        };

        tool.handler.call(args).await
    }
}
