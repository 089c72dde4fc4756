//! Main request dispatcher. Receives JSON-RPC messages and routes them to handlers.

use tokio::sync::Mutex;

use serde_json::Value;

use crate::tools::ToolRegistry;
use crate::types::*;

use super::dispatch::{methods, DispatchTable, Method, NotificationKind};
use super::negotiation::NegotiatedCapabilities;
use super::state::SessionState;

/// The main protocol handler that dispatches incoming JSON-RPC messages.
pub struct ProtocolHandler {
    table: DispatchTable,
    state: Mutex<SessionState>,
    capabilities: Mutex<NegotiatedCapabilities>,
}

impl ProtocolHandler {
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            table: DispatchTable::new(tools),
            state: Mutex::new(SessionState::default()),
            capabilities: Mutex::new(NegotiatedCapabilities::default()),
        }
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.table
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    pub async fn negotiated(&self) -> NegotiatedCapabilities {
        self.capabilities.lock().await.clone()
    }

    /// Stop accepting requests. Calls already dispatched are unaffected.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if *state != SessionState::Closed {
            tracing::info!("Session closed");
            state.close();
        }
    }

    /// Whether handling this message may wait on a backend call.
    pub fn is_deferred(&self, msg: &JsonRpcMessage) -> bool {
        match msg {
            JsonRpcMessage::Request(req) => self
                .table
                .resolve(&req.method)
                .map(Method::is_deferred)
                .unwrap_or(false),
            _ => false,
        }
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<JsonRpcResponse> {
        let state = self.state().await;
        self.handle_message_in(msg, state).await
    }

    /// Handle a message as if it arrived while the session was in `state`.
    ///
    /// Deferred requests are admitted against the state at read time, so a
    /// call read before end of input still runs after the session closes.
    pub async fn handle_message_in(
        &self,
        msg: JsonRpcMessage,
        state: SessionState,
    ) -> Option<JsonRpcResponse> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req, state).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            JsonRpcMessage::Response(resp) => {
                tracing::warn!("Ignoring unsolicited response from client (id {})", resp.id);
                None
            }
        }
    }

    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        state: SessionState,
    ) -> JsonRpcResponse {
        let id = request.id.clone();
        tracing::debug!("-> {} (id {id})", request.method);

        match self.dispatch_request(request, state).await {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                tracing::debug!("<- error for id {id}: {e}");
                e.to_json_rpc_error(id)
            }
        }
    }

    async fn dispatch_request(
        &self,
        request: JsonRpcRequest,
        state: SessionState,
    ) -> McpResult<Value> {
        let method = self
            .table
            .resolve(&request.method)
            .map_err(|_| state.reject_unknown(&request.method))?;
        state.admit(method, &request.method)?;

        match method {
            Method::Initialize => self.handle_initialize(request.params).await,
            Method::Ping => Ok(Value::Object(serde_json::Map::new())),
            Method::ListTools => self.handle_tools_list().await,
            Method::CallTool => self.handle_tools_call(request.params).await,
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match self.table.resolve_notification(&notification.method) {
            Some(NotificationKind::Initialized) => {
                let mut state = self.state.lock().await;
                if state.complete_handshake() {
                    tracing::info!("MCP handshake complete");
                } else {
                    tracing::warn!(
                        "Ignoring {} received in state {:?}",
                        notification.method,
                        *state
                    );
                }
            }
            Some(NotificationKind::Cancelled) => {
                let reason = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok());
                match reason {
                    Some(p) => tracing::info!(
                        "Client cancelled request {} ({}); cancellation is not supported",
                        p.request_id,
                        p.reason.as_deref().unwrap_or("no reason")
                    ),
                    None => tracing::info!("Received cancellation notification"),
                }
            }
            None => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let mut state = self.state.lock().await;
        state.admit(Method::Initialize, methods::INITIALIZE)?;

        let result = self.capabilities.lock().await.negotiate(init_params)?;
        state.begin_handshake()?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: self.table.tools().list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let result = self
            .table
            .tools()
            .call(&call_params.name, call_params.arguments)
            .await?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}
