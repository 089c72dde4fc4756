//! The fixed method table, built once at startup.

use std::collections::HashMap;

use crate::tools::ToolRegistry;
use crate::types::{McpError, McpResult};

/// Wire names of every method and notification the server understands.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";

    pub const INITIALIZED: &str = "notifications/initialized";
    pub const INITIALIZED_LEGACY: &str = "initialized";
    pub const CANCELLED: &str = "notifications/cancelled";
}

/// Request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    Ping,
    ListTools,
    CallTool,
}

impl Method {
    /// Requests that may wait on a backend and so run off the read loop.
    pub fn is_deferred(self) -> bool {
        matches!(self, Method::CallTool)
    }
}

/// Notification handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Initialized,
    Cancelled,
}

/// Method name to handler, plus the tool registry behind `tools/*`.
pub struct DispatchTable {
    requests: HashMap<&'static str, Method>,
    notifications: HashMap<&'static str, NotificationKind>,
    tools: ToolRegistry,
}

impl DispatchTable {
    pub fn new(tools: ToolRegistry) -> Self {
        let requests = HashMap::from([
            (methods::INITIALIZE, Method::Initialize),
            (methods::PING, Method::Ping),
            (methods::TOOLS_LIST, Method::ListTools),
            (methods::TOOLS_CALL, Method::CallTool),
        ]);
        let notifications = HashMap::from([
            (methods::INITIALIZED, NotificationKind::Initialized),
            (methods::INITIALIZED_LEGACY, NotificationKind::Initialized),
            (methods::CANCELLED, NotificationKind::Cancelled),
        ]);

        Self {
            requests,
            notifications,
            tools,
        }
    }

    pub fn resolve(&self, method: &str) -> McpResult<Method> {
        self.requests
            .get(method)
            .copied()
            .ok_or_else(|| McpError::MethodNotFound(method.to_string()))
    }

    pub fn resolve_notification(&self, method: &str) -> Option<NotificationKind> {
        self.notifications.get(method).copied()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Request method names, sorted.
    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.requests.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
