//! Session lifecycle: the one-time initialize handshake.

use crate::types::{McpError, McpResult};

use super::dispatch::Method;

/// Where the connection is in its lifecycle. Never goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl SessionState {
    /// Check whether a request for `method` may run in this state.
    pub fn admit(self, method: Method, name: &str) -> McpResult<()> {
        use SessionState::*;
        match (self, method) {
            (Closed, _) => Err(McpError::SessionClosed),
            (Uninitialized, Method::Initialize) => Ok(()),
            (_, Method::Initialize) => Err(McpError::AlreadyInitialized),
            (Uninitialized, _) => Err(McpError::ServerNotInitialized(name.to_string())),
            (Initializing, Method::Ping) => Ok(()),
            (Initializing, _) => Err(McpError::ServerNotInitialized(name.to_string())),
            (Ready, _) => Ok(()),
        }
    }

    /// The error for a method name the dispatch table does not know.
    ///
    /// Before the handshake every request is refused as uninitialized.
    pub fn reject_unknown(self, name: &str) -> McpError {
        match self {
            SessionState::Uninitialized => McpError::ServerNotInitialized(name.to_string()),
            SessionState::Closed => McpError::SessionClosed,
            _ => McpError::MethodNotFound(name.to_string()),
        }
    }

    /// `Uninitialized -> Initializing`, after a successful initialize reply.
    pub fn begin_handshake(&mut self) -> McpResult<()> {
        match self {
            SessionState::Uninitialized => {
                *self = SessionState::Initializing;
                Ok(())
            }
            SessionState::Closed => Err(McpError::SessionClosed),
            _ => Err(McpError::AlreadyInitialized),
        }
    }

    /// `Initializing -> Ready`, on the initialized notification.
    /// Returns false if the notification arrived out of order.
    pub fn complete_handshake(&mut self) -> bool {
        if *self == SessionState::Initializing {
            *self = SessionState::Ready;
            true
        } else {
            false
        }
    }

    pub fn close(&mut self) {
        *self = SessionState::Closed;
    }
}
