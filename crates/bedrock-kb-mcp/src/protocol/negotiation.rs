//! MCP capability negotiation during initialization.

use crate::types::{
    is_supported_version, ClientCapabilities, Implementation, InitializeParams, InitializeResult,
    McpError, McpResult,
};

/// What the client declared during the handshake.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub protocol_version: Option<String>,
}

impl NegotiatedCapabilities {
    pub fn negotiate(&mut self, params: InitializeParams) -> McpResult<InitializeResult> {
        if !is_supported_version(&params.protocol_version) {
            tracing::warn!(
                "Client {} requested unsupported protocol version {}",
                params.client_info.name,
                params.protocol_version
            );
            return Err(McpError::UnsupportedProtocolVersion(params.protocol_version));
        }

        tracing::info!(
            "Initialized with client: {} v{} (protocol {})",
            params.client_info.name,
            params.client_info.version,
            params.protocol_version
        );

        let result = InitializeResult::for_version(&params.protocol_version);
        self.client = params.capabilities;
        self.client_info = Some(params.client_info);
        self.protocol_version = Some(params.protocol_version);
        Ok(result)
    }
}
