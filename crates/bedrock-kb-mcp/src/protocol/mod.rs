//! MCP protocol handling: decoding, session state and JSON-RPC dispatch.

pub mod codec;
pub mod dispatch;
pub mod handler;
pub mod negotiation;
pub mod state;
pub mod validator;

pub use dispatch::{DispatchTable, Method};
pub use handler::ProtocolHandler;
pub use state::SessionState;
