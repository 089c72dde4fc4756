//! bedrock-kb: Bedrock Knowledge Base retrieval for documentation queries.

pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::KnowledgeBackend;
pub use client::{BedrockAgentClient, BEARER_TOKEN_ENV};
pub use error::{BackendError, BackendResult};
pub use types::*;
