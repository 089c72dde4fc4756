//! The retrieval backend seam.

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::types::{GeneratedAnswer, RetrievalTarget};

/// A service that retrieves documents for a query and generates an answer
/// from them.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    async fn retrieve_and_generate(
        &self,
        query: &str,
        target: &RetrievalTarget,
    ) -> BackendResult<GeneratedAnswer>;
}
