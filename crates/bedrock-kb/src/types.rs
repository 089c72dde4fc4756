//! Core data types for knowledge base retrieval.

use serde::{Deserialize, Serialize};

/// Source label used when a reference has a location but no URI.
pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// Which knowledge base to query and which model generates the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalTarget {
    pub knowledge_base_id: String,
    pub model_arn: String,
}

impl RetrievalTarget {
    pub fn new(knowledge_base_id: impl Into<String>, model_arn: impl Into<String>) -> Self {
        Self {
            knowledge_base_id: knowledge_base_id.into(),
            model_arn: model_arn.into(),
        }
    }
}

/// A source document backing part of a generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source_uri: String,
}

impl Citation {
    pub fn new(source_uri: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
        }
    }
}

/// A generated answer with its citations in the order the service returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl GeneratedAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}
