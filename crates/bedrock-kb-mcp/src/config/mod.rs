//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit flag, then environment, then default.

use std::time::Duration;

use bedrock_kb::{BedrockAgentClient, RetrievalTarget};

pub const DEFAULT_KNOWLEDGE_BASE_ID: &str = "QVBQZMYI7R";
pub const DEFAULT_MODEL_ARN: &str =
    "arn:aws:bedrock:us-west-2::foundation-model/anthropic.claude-3-sonnet-20240229-v1:0";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

pub const KNOWLEDGE_BASE_ID_ENV: &str = "BEDROCK_KB_ID";
pub const MODEL_ARN_ENV: &str = "BEDROCK_MODEL_ARN";
pub const REGION_ENV: &str = "AWS_REGION";
pub const ENDPOINT_ENV: &str = "BEDROCK_KB_ENDPOINT";
pub const SHUTDOWN_GRACE_ENV: &str = "BEDROCK_KB_SHUTDOWN_GRACE_SECS";

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub knowledge_base_id: Option<String>,
    pub model_arn: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub shutdown_grace_secs: Option<u64>,
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub knowledge_base_id: String,
    pub model_arn: String,
    pub region: String,
    pub endpoint: String,
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with<F>(overrides: ConfigOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |explicit: Option<String>, key: &str| {
            explicit.or_else(|| env(key).filter(|v| !v.trim().is_empty()))
        };

        let region =
            lookup(overrides.region, REGION_ENV).unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = lookup(overrides.endpoint, ENDPOINT_ENV)
            .unwrap_or_else(|| BedrockAgentClient::regional_endpoint(&region));

        let grace_secs = overrides
            .shutdown_grace_secs
            .or_else(|| {
                let raw = env(SHUTDOWN_GRACE_ENV)?;
                match raw.trim().parse::<u64>() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        tracing::warn!(
                            "Ignoring {SHUTDOWN_GRACE_ENV}={raw:?}: not a whole number of seconds"
                        );
                        None
                    }
                }
            })
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS);

        Self {
            knowledge_base_id: lookup(overrides.knowledge_base_id, KNOWLEDGE_BASE_ID_ENV)
                .unwrap_or_else(|| DEFAULT_KNOWLEDGE_BASE_ID.to_string()),
            model_arn: lookup(overrides.model_arn, MODEL_ARN_ENV)
                .unwrap_or_else(|| DEFAULT_MODEL_ARN.to_string()),
            region,
            endpoint,
            shutdown_grace: Duration::from_secs(grace_secs),
        }
    }

    pub fn retrieval_target(&self) -> RetrievalTarget {
        RetrievalTarget::new(&self.knowledge_base_id, &self.model_arn)
    }
}
