//! HTTP client for the Bedrock Agent Runtime `RetrieveAndGenerate` API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::KnowledgeBackend;
use crate::error::{BackendError, BackendResult};
use crate::types::{Citation, GeneratedAnswer, RetrievalTarget, UNKNOWN_SOURCE};

/// Environment variable holding a Bedrock API key.
pub const BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Standard AWS credential settings this client does not read.
const UNSUPPORTED_CREDENTIAL_ENVS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_PROFILE",
    "AWS_WEB_IDENTITY_TOKEN_FILE",
    "AWS_CONTAINER_CREDENTIALS_FULL_URI",
];

const ACCESS_DENIED_CODE: &str = "AccessDeniedException";
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";

/// Knowledge base client authenticated with a Bedrock API key.
pub struct BedrockAgentClient {
    http: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl BedrockAgentClient {
    pub fn new(endpoint: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            bearer_token,
        }
    }

    /// Create a client whose API key is read from [`BEARER_TOKEN_ENV`].
    ///
    /// Only the API key is used. Access keys, profiles and role credentials
    /// are not read. A missing key is not an error here; calls fail with
    /// [`BackendError::NoCredentials`] instead.
    pub fn from_env(endpoint: impl Into<String>) -> Self {
        let env = |key: &str| std::env::var(key).ok();
        let token = env(BEARER_TOKEN_ENV).filter(|t| !t.trim().is_empty());
        if token.is_none() {
            match unsupported_credential_source(env) {
                Some(var) => tracing::warn!(
                    "{var} is set, but only {BEARER_TOKEN_ENV} is used; knowledge base queries will fail"
                ),
                None => {
                    tracing::warn!("{BEARER_TOKEN_ENV} is not set; knowledge base queries will fail")
                }
            }
        }
        Self::new(endpoint, token)
    }

    /// Default agent runtime endpoint for a region.
    pub fn regional_endpoint(region: &str) -> String {
        format!("https://bedrock-agent-runtime.{region}.amazonaws.com")
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_credentials(&self) -> bool {
        self.bearer_token.is_some()
    }
}

#[async_trait]
impl KnowledgeBackend for BedrockAgentClient {
    async fn retrieve_and_generate(
        &self,
        query: &str,
        target: &RetrievalTarget,
    ) -> BackendResult<GeneratedAnswer> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or(BackendError::NoCredentials)?;

        let url = format!("{}/retrieveAndGenerate", self.endpoint.trim_end_matches('/'));
        tracing::debug!("POST {url} (knowledge base {})", target.knowledge_base_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&RetrieveAndGenerateRequest::new(query, target))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_type = response
                .headers()
                .get(ERROR_TYPE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), error_type.as_deref(), &body));
        }

        let payload: RetrieveAndGenerateResponse = response.json().await?;
        Ok(payload.into_answer())
    }
}

/// First standard AWS credential setting present in `env` that this client
/// ignores.
fn unsupported_credential_source<F>(env: F) -> Option<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    UNSUPPORTED_CREDENTIAL_ENVS
        .iter()
        .copied()
        .find(|key| env(key).is_some_and(|v| !v.trim().is_empty()))
}

/// Map a non-success HTTP reply to a [`BackendError`].
fn classify_failure(status: u16, error_type: Option<&str>, body: &str) -> BackendError {
    let parsed: Option<ServiceErrorBody> = serde_json::from_str(body).ok();

    // Header looks like "AccessDeniedException:http://internal.amazon.com/...",
    // body type like "com.amazon.coral.service#AccessDeniedException".
    let code = error_type
        .and_then(|t| t.split(':').next())
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|p| p.error_type.as_deref())
                .map(|t| t.rsplit('#').next().unwrap_or(t))
        })
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP{status}"));

    let message = parsed
        .and_then(|p| p.message)
        .unwrap_or_else(|| match body.trim() {
            "" => "no error message returned".to_string(),
            text => text.to_string(),
        });

    if status == 403 || code == ACCESS_DENIED_CODE {
        BackendError::AccessDenied(message)
    } else {
        BackendError::Service { code, message }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default, alias = "Message")]
    message: Option<String>,
    #[serde(default, rename = "__type")]
    error_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateRequest<'a> {
    input: TextInput<'a>,
    retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration<'a>,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateConfiguration<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    knowledge_base_configuration: KnowledgeBaseConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseConfiguration<'a> {
    knowledge_base_id: &'a str,
    model_arn: &'a str,
}

impl<'a> RetrieveAndGenerateRequest<'a> {
    fn new(query: &'a str, target: &'a RetrievalTarget) -> Self {
        Self {
            input: TextInput { text: query },
            retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration {
                kind: "KNOWLEDGE_BASE",
                knowledge_base_configuration: KnowledgeBaseConfiguration {
                    knowledge_base_id: &target.knowledge_base_id,
                    model_arn: &target.model_arn,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RetrieveAndGenerateResponse {
    output: GeneratedOutput,
    #[serde(default)]
    citations: Vec<WireCitation>,
}

#[derive(Debug, Deserialize)]
struct GeneratedOutput {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCitation {
    #[serde(default)]
    retrieved_references: Vec<RetrievedReference>,
}

#[derive(Debug, Deserialize)]
struct RetrievedReference {
    #[serde(default)]
    location: Option<ReferenceLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceLocation {
    #[serde(default)]
    s3_location: Option<S3Location>,
}

#[derive(Debug, Deserialize)]
struct S3Location {
    #[serde(default)]
    uri: Option<String>,
}

impl RetrieveAndGenerateResponse {
    /// Flatten citations to their S3 sources, keeping service order.
    /// One [`Citation`] per retrieved reference, so a service citation with
    /// several references yields several numbered sources.
    fn into_answer(self) -> GeneratedAnswer {
        let citations = self
            .citations
            .into_iter()
            .flat_map(|c| c.retrieved_references)
            .filter_map(|r| r.location.and_then(|l| l.s3_location))
            .map(|s3| Citation::new(s3.uri.unwrap_or_else(|| UNKNOWN_SOURCE.to_string())))
            .collect();

        GeneratedAnswer::new(self.output.text).with_citations(citations)
    }
}
