//! Client for the hosted chat-completion endpoint.
//!
//! Every stage sends a two-message conversation (system instruction + user
//! content) and reads back `choices[0].message.content`.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};
use url::Url;

use contentpipe_shared::{ContentPipelineError, GatewayConfig, Result, Stage};

/// User-Agent string for upstream requests.
const USER_AGENT: &str = concat!("contentpipe/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in operator logs.
const MAX_LOGGED_BODY: usize = 500;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

// ---------------------------------------------------------------------------
// GatewayClient
// ---------------------------------------------------------------------------

/// Authenticated handle to the chat-completion endpoint.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl GatewayClient {
    /// Build a client from the gateway config and a resolved API key.
    pub fn new(config: &GatewayConfig, api_key: impl Into<String>) -> Result<Self> {
        let endpoint = config.validate()?;
        Ok(Self::with_http(
            build_http_client(config)?,
            endpoint,
            config.model.clone(),
            api_key,
        ))
    }

    /// Assemble a client from an existing connection pool and an endpoint
    /// already checked by [`GatewayConfig::validate`].
    pub fn with_http(
        http: Client,
        endpoint: Url,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint,
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one completion on behalf of `stage`.
    ///
    /// A non-success status, a transport failure or a body that is not JSON
    /// fails the call. A JSON body without `choices[0].message.content`
    /// yields an empty string.
    #[instrument(skip_all, fields(stage = stage.as_str(), model = %self.model))]
    pub async fn complete(&self, stage: Stage, system: &str, user: &str) -> Result<String> {
        let agent = stage.agent_name();
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: Role::System,
                    content: system,
                },
                ChatMessage {
                    role: Role::User,
                    content: user,
                },
            ],
        };

        debug!(user_len = user.len(), "sending completion request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "completion request failed");
                ContentPipelineError::upstream(agent, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                body = %truncate(&text, MAX_LOGGED_BODY),
                "completion endpoint returned an error"
            );
            return Err(ContentPipelineError::upstream(
                agent,
                status.as_u16().to_string(),
            ));
        }

        let value: Value = response.json().await.map_err(|e| {
            error!(error = %e, "completion response was not JSON");
            ContentPipelineError::upstream(agent, format!("invalid response body: {e}"))
        })?;

        Ok(extract_content(&value))
    }
}

/// Build a reqwest client with the gateway's user agent and timeout.
pub fn build_http_client(config: &GatewayConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ContentPipelineError::Network(format!("failed to build HTTP client: {e}")))
}

/// Pull `choices[0].message.content` out of a completion response.
pub fn extract_content(value: &Value) -> String {
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
