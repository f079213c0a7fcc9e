//! Anthropic Messages API backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use fieldfill_shared::{AnthropicConfig, FieldDescriptor, FieldFillError, Result};

use crate::{CompletionProvider, ProviderFactory, prompt};

/// Pinned API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token cap for the connection test.
const TEST_MAX_TOKENS: u32 = 10;

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("fieldfill/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Completion provider backed by the Anthropic Messages API.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FieldFillError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<reqwest::Response> {
        self.client
            .post(&self.config.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| FieldFillError::Network(e.to_string()))
    }
}

/// Map a non-success status to the error the field result will carry.
fn status_error(status: StatusCode) -> FieldFillError {
    let message = format!("HTTP error! status: {}", status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FieldFillError::Auth(message),
        _ => FieldFillError::Provider(message),
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    #[instrument(skip_all, fields(field = %field.id))]
    async fn complete(&self, field: &FieldDescriptor, system_prompt: &str) -> Result<String> {
        let user_prompt = prompt::field_prompt(field);
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: Some(system_prompt),
            messages: vec![Message {
                role: "user",
                content: &user_prompt,
            }],
        };

        let response = self.send(&request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| FieldFillError::Provider(format!("invalid response body: {e}")))?;

        let text = body
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();

        debug!(chars = text.len(), "completion received");
        Ok(text.trim().to_string())
    }

    #[instrument(skip_all)]
    async fn test_connection(&self) -> Result<()> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: TEST_MAX_TOKENS,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "Test",
            }],
        };

        let response = self.send(&request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("HTTP {}: {body}", status.as_u16());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FieldFillError::Auth(message),
            _ => FieldFillError::Provider(message),
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds an [`AnthropicProvider`] for each request's key.
#[derive(Debug, Clone, Default)]
pub struct AnthropicFactory {
    config: AnthropicConfig,
}

impl AnthropicFactory {
    pub fn new(config: AnthropicConfig) -> Self {
        Self { config }
    }
}

impl ProviderFactory for AnthropicFactory {
    fn create(&self, api_key: &str) -> Result<Arc<dyn CompletionProvider>> {
        Ok(Arc::new(AnthropicProvider::new(api_key, self.config.clone())?))
    }
}
