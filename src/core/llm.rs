use super::retry::{AttemptError, RetryPolicy};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A tool the model may elect to call, described by a JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub functions: Vec<FunctionDeclaration>,
}

impl LlmRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 256,
            functions: Vec::new(),
        }
    }

    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_function(mut self, function: FunctionDeclaration) -> Self {
        self.functions.push(function);
        self
    }

    /// System prompt plus any system-role turns, joined in order.
    /// Used by backends that carry the system text outside the turn list.
    pub fn combined_system(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(sys) = &self.system_prompt {
            parts.push(sys);
        }
        parts.extend(
            self.messages
                .iter()
                .filter(|m| m.role == ChatRole::System)
                .map(|m| m.content.as_str()),
        );
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub function_call: Option<FunctionCall>,
    pub usage: Option<Usage>,
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("missing/invalid configuration for provider {0}")]
    Configuration(String),

    #[error("{provider} API error {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        provider: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse { provider: String, message: String },
}

/// Uniform interface over vendor backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider id, e.g. "openai"
    fn name(&self) -> &str;

    async fn generate_response(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn validate_config(&self) -> bool;
}

/// Resolved credentials and model for one backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub organization: Option<String>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn is_valid(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.model.trim().is_empty()
    }
}

/// Shared HTTP plumbing for the concrete backends: one client with a
/// request timeout plus the retry policy.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration, policy: RetryPolicy) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("[HttpTransport] Falling back to default client: {}", e);
                Client::new()
            });
        Self { client, policy }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a JSON request built fresh on every attempt and decode the body.
    pub async fn send_json<F>(&self, provider: &str, build: F) -> Result<Value, LlmError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.policy
            .run(provider, |attempt| {
                let request = build(&self.client);
                async move {
                    tracing::debug!("[HttpTransport] {} attempt {}", provider, attempt);
                    let response = request
                        .send()
                        .await
                        .map_err(|e| AttemptError::Retryable(format!("HTTP request failed: {}", e)))?;

                    let status = response.status();
                    if !status.is_success() {
                        let body = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        return Err(classify_status(provider, status, body));
                    }

                    response.json::<Value>().await.map_err(|e| {
                        AttemptError::Fatal(LlmError::InvalidResponse {
                            provider: provider.to_string(),
                            message: format!("Response decode error: {}", e),
                        })
                    })
                }
            })
            .await
    }
}

fn classify_status(provider: &str, status: StatusCode, body: String) -> AttemptError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AttemptError::Retryable(format!("API error {}: {}", status.as_u16(), body))
    } else {
        AttemptError::Fatal(LlmError::Http {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

/// Parse tool-call arguments, which some vendors send as a JSON string.
pub(crate) fn parse_arguments(raw: &Value) -> Value {
    match raw {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        other => other.clone(),
    }
}
