//! OpenAI Chat Completions backend
//!
//! Also serves OpenAI-compatible vendors (groq, deepseek) through a
//! different base URL.

use crate::core::llm::{
    parse_arguments, ChatRole, FunctionCall, HttpTransport, LlmConfig, LlmError, LlmProvider,
    LlmRequest, LlmResponse, Usage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: ToolCallFunction,
}

#[derive(Debug, Deserialize)]
struct ToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

pub struct OpenAiProvider {
    config: LlmConfig,
    transport: HttpTransport,
}

impl OpenAiProvider {
    pub fn new(config: LlmConfig, transport: HttpTransport) -> Self {
        Self { config, transport }
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn build_body(&self, request: &LlmRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(sys) = &request.system_prompt {
            messages.push(WireMessage {
                role: ChatRole::System,
                content: sys,
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role,
            content: &m.content,
        }));

        let tools = request
            .functions
            .iter()
            .map(|f| {
                json!({
                    "type": "function",
                    "function": {
                        "name": f.name,
                        "description": f.description,
                        "parameters": f.parameters,
                    }
                })
            })
            .collect();

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools,
        };
        serde_json::to_value(body).unwrap_or(Value::Null)
    }

    fn parse_body(&self, body: Value) -> Result<LlmResponse, LlmError> {
        let parsed: ChatResponse =
            serde_json::from_value(body).map_err(|e| LlmError::InvalidResponse {
                provider: self.config.provider.clone(),
                message: e.to_string(),
            })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.config.provider.clone(),
                message: "no choices in response".to_string(),
            })?;

        let function_call = message.tool_calls.into_iter().next().map(|call| FunctionCall {
            name: call.function.name,
            arguments: parse_arguments(&call.function.arguments),
        });

        Ok(LlmResponse {
            content: message.content.unwrap_or_default(),
            function_call,
            usage: parsed.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.provider
    }

    async fn generate_response(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = self.endpoint();
        let body = self.build_body(request);

        let raw = self
            .transport
            .send_json(&self.config.provider, |client| {
                let mut builder = client
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&body);
                if let Some(org) = &self.config.organization {
                    builder = builder.header("OpenAI-Organization", org);
                }
                builder
            })
            .await?;

        let response = self.parse_body(raw)?;
        if let Some(usage) = response.usage {
            tracing::debug!(
                "[OpenAiProvider] {} usage: prompt={} completion={} total={}",
                self.config.model,
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        Ok(response)
    }

    fn validate_config(&self) -> bool {
        self.config.is_valid()
    }
}
