//! Anthropic Messages API backend

use crate::core::llm::{
    ChatRole, FunctionCall, HttpTransport, LlmConfig, LlmError, LlmProvider, LlmRequest,
    LlmResponse, Usage,
};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: LlmConfig,
    transport: HttpTransport,
}

impl AnthropicProvider {
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
        format!("{}/v1/messages", base)
    }

    fn build_body(&self, request: &LlmRequest) -> Value {
        // System text travels in its own field; only user/assistant turns
        // go in `messages`.
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });

        if let Some(system) = request.combined_system() {
            body["system"] = Value::String(system);
        }

        if !request.functions.is_empty() {
            body["tools"] = request
                .functions
                .iter()
                .map(|f| {
                    json!({
                        "name": f.name,
                        "description": f.description,
                        "input_schema": f.parameters,
                    })
                })
                .collect();
        }

        body
    }

    fn parse_body(&self, body: Value) -> Result<LlmResponse, LlmError> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.config.provider.clone(),
                message: "missing content blocks".to_string(),
            })?;

        let mut text = String::new();
        let mut function_call = None;

        for block in blocks {
            match block["type"].as_str() {
                Some("text") => text.push_str(block["text"].as_str().unwrap_or_default()),
                Some("tool_use") if function_call.is_none() => {
                    function_call = Some(FunctionCall {
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                        arguments: block["input"].clone(),
                    });
                }
                _ => {}
            }
        }

        let usage = body.get("usage").map(|u| {
            let input = u["input_tokens"].as_u64().unwrap_or(0) as u32;
            let output = u["output_tokens"].as_u64().unwrap_or(0) as u32;
            Usage {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input + output,
            }
        });

        Ok(LlmResponse {
            content: text,
            function_call,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.config.provider
    }

    async fn generate_response(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = self.endpoint();
        let body = self.build_body(request);

        let raw = self
            .transport
            .send_json(&self.config.provider, |client| {
                client
                    .post(&url)
                    .header("x-api-key", &self.config.api_key)
                    .header("anthropic-version", API_VERSION)
                    .json(&body)
            })
            .await?;

        let response = self.parse_body(raw)?;
        if let Some(usage) = response.usage {
            tracing::debug!(
                "[AnthropicProvider] {} usage: input={} output={}",
                self.config.model,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        Ok(response)
    }

    fn validate_config(&self) -> bool {
        self.config.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::{ChatMessage, FunctionDeclaration};
    use crate::core::retry::RetryPolicy;
    use std::time::Duration;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            LlmConfig {
                provider: "anthropic".into(),
                api_key: "key".into(),
                model: "claude-3-5-haiku-latest".into(),
                organization: None,
                base_url: None,
            },
            HttpTransport::new(Duration::from_secs(5), RetryPolicy::default()),
        )
    }

    #[test]
    fn test_system_turns_move_to_system_field() {
        let req = LlmRequest::new(vec![
            ChatMessage::system("Secret: cat"),
            ChatMessage::user("Is it a mammal?"),
        ])
        .with_function(FunctionDeclaration {
            name: "web_search".into(),
            description: "search".into(),
            parameters: json!({"type": "object"}),
        });
        let body = provider().build_body(&req);

        assert_eq!(body["system"], "Secret: cat");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_parse_text_and_tool_use() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "t1", "name": "web_search", "input": {"query": "x"}}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 3}
        });
        let resp = provider().parse_body(body).unwrap();
        assert_eq!(resp.content, "Let me check.");
        assert_eq!(resp.function_call.unwrap().arguments["query"], "x");
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }
}
