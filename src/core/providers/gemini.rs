//! Google Gemini `generateContent` backend

use crate::core::llm::{
    ChatRole, FunctionCall, HttpTransport, LlmConfig, LlmError, LlmProvider, LlmRequest,
    LlmResponse, Usage,
};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    config: LlmConfig,
    transport: HttpTransport,
}

impl GeminiProvider {
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
        format!("{}/v1beta/models/{}:generateContent", base, self.config.model)
    }

    fn build_body(&self, request: &LlmRequest) -> Value {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                let role = if m.role == ChatRole::Assistant { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            }
        });

        if let Some(system) = request.combined_system() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        if !request.functions.is_empty() {
            let declarations: Vec<Value> = request
                .functions
                .iter()
                .map(|f| {
                    json!({
                        "name": f.name,
                        "description": f.description,
                        "parameters": f.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    fn parse_body(&self, body: Value) -> Result<LlmResponse, LlmError> {
        let parts = body["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.config.provider.clone(),
                message: "missing candidate parts".to_string(),
            })?;

        let mut text = String::new();
        let mut function_call = None;
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            } else if let Some(call) = part.get("functionCall") {
                if function_call.is_none() {
                    function_call = Some(FunctionCall {
                        name: call["name"].as_str().unwrap_or_default().to_string(),
                        arguments: call["args"].clone(),
                    });
                }
            }
        }

        let usage = body.get("usageMetadata").map(|u| Usage {
            prompt_tokens: u["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            completion_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
            total_tokens: u["totalTokenCount"].as_u64().unwrap_or(0) as u32,
        });

        Ok(LlmResponse {
            content: text,
            function_call,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
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
                    .query(&[("key", self.config.api_key.as_str())])
                    .json(&body)
            })
            .await?;

        self.parse_body(raw)
    }

    fn validate_config(&self) -> bool {
        self.config.is_valid()
    }
}
