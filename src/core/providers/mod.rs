//! Concrete LLM backends
//!
//! Information Hiding:
//! - Vendor wire formats stay inside each backend module
//! - Callers only see `LlmProvider` and the shared request/response shape

pub mod anthropic;
pub mod gemini;
pub mod openai;

use super::llm::{HttpTransport, LlmConfig, LlmError, LlmProvider};
use std::sync::Arc;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Provider ids accepted in `LLM_PROVIDER` / `{FUNCTION}_LLM_PROVIDER`.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "anthropic", "gemini", "groq", "deepseek"];

/// Model used when `{PROVIDER}_MODEL` is not set.
pub fn default_model(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("gpt-4o-mini"),
        "anthropic" => Some("claude-3-5-haiku-latest"),
        "gemini" => Some("gemini-1.5-flash"),
        "groq" => Some("llama-3.1-8b-instant"),
        "deepseek" => Some("deepseek-chat"),
        _ => None,
    }
}

fn default_base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "groq" => Some("https://api.groq.com/openai/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        _ => None,
    }
}

/// Build a backend for a resolved config. Fails when the provider id is
/// unknown or the config is incomplete.
pub fn build_provider(
    mut config: LlmConfig,
    transport: HttpTransport,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if !KNOWN_PROVIDERS.contains(&config.provider.as_str()) {
        tracing::error!(
            "[ProviderRegistry] Unknown provider '{}', expected one of: {}",
            config.provider,
            KNOWN_PROVIDERS.join(", ")
        );
        return Err(LlmError::Configuration(config.provider));
    }
    if !config.is_valid() {
        return Err(LlmError::Configuration(config.provider));
    }
    if config.base_url.is_none() {
        config.base_url = default_base_url(&config.provider).map(str::to_string);
    }

    let provider: Arc<dyn LlmProvider> = match config.provider.as_str() {
        "openai" | "groq" | "deepseek" => Arc::new(OpenAiProvider::new(config, transport)),
        "anthropic" => Arc::new(AnthropicProvider::new(config, transport)),
        "gemini" => Arc::new(GeminiProvider::new(config, transport)),
        _ => return Err(LlmError::Configuration(config.provider)),
    };
    Ok(provider)
}
