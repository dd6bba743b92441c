//! LLM plumbing: shared request/response shape, vendor backends, retry
//! policy and the per-function provider registry.

pub mod llm;
pub mod providers;
pub mod registry;
pub mod retry;

pub use llm::{ChatMessage, ChatRole, FunctionCall, FunctionDeclaration, LlmProvider, LlmRequest, LlmResponse};
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
