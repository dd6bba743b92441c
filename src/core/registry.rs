//! Provider Registry
//!
//! Information Hiding:
//! - Environment lookup order hidden behind `resolve`
//! - Successful and failed resolutions are both memoized per function name
//! - Injected providers (tests, embedding) take precedence over configuration
//!
//! Lookup order for a function `answer_question`:
//! `ANSWER_QUESTION_LLM_PROVIDER` → `LLM_PROVIDER` → `openai`, then
//! `{PROVIDER}_API_KEY`, `{PROVIDER}_MODEL`, `{PROVIDER}_BASE_URL`,
//! `{PROVIDER}_ORGANIZATION`.

use super::llm::{HttpTransport, LlmConfig, LlmError, LlmProvider};
use super::providers;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

pub const FN_ANSWER_QUESTION: &str = "answer_question";
pub const FN_GENERATE_QUESTION: &str = "generate_question";
pub const FN_GENERATE_HINT: &str = "generate_hint";

const DEFAULT_PROVIDER: &str = "openai";

/// Failed resolutions keep only the provider id so the same error can be
/// rebuilt on every call.
type Resolution = Result<Arc<dyn LlmProvider>, String>;

pub struct ProviderRegistry {
    vars: RwLock<HashMap<String, String>>,
    transport: HttpTransport,
    cache: Mutex<HashMap<String, Resolution>>,
    overrides: Mutex<HashMap<String, Arc<dyn LlmProvider>>>,
    fallback: Mutex<Option<Arc<dyn LlmProvider>>>,
}

impl ProviderRegistry {
    /// Snapshot the process environment.
    pub fn from_env(transport: HttpTransport) -> Self {
        Self::from_vars(std::env::vars().collect(), transport)
    }

    pub fn from_vars(vars: HashMap<String, String>, transport: HttpTransport) -> Self {
        Self {
            vars: RwLock::new(vars),
            transport,
            cache: Mutex::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
            fallback: Mutex::new(None),
        }
    }

    /// Use `provider` for one function name regardless of configuration.
    pub fn register(&self, function: &str, provider: Arc<dyn LlmProvider>) {
        tracing::info!(
            "[ProviderRegistry] Registering provider '{}' for {}",
            provider.name(),
            function
        );
        lock(&self.overrides).insert(function.to_string(), provider);
    }

    /// Use `provider` for every function without an explicit registration.
    pub fn register_default(&self, provider: Arc<dyn LlmProvider>) {
        *lock(&self.fallback) = Some(provider);
    }

    /// Replace the configuration snapshot and forget cached resolutions.
    pub fn reload(&self, vars: HashMap<String, String>) {
        if let Ok(mut current) = self.vars.write() {
            *current = vars;
        }
        lock(&self.cache).clear();
        tracing::info!("[ProviderRegistry] Configuration reloaded");
    }

    pub fn resolve(&self, function: &str) -> Result<Arc<dyn LlmProvider>, LlmError> {
        if let Some(provider) = lock(&self.overrides).get(function) {
            return Ok(provider.clone());
        }
        if let Some(provider) = lock(&self.fallback).as_ref() {
            return Ok(provider.clone());
        }

        let mut cache = lock(&self.cache);
        let resolution = cache
            .entry(function.to_string())
            .or_insert_with(|| self.build(function));

        match resolution {
            Ok(provider) => Ok(provider.clone()),
            Err(provider_id) => Err(LlmError::Configuration(provider_id.clone())),
        }
    }

    /// Provider id that `function` resolves to under the current snapshot.
    pub fn provider_id(&self, function: &str) -> String {
        let vars = match self.vars.read() {
            Ok(vars) => vars,
            Err(poisoned) => poisoned.into_inner(),
        };
        let specific = format!("{}_LLM_PROVIDER", function.to_uppercase());
        vars.get(&specific)
            .or_else(|| vars.get("LLM_PROVIDER"))
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    fn build(&self, function: &str) -> Resolution {
        let provider_id = self.provider_id(function);
        let config = self.config_for(&provider_id);

        match providers::build_provider(config, self.transport.clone()) {
            Ok(provider) => {
                tracing::info!(
                    "[ProviderRegistry] {} resolved to provider '{}'",
                    function,
                    provider_id
                );
                Ok(provider)
            }
            Err(e) => {
                tracing::error!("[ProviderRegistry] {} cannot be resolved: {}", function, e);
                Err(provider_id)
            }
        }
    }

    fn config_for(&self, provider_id: &str) -> LlmConfig {
        let vars = match self.vars.read() {
            Ok(vars) => vars,
            Err(poisoned) => poisoned.into_inner(),
        };
        let prefix = provider_id.to_uppercase();
        let get = |suffix: &str| {
            vars.get(&format!("{}_{}", prefix, suffix))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        LlmConfig {
            provider: provider_id.to_string(),
            api_key: get("API_KEY").unwrap_or_default(),
            model: get("MODEL")
                .or_else(|| providers::default_model(provider_id).map(str::to_string))
                .unwrap_or_default(),
            organization: get("ORGANIZATION"),
            base_url: get("BASE_URL"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::retry::RetryPolicy;
    use std::time::Duration;

    fn registry(pairs: &[(&str, &str)]) -> ProviderRegistry {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProviderRegistry::from_vars(
            vars,
            HttpTransport::new(Duration::from_secs(5), RetryPolicy::default()),
        )
    }

    #[test]
    fn test_function_override_beats_global() {
        let reg = registry(&[
            ("LLM_PROVIDER", "openai"),
            ("GENERATE_HINT_LLM_PROVIDER", "Anthropic"),
            ("OPENAI_API_KEY", "sk"),
            ("ANTHROPIC_API_KEY", "ak"),
        ]);
        assert_eq!(reg.provider_id(FN_GENERATE_HINT), "anthropic");
        assert_eq!(reg.provider_id(FN_ANSWER_QUESTION), "openai");
        assert_eq!(reg.resolve(FN_GENERATE_HINT).unwrap().name(), "anthropic");
        assert_eq!(reg.resolve(FN_ANSWER_QUESTION).unwrap().name(), "openai");
    }

    #[test]
    fn test_defaults_to_openai() {
        let reg = registry(&[("OPENAI_API_KEY", "sk")]);
        assert_eq!(reg.resolve(FN_GENERATE_QUESTION).unwrap().name(), "openai");
    }

    #[test]
    fn test_missing_key_is_cached_until_reload() {
        let reg = registry(&[("LLM_PROVIDER", "gemini")]);

        let first = reg.resolve(FN_ANSWER_QUESTION).err().unwrap();
        assert_eq!(
            first.to_string(),
            "missing/invalid configuration for provider gemini"
        );

        // Fixing the snapshot without reload must not change the outcome.
        if let Ok(mut vars) = reg.vars.write() {
            vars.insert("GEMINI_API_KEY".into(), "g".into());
        }
        assert!(reg.resolve(FN_ANSWER_QUESTION).is_err());

        let mut vars = HashMap::new();
        vars.insert("LLM_PROVIDER".to_string(), "gemini".to_string());
        vars.insert("GEMINI_API_KEY".to_string(), "g".to_string());
        reg.reload(vars);
        assert_eq!(reg.resolve(FN_ANSWER_QUESTION).unwrap().name(), "gemini");
    }

    #[test]
    fn test_unknown_provider_fails() {
        let reg = registry(&[("LLM_PROVIDER", "mystery"), ("MYSTERY_API_KEY", "k")]);
        assert!(matches!(
            reg.resolve(FN_ANSWER_QUESTION),
            Err(LlmError::Configuration(id)) if id == "mystery"
        ));
    }

    #[test]
    fn test_openai_compatible_alias() {
        let reg = registry(&[("LLM_PROVIDER", "groq"), ("GROQ_API_KEY", "k")]);
        assert_eq!(reg.resolve(FN_ANSWER_QUESTION).unwrap().name(), "groq");
    }
}
