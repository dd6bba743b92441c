#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use twentyq::core::llm::{HttpTransport, LlmError};
use twentyq::core::{LlmProvider, LlmRequest, LlmResponse, ProviderRegistry, RetryPolicy};
use twentyq::game::catalog::CannedQuestion;
use twentyq::game::{ItemKnowledge, StaticCatalog};
use twentyq::storage::{GameStore, InMemoryStore};
use twentyq::{Settings, TurnOrchestrator};

/// In-process provider replaying queued replies, then a fixed fallback.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<LlmResponse>>,
    fallback: String,
    delay: Option<Duration>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            script: Mutex::new(
                replies
                    .iter()
                    .map(|r| LlmResponse {
                        content: r.to_string(),
                        ..Default::default()
                    })
                    .collect(),
            ),
            fallback: String::from("No"),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, reply: &str) -> Self {
        self.fallback = reply.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: LlmResponse) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_response(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| LlmResponse {
            content: self.fallback.clone(),
            ..Default::default()
        }))
    }

    fn validate_config(&self) -> bool {
        true
    }
}

/// Full catalog, except the given category only ever holds `secret`.
pub struct PinnedSecret {
    inner: StaticCatalog,
    category: &'static str,
    secret: &'static str,
}

impl PinnedSecret {
    pub fn new(category: &'static str, secret: &'static str) -> Self {
        Self {
            inner: StaticCatalog::new(),
            category,
            secret,
        }
    }
}

impl ItemKnowledge for PinnedSecret {
    fn categories(&self) -> Vec<String> {
        self.inner.categories()
    }

    fn resolve_category(&self, name: &str) -> Option<String> {
        self.inner.resolve_category(name)
    }

    fn items(&self, category: &str) -> Vec<String> {
        if category == self.category {
            vec![self.secret.to_string()]
        } else {
            self.inner.items(category)
        }
    }

    fn has_property(&self, category: &str, item: &str, tag: &str) -> Option<bool> {
        self.inner.has_property(category, item, tag)
    }

    fn mentioned_properties(&self, category: &str, question: &str) -> Vec<String> {
        self.inner.mentioned_properties(category, question)
    }

    fn mentioned_items(&self, category: &str, question: &str) -> Vec<String> {
        self.inner.mentioned_items(category, question)
    }

    fn candidate_questions(&self, category: &str) -> Vec<CannedQuestion> {
        self.inner.candidate_questions(category)
    }
}

pub fn empty_registry() -> ProviderRegistry {
    ProviderRegistry::from_vars(
        HashMap::new(),
        HttpTransport::new(Duration::from_secs(1), RetryPolicy::default()),
    )
}

pub struct Harness {
    pub orchestrator: TurnOrchestrator,
    pub store: Arc<InMemoryStore>,
    pub provider: Arc<ScriptedProvider>,
}

pub fn harness(
    knowledge: Arc<dyn ItemKnowledge>,
    provider: ScriptedProvider,
    settings: Settings,
) -> Harness {
    let provider = Arc::new(provider);
    let registry = empty_registry();
    registry.register_default(provider.clone());

    let store = Arc::new(InMemoryStore::new());
    let orchestrator = TurnOrchestrator::new(
        store.clone() as Arc<dyn GameStore>,
        Arc::new(registry),
        knowledge,
        settings,
    );
    Harness {
        orchestrator,
        store,
        provider,
    }
}

pub fn cat_game(provider: ScriptedProvider) -> Harness {
    harness(
        Arc::new(PinnedSecret::new("Animals", "Cat")),
        provider,
        Settings::default(),
    )
}
