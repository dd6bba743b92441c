//! twentyq - LLM-mediated 20 Questions engine
//!
//! This library tracks facts across a game's message log, picks questions
//! by estimated information gain, normalizes model answers into a fixed
//! vocabulary and talks to hot-swappable LLM providers with retries.

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod storage;
pub mod tools;
pub mod utils;

pub use config::Settings;
pub use error::{GameError, GameResult};
pub use game::TurnOrchestrator;

use crate::core::llm::HttpTransport;
use crate::core::{ProviderRegistry, RetryPolicy};
use crate::game::StaticCatalog;
use crate::storage::{GameStore, InMemoryStore, SqliteStore};
use crate::tools::{BraveSearch, WebSearchTool};
use std::sync::Arc;
use std::time::Duration;

pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Store selected by `storage.database_path`.
pub fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn GameStore>> {
    let path = settings.storage.database_path.trim();
    if path == IN_MEMORY_DATABASE {
        tracing::info!("Using in-memory game store");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::open(path)?))
}

/// Wire store, provider registry, catalog and optional search from settings
/// and the process environment.
pub fn build_orchestrator(settings: Settings) -> anyhow::Result<TurnOrchestrator> {
    let store = build_store(&settings)?;
    let policy = RetryPolicy::new(
        settings.llm.max_attempts,
        Duration::from_millis(settings.llm.base_delay_ms),
    );
    let transport = HttpTransport::new(settings.request_timeout(), policy);
    let registry = Arc::new(ProviderRegistry::from_env(transport));

    let search = match (settings.search.enabled, Settings::search_api_key()) {
        (true, Some(key)) => Some(BraveSearch::new(
            key,
            settings.search.endpoint.clone(),
            settings.request_timeout(),
        )?),
        (true, None) => {
            tracing::info!("SEARCH_API_KEY not set, web search disabled");
            None
        }
        (false, _) => None,
    };

    let mut orchestrator =
        TurnOrchestrator::new(store, registry, Arc::new(StaticCatalog::new()), settings);
    if let Some(search) = search {
        orchestrator = orchestrator.with_search(Arc::new(WebSearchTool::new(Arc::new(search))));
    }
    Ok(orchestrator)
}
