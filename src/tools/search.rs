//! Web search tool
//!
//! Information Hiding:
//! - Brave Search wire format and auth header hidden in `BraveSearch`
//! - `WebSearchTool` adapts any `SearchProvider` to the model-facing tool
//! - Search failures become a failed `ToolResult`, never a failed turn

use super::{SearchHit, SearchProvider, SearchResults, Tool, ToolMetadata, ToolParameter, ToolResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";
pub const TOOL_NAME: &str = "web_search";
const RESULT_COUNT: usize = 5;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

pub struct BraveSearch {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl BraveSearch {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    async fn search(&self, query: &str) -> Result<SearchResults> {
        tracing::debug!("[BraveSearch] Searching: {}", query);
        let count = RESULT_COUNT.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .context("Search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("search backend returned {}: {}", status.as_u16(), body);
        }

        let parsed: BraveResponse = response.json().await.context("Invalid search response")?;
        let results = parsed
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .take(RESULT_COUNT)
            .map(|r| SearchHit {
                title: strip_html(&r.title),
                snippet: strip_html(&r.description),
            })
            .collect();

        Ok(SearchResults {
            results,
            search_term: query.to_string(),
        })
    }
}

fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}

/// Model-facing `web_search` tool backed by a `SearchProvider`.
pub struct WebSearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Look up current facts about the secret item on the web before answering. \
                          Use only when unsure about a factual detail."
                .to_string(),
            parameters: vec![ToolParameter {
                name: "query".to_string(),
                param_type: "string".to_string(),
                description: "Search query about the secret item".to_string(),
                required: true,
            }],
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'query' parameter is required and must be a string"))?;
        if query.trim().is_empty() {
            anyhow::bail!("'query' must not be empty");
        }
        Ok(())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        if let Err(e) = self.validate(&args) {
            return Ok(ToolResult::failure(e.to_string()));
        }
        let query = args["query"].as_str().unwrap_or_default().trim();

        match self.provider.search(query).await {
            Ok(found) if found.results.is_empty() => {
                Ok(ToolResult::success(format!("No results for '{}'.", found.search_term)))
            }
            Ok(found) => {
                let lines: Vec<String> = found
                    .results
                    .iter()
                    .enumerate()
                    .map(|(i, hit)| format!("{}. {}: {}", i + 1, hit.title, hit.snippet))
                    .collect();
                Ok(ToolResult::success(lines.join("\n")))
            }
            Err(e) => {
                tracing::warn!("[WebSearchTool] {} search failed: {:#}", self.provider.name(), e);
                Ok(ToolResult::failure(format!("search unavailable: {}", e)))
            }
        }
    }
}
