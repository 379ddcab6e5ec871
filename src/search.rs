//! Web search providers for the fallback path.
//!
//! Google Custom Search when keys are configured, DuckDuckGo instant answers
//! otherwise. The pipeline only consumes the top result.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::SearchSettings;
use crate::core::errors::ChatError;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ordered results for `query`, at most `result_count` of them. An
    /// unreachable provider is [`ChatError::SearchUnavailable`]; a reachable
    /// provider with nothing to say returns an empty list.
    async fn search(&self, query: &str, result_count: usize)
        -> Result<Vec<SearchResult>, ChatError>;
}

pub struct HttpSearchProvider {
    settings: SearchSettings,
    client: reqwest::Client,
}

impl HttpSearchProvider {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WebSearch for HttpSearchProvider {
    async fn search(
        &self,
        query: &str,
        result_count: usize,
    ) -> Result<Vec<SearchResult>, ChatError> {
        let mut results = match self.settings.provider.as_str() {
            "google"
                if !self.settings.google_api_key.is_empty()
                    && !self.settings.google_engine_id.is_empty() =>
            {
                google_search(
                    &self.client,
                    query,
                    &self.settings.google_api_key,
                    &self.settings.google_engine_id,
                    result_count,
                )
                .await?
            }
            _ => duckduckgo_search(&self.client, query).await?,
        };

        results.truncate(result_count);
        Ok(results)
    }
}

async fn google_search(
    client: &reqwest::Client,
    query: &str,
    api_key: &str,
    engine_id: &str,
    result_count: usize,
) -> Result<Vec<SearchResult>, ChatError> {
    let url = format!(
        "https://www.googleapis.com/customsearch/v1?key={}&cx={}&num={}&q={}",
        api_key,
        engine_id,
        result_count.max(1),
        urlencoding::encode(query)
    );

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ChatError::SearchUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ChatError::SearchUnavailable(format!(
            "Google search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| ChatError::SearchUnavailable(e.to_string()))?;

    let items = payload
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for item in items {
        let title = item
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let url = item
            .get("link")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let snippet = item
            .get("snippet")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if !title.is_empty() && !url.is_empty() {
            results.push(SearchResult {
                title,
                url,
                snippet,
            });
        }
    }

    Ok(results)
}

async fn duckduckgo_search(
    client: &reqwest::Client,
    query: &str,
) -> Result<Vec<SearchResult>, ChatError> {
    let url = format!(
        "https://api.duckduckgo.com/?q={}&format=json&no_redirect=1&no_html=1",
        urlencoding::encode(query)
    );

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ChatError::SearchUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ChatError::SearchUnavailable(format!(
            "DuckDuckGo search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| ChatError::SearchUnavailable(e.to_string()))?;

    Ok(parse_duckduckgo(&payload))
}

fn parse_duckduckgo(payload: &Value) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let Some(abstract_text) = payload.get("AbstractText").and_then(|v| v.as_str()) {
        if let Some(url) = payload.get("AbstractURL").and_then(|v| v.as_str()) {
            if !abstract_text.is_empty() && !url.is_empty() {
                results.push(SearchResult {
                    title: abstract_text
                        .split(" - ")
                        .next()
                        .unwrap_or(abstract_text)
                        .to_string(),
                    url: url.to_string(),
                    snippet: abstract_text.to_string(),
                });
            }
        }
    }

    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }

    results
}

fn extract_ddg_topics(items: &[Value], results: &mut Vec<SearchResult>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_ddg_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            url: url.to_string(),
            snippet: text.to_string(),
        });
    }
}
