//! Google Programmable Search (Custom Search JSON API) backend.

use std::time::Duration;

use async_trait::async_trait;
use articlesmith_shared::{ArticleSmithError, Reference, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{SearchBackend, USER_AGENT};

/// Default timeout in seconds for search requests.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Options for the search HTTP client.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: String,
    link: String,
}

/// Search backend for the Custom Search JSON API.
pub struct GoogleSearchBackend {
    client: Client,
    endpoint: Url,
    api_key: String,
    cx: String,
}

impl GoogleSearchBackend {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        cx: impl Into<String>,
        opts: &SearchOptions,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ArticleSmithError::config(format!("invalid search endpoint '{endpoint}': {e}"))
        })?;

        Ok(Self {
            client: build_client(opts)?,
            endpoint,
            api_key: api_key.into(),
            cx: cx.into(),
        })
    }
}

#[async_trait]
impl SearchBackend for GoogleSearchBackend {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<Reference>> {
        let num = count.to_string();
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ArticleSmithError::Network(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ArticleSmithError::parse(format!("malformed search response: {e}")))?;

        debug!(items = parsed.items.len(), "search response parsed");

        Ok(parsed
            .items
            .into_iter()
            .map(|item| Reference::new(item.title, item.link))
            .collect())
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// 429 is always a rate limit; 403 is one only when the body says so
/// (daily limits come back as 403 with a quota reason).
fn classify_failure(status: StatusCode, body: &str) -> ArticleSmithError {
    let quota_body = body.to_ascii_lowercase().contains("quota")
        || body.contains("rateLimitExceeded")
        || body.contains("dailyLimitExceeded");

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && quota_body)
    {
        ArticleSmithError::quota_exceeded()
    } else {
        ArticleSmithError::Network(format!("search service returned HTTP {status}"))
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &SearchOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| ArticleSmithError::Network(format!("failed to build HTTP client: {e}")))
}
