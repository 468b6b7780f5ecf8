//! Competitor discovery for article evolution.
//!
//! Before an article is rewritten, ArticleSmith looks for a couple of
//! competing posts on the same topic. Freshness of that research matters
//! less than the evolution succeeding at all, so [`CompetitorDiscovery`]
//! never fails: quota exhaustion, missing credentials, network trouble or a
//! malformed response all degrade to a fixed fallback list.

mod google;

use std::sync::Arc;

use async_trait::async_trait;
use articlesmith_shared::{Reference, Result};
use tracing::{debug, info, instrument, warn};

pub use google::{GoogleSearchBackend, SearchOptions};

/// User-Agent string for search requests.
pub(crate) const USER_AGENT: &str = concat!("ArticleSmith/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// SearchBackend
// ---------------------------------------------------------------------------

/// A web search service that returns `(title, url)` hits for a query.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Return at most `count` results for `query`.
    async fn search(&self, query: &str, count: u32) -> Result<Vec<Reference>>;

    /// Human-readable backend name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Sources used whenever the search service cannot answer.
pub fn fallback_sources() -> Vec<Reference> {
    vec![
        Reference::new("Customer Success Platform Guide", "https://example.com/guide"),
        Reference::new("Industry Efficiency Standards", "https://example.com/standards"),
    ]
}

/// The query sent to the search service for an article topic.
pub fn search_query(topic: &str) -> String {
    format!("{} blog", topic.trim())
}

// ---------------------------------------------------------------------------
// CompetitorDiscovery
// ---------------------------------------------------------------------------

/// Finds competing documents for a topic, degrading to a static list.
#[derive(Clone)]
pub struct CompetitorDiscovery {
    backend: Option<Arc<dyn SearchBackend>>,
    fallback: Vec<Reference>,
}

impl CompetitorDiscovery {
    /// `None` means no search credentials are configured; every call then
    /// returns the fallback list.
    pub fn new(backend: Option<Arc<dyn SearchBackend>>) -> Self {
        Self {
            backend,
            fallback: fallback_sources(),
        }
    }

    /// Replace the fallback list.
    pub fn with_fallback(mut self, fallback: Vec<Reference>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Discover up to `count` competing documents for `topic`.
    #[instrument(skip(self), fields(backend = self.backend_name()))]
    pub async fn discover(&self, topic: &str, count: u32) -> Vec<Reference> {
        let Some(backend) = &self.backend else {
            info!("no search credentials configured, using fallback sources");
            return self.fallback(count);
        };

        let query = search_query(topic);
        match backend.search(&query, count).await {
            Ok(mut hits) => {
                hits.truncate(count as usize);
                debug!(hits = hits.len(), %query, "search returned competitors");
                hits
            }
            Err(e) if e.is_quota() => {
                warn!("search quota exhausted, using fallback sources");
                self.fallback(count)
            }
            Err(e) => {
                warn!(error = %e, "search failed, using fallback sources");
                self.fallback(count)
            }
        }
    }

    /// The first `count` fallback sources.
    fn fallback(&self, count: u32) -> Vec<Reference> {
        self.fallback.iter().take(count as usize).cloned().collect()
    }

    fn backend_name(&self) -> &str {
        self.backend.as_deref().map_or("none", |b| b.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlesmith_shared::ArticleSmithError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend that records the queries it receives.
    struct ScriptedBackend {
        outcome: fn() -> Result<Vec<Reference>>,
        calls: AtomicUsize,
        last_query: std::sync::Mutex<Option<String>>,
    }

    impl ScriptedBackend {
        fn new(outcome: fn() -> Result<Vec<Reference>>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                last_query: std::sync::Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        async fn search(&self, query: &str, _count: u32) -> Result<Vec<Reference>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(query.to_string());
            (self.outcome)()
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn three_hits() -> Result<Vec<Reference>> {
        Ok(vec![
            Reference::new("One", "https://one.example/a"),
            Reference::new("Two", "https://two.example/b"),
            Reference::new("Three", "https://three.example/c"),
        ])
    }

    #[test]
    fn query_appends_blog() {
        assert_eq!(search_query("  Chatbots for SaaS "), "Chatbots for SaaS blog");
    }

    #[tokio::test]
    async fn missing_backend_uses_fallback() {
        let discovery = CompetitorDiscovery::new(None);
        let hits = discovery.discover("anything", 2).await;
        assert_eq!(hits, fallback_sources());
    }

    #[tokio::test]
    async fn results_are_truncated_to_count() {
        let backend = ScriptedBackend::new(three_hits);
        let discovery = CompetitorDiscovery::new(Some(backend.clone()));
        let hits = discovery.discover("Live chat", 2).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "One");
        assert_eq!(
            backend.last_query.lock().unwrap().as_deref(),
            Some("Live chat blog")
        );
    }

    #[tokio::test]
    async fn quota_error_uses_fallback() {
        let backend = ScriptedBackend::new(|| Err(ArticleSmithError::quota_exceeded()));
        let discovery = CompetitorDiscovery::new(Some(backend.clone()));
        let hits = discovery.discover("topic", 2).await;
        assert_eq!(hits, fallback_sources());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn network_error_uses_custom_fallback() {
        let backend = ScriptedBackend::new(|| Err(ArticleSmithError::Network("reset".into())));
        let custom = vec![Reference::new("Local", "http://127.0.0.1:9/x")];
        let discovery = CompetitorDiscovery::new(Some(backend)).with_fallback(custom.clone());
        assert_eq!(discovery.discover("topic", 2).await, custom);
    }

    #[tokio::test]
    async fn fallback_is_truncated_to_count() {
        let discovery = CompetitorDiscovery::new(None);
        let hits = discovery.discover("topic", 1).await;
        assert_eq!(hits, fallback_sources()[..1].to_vec());

        let backend = ScriptedBackend::new(|| Err(ArticleSmithError::quota_exceeded()));
        let discovery = CompetitorDiscovery::new(Some(backend));
        assert_eq!(discovery.discover("topic", 1).await.len(), 1);
        assert!(discovery.discover("topic", 0).await.is_empty());
    }

    #[tokio::test]
    async fn empty_result_is_not_a_failure() {
        let backend = ScriptedBackend::new(|| Ok(Vec::new()));
        let discovery = CompetitorDiscovery::new(Some(backend));
        assert!(discovery.discover("obscure", 2).await.is_empty());
    }
}
