//! Listing ingestion: scrape a blog listing page and seed the store.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use articlesmith_crawler::{ListingCandidate, ListingScraper};
use articlesmith_shared::{Article, ArticleSmithError, DEFAULT_AUTHOR, NewArticle, Result};
use articlesmith_storage::ArticleStore;

/// Result of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Articles the store accepted, in listing order.
    pub articles: Vec<Article>,
    /// Candidates whose write was rejected.
    pub failed: usize,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting ingestion status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each successful write.
    fn article_saved(&self, title: &str, current: usize, total: usize);
    /// Called when a write is rejected.
    fn article_failed(&self, title: &str, error: &ArticleSmithError);
    /// Called when the run completes.
    fn done(&self, outcome: &IngestOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn article_saved(&self, _title: &str, _current: usize, _total: usize) {}
    fn article_failed(&self, _title: &str, _error: &ArticleSmithError) {}
    fn done(&self, _outcome: &IngestOutcome) {}
}

/// Seeds the article store from a listing page.
#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn ArticleStore>,
    scraper: ListingScraper,
    sentinel_author: String,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        scraper: ListingScraper,
        sentinel_author: impl Into<String>,
    ) -> Self {
        Self {
            store,
            scraper,
            sentinel_author: sentinel_author.into(),
        }
    }

    /// Scrape up to `limit` posts from `listing_url` and create them one at
    /// a time. A rejected write is counted and skipped.
    #[instrument(skip(self, progress))]
    pub async fn ingest(
        &self,
        listing_url: &str,
        limit: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<IngestOutcome> {
        let start = Instant::now();

        progress.phase("Scanning listing page");
        let candidates = self.scraper.scan(listing_url, limit).await?;
        if candidates.is_empty() {
            return Err(ArticleSmithError::EmptyListing {
                url: listing_url.to_string(),
            });
        }

        progress.phase("Saving articles");
        let total = candidates.len();
        let mut articles = Vec::with_capacity(total);
        let mut failed = 0;

        for candidate in candidates {
            let new = self.to_new_article(candidate);
            match self.store.create(&new).await {
                Ok(article) => {
                    articles.push(article);
                    progress.article_saved(&new.title, articles.len(), total);
                }
                Err(e) => {
                    warn!(title = %new.title, error = %e, "failed to save article");
                    progress.article_failed(&new.title, &e);
                    failed += 1;
                }
            }
        }

        if articles.is_empty() {
            return Err(ArticleSmithError::PersistenceFailure(format!(
                "store rejected all {failed} candidate articles"
            )));
        }

        let outcome = IngestOutcome {
            articles,
            failed,
            elapsed: start.elapsed(),
        };
        info!(
            saved = outcome.articles.len(),
            failed = outcome.failed,
            elapsed_ms = outcome.elapsed.as_millis(),
            "ingestion complete"
        );
        progress.done(&outcome);
        Ok(outcome)
    }

    /// Apply defaults. A scraped byline equal to the sentinel would make the
    /// article look already evolved, so it is replaced too.
    fn to_new_article(&self, candidate: ListingCandidate) -> NewArticle {
        let author = candidate
            .author
            .filter(|a| *a != self.sentinel_author)
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        NewArticle {
            title: candidate.title,
            content: candidate.excerpt,
            author,
            published_at: candidate.published_at.unwrap_or_else(Utc::now),
        }
    }
}
