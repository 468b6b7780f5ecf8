//! Article evolution: fetch, research, rewrite, persist.
//!
//! Each run moves through [`EvolutionStage`]s:
//!
//! ```text
//! Fetching ─┬─> ShortCircuit ──────────────────────────────┬─> Done
//!           └─> Researching -> Generating -> Persisting ───┘
//! any stage ──> Failed
//! ```
//!
//! An article whose author equals the sentinel is already evolved and is
//! returned untouched, without any research or model call. Otherwise the
//! article is rewritten and stored in one update that also sets the
//! sentinel, so repeating a run is always safe.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument};
use uuid::Uuid;

use articlesmith_crawler::ContentExtractor;
use articlesmith_discovery::CompetitorDiscovery;
use articlesmith_shared::{
    Article, ArticleId, ArticleSmithError, ArticleUpdate, DEFAULT_SENTINEL_AUTHOR,
    ResearchContext, Result,
};
use articlesmith_storage::ArticleStore;

use crate::rewriter::GenerativeRewriter;

/// Default number of competitor sources to research.
const DEFAULT_COMPETITOR_COUNT: u32 = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where an evolution run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionStage {
    Fetching,
    ShortCircuit,
    Researching,
    Generating,
    Persisting,
    Done,
    Failed,
}

impl EvolutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::ShortCircuit => "short_circuit",
            Self::Researching => "researching",
            Self::Generating => "generating",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EvolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful `evolve` call.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionOutcome {
    /// The article as it now exists in the store.
    pub article: Article,
    /// `true` when the article was already evolved and nothing was written.
    pub already_evolved: bool,
}

/// Tunables for [`EvolutionOrchestrator`].
#[derive(Debug, Clone)]
pub struct EvolutionSettings {
    /// Author value that marks an article as evolved.
    pub sentinel_author: String,
    /// Competitor sources requested from discovery.
    pub competitor_count: u32,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            sentinel_author: DEFAULT_SENTINEL_AUTHOR.to_string(),
            competitor_count: DEFAULT_COMPETITOR_COUNT,
        }
    }
}

// ---------------------------------------------------------------------------
// EvolutionOrchestrator
// ---------------------------------------------------------------------------

/// Drives a single article through research, rewriting and persistence.
#[derive(Clone)]
pub struct EvolutionOrchestrator {
    store: Arc<dyn ArticleStore>,
    discovery: CompetitorDiscovery,
    extractor: ContentExtractor,
    rewriter: GenerativeRewriter,
    settings: EvolutionSettings,
}

impl EvolutionOrchestrator {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        discovery: CompetitorDiscovery,
        extractor: ContentExtractor,
        rewriter: GenerativeRewriter,
        settings: EvolutionSettings,
    ) -> Self {
        Self {
            store,
            discovery,
            extractor,
            rewriter,
            settings,
        }
    }

    /// Evolve the article identified by `raw_id`.
    ///
    /// At most one store read and one store write happen per call.
    #[instrument(skip(self), fields(article_id = %raw_id.trim(), run_id = %Uuid::now_v7()))]
    pub async fn evolve(&self, raw_id: &str) -> Result<EvolutionOutcome> {
        match self.run(raw_id).await {
            Ok(outcome) => {
                transition(EvolutionStage::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!(stage = %EvolutionStage::Failed, kind = e.kind(), error = %e, "evolution failed");
                Err(e)
            }
        }
    }

    async fn run(&self, raw_id: &str) -> Result<EvolutionOutcome> {
        let id = ArticleId::parse(raw_id)?;

        transition(EvolutionStage::Fetching);
        let article = self.store.get(&id).await?;

        if article.is_evolved(&self.settings.sentinel_author) {
            transition(EvolutionStage::ShortCircuit);
            return Ok(EvolutionOutcome {
                article,
                already_evolved: true,
            });
        }

        transition(EvolutionStage::Researching);
        let research = self.research(&article.title).await;

        transition(EvolutionStage::Generating);
        let content = self.rewriter.rewrite(&article, &research).await?;

        transition(EvolutionStage::Persisting);
        let update = ArticleUpdate {
            title: article.title.clone(),
            content,
            author: self.settings.sentinel_author.clone(),
            published_at: article.published_at,
            references: Some(research.references()),
        };
        let updated = self
            .store
            .update(&id, &update)
            .await
            .map_err(|e| match e {
                ArticleSmithError::PersistenceFailure(_) => e,
                other => ArticleSmithError::PersistenceFailure(other.to_string()),
            })?;

        Ok(EvolutionOutcome {
            article: updated,
            already_evolved: false,
        })
    }

    /// Discover competitors and extract what can be extracted, in order.
    async fn research(&self, topic: &str) -> ResearchContext {
        let sources = self
            .discovery
            .discover(topic, self.settings.competitor_count)
            .await;

        let mut context = ResearchContext::default();
        for source in &sources {
            if let Some(excerpt) = self.extractor.extract(&source.url).await {
                context.push(source, excerpt);
            }
        }

        info!(
            discovered = sources.len(),
            extracted = context.len(),
            "research gathered"
        );
        context
    }
}

fn transition(stage: EvolutionStage) {
    info!(stage = %stage, "evolution stage");
}
