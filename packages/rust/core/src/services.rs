//! Wiring: build every collaborator from an [`AppConfig`].

use std::sync::Arc;

use tracing::{info, warn};

use articlesmith_crawler::{ContentExtractor, ExtractOptions, ListingOptions, ListingScraper};
use articlesmith_discovery::{CompetitorDiscovery, GoogleSearchBackend, SearchBackend, SearchOptions};
use articlesmith_shared::{AppConfig, Result, read_secret};
use articlesmith_storage::{ArticleStore, open_store};

use crate::evolution::{EvolutionOrchestrator, EvolutionSettings};
use crate::ingest::IngestionPipeline;
use crate::rewriter::{GeminiGenerator, GenerativeRewriter};

/// Everything the entry points need, built once per process.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn ArticleStore>,
    pub evolution: EvolutionOrchestrator,
    pub ingestion: IngestionPipeline,
    pub config: Arc<AppConfig>,
}

impl Services {
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let store = open_store(&config.store).await?;

        let discovery = CompetitorDiscovery::new(search_backend(&config)?);

        let extractor = ContentExtractor::new(&ExtractOptions {
            timeout_secs: config.scrape.timeout_secs,
            max_chars: config.scrape.excerpt_max_chars,
            allow_private: false,
        })?;

        let api_key = read_secret(&config.gemini.api_key_env).unwrap_or_else(|| {
            warn!(
                var = %config.gemini.api_key_env,
                "model API key not set, evolution requests will fail"
            );
            String::new()
        });
        let generator = GeminiGenerator::new(&config.gemini, api_key)?;

        let evolution = EvolutionOrchestrator::new(
            store.clone(),
            discovery,
            extractor,
            GenerativeRewriter::new(Arc::new(generator)),
            EvolutionSettings {
                sentinel_author: config.evolution.sentinel_author.clone(),
                competitor_count: config.search.result_count,
            },
        );

        let scraper = ListingScraper::new(&ListingOptions {
            timeout_secs: config.ingest.timeout_secs,
            excerpt_max_chars: config.ingest.excerpt_max_chars,
        })?;
        let ingestion =
            IngestionPipeline::new(store.clone(), scraper, config.evolution.sentinel_author.clone());

        info!(store = store.name(), model = %config.gemini.model, "services ready");

        Ok(Self {
            store,
            evolution,
            ingestion,
            config: Arc::new(config),
        })
    }
}

/// The search backend, or `None` when either credential is missing.
fn search_backend(config: &AppConfig) -> Result<Option<Arc<dyn SearchBackend>>> {
    let key = read_secret(&config.search.api_key_env);
    let cx = read_secret(&config.search.cx_env);

    match (key, cx) {
        (Some(key), Some(cx)) => {
            let backend = GoogleSearchBackend::new(
                &config.search.endpoint,
                key,
                cx,
                &SearchOptions {
                    timeout_secs: config.search.timeout_secs,
                },
            )?;
            Ok(Some(Arc::new(backend)))
        }
        _ => {
            info!("search credentials not set, competitor research will use fallback sources");
            Ok(None)
        }
    }
}
