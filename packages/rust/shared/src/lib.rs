//! Shared types, error model, and configuration for ArticleSmith.
//!
//! This crate is the foundation depended on by all other ArticleSmith crates.
//! It provides:
//! - [`ArticleSmithError`], the unified error type
//! - Domain types ([`Article`], [`ArticleId`], [`Reference`], [`ResearchContext`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EvolutionConfig, GeminiConfig, IngestConfig, ScrapeConfig, SearchConfig,
    ServerConfig, StoreBackend, StoreConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, read_secret, validate_api_key,
};
pub use error::{ArticleSmithError, QUOTA_RETRY_HINT, Result};
pub use types::{
    Article, ArticleId, ArticleUpdate, DEFAULT_AUTHOR, DEFAULT_SENTINEL_AUTHOR, NewArticle,
    Reference, ResearchContext, ResearchExcerpt, truncate_chars,
};
