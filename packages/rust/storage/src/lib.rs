//! Article store clients.
//!
//! [`ArticleStore`] is the seam between the pipelines and wherever articles
//! live. Two implementations ship:
//! - [`HttpArticleStore`]: a remote REST store (`/articles`, `/articles/{id}`)
//! - [`LocalArticleStore`]: an embedded libSQL database
//!
//! The store is treated as the authority on identity; this crate never
//! invents ids.

mod http;
mod local;
mod migrations;

use std::sync::Arc;

use async_trait::async_trait;
use articlesmith_shared::{
    Article, ArticleId, ArticleUpdate, NewArticle, Result, StoreBackend, StoreConfig,
};

pub use http::HttpArticleStore;
pub use local::LocalArticleStore;

/// Persistent article storage.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch one article. `NotFound` when the store has no such record.
    async fn get(&self, id: &ArticleId) -> Result<Article>;

    /// Create an article; the store assigns the id.
    async fn create(&self, article: &NewArticle) -> Result<Article>;

    /// Overwrite an article in a single call. Rejections surface as
    /// `PersistenceFailure`.
    async fn update(&self, id: &ArticleId, update: &ArticleUpdate) -> Result<Article>;

    /// All articles, in store order.
    async fn list(&self) -> Result<Vec<Article>>;

    /// Short backend name for tracing.
    fn name(&self) -> &str;
}

/// Open the store selected by `config`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ArticleStore>> {
    let store: Arc<dyn ArticleStore> = match config.backend {
        StoreBackend::Http => Arc::new(HttpArticleStore::new(&config.base_url, config.timeout_secs)?),
        StoreBackend::Local => Arc::new(LocalArticleStore::open(&config.resolved_db_path()).await?),
    };
    tracing::debug!(backend = store.name(), "article store opened");
    Ok(store)
}
