//! In-memory fakes shared by the pipeline tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use articlesmith_discovery::SearchBackend;
use articlesmith_shared::{
    Article, ArticleId, ArticleSmithError, ArticleUpdate, NewArticle, Reference, Result,
};
use articlesmith_storage::ArticleStore;

use crate::rewriter::TextGenerator;

pub(crate) fn article(id: u64, author: &str) -> Article {
    Article {
        id: ArticleId::from(id),
        title: "Live Chat Basics".into(),
        content: "Live chat helps teams answer faster.".into(),
        author: author.into(),
        references: None,
        published_at: "2024-03-01T10:00:00Z".parse().unwrap(),
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MemoryStore {
    articles: Mutex<BTreeMap<u64, Article>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    reject_all: bool,
    reject_titles: Vec<String>,
}

impl MemoryStore {
    pub fn with(articles: Vec<Article>) -> Self {
        let map = articles
            .into_iter()
            .map(|a| (a.id.as_str().parse().unwrap(), a))
            .collect();
        Self {
            articles: Mutex::new(map),
            ..Self::default()
        }
    }

    pub fn rejecting_writes(mut self) -> Self {
        self.reject_all = true;
        self
    }

    pub fn rejecting_title(mut self, title: &str) -> Self {
        self.reject_titles.push(title.to_string());
        self
    }

    pub fn snapshot(&self, id: u64) -> Article {
        self.articles.lock().unwrap()[&id].clone()
    }

    pub fn all(&self) -> Vec<Article> {
        self.articles.lock().unwrap().values().cloned().collect()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn rejects(&self, title: &str) -> bool {
        self.reject_all || self.reject_titles.iter().any(|t| t == title)
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn get(&self, id: &ArticleId) -> Result<Article> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let key: u64 = id
            .as_str()
            .parse()
            .map_err(|_| ArticleSmithError::not_found(id.as_str()))?;
        self.articles
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| ArticleSmithError::not_found(id.as_str()))
    }

    async fn create(&self, new: &NewArticle) -> Result<Article> {
        if self.rejects(&new.title) {
            return Err(ArticleSmithError::PersistenceFailure("rejected".into()));
        }
        let mut articles = self.articles.lock().unwrap();
        let id = articles.keys().next_back().map_or(1, |k| k + 1);
        let article = Article {
            id: ArticleId::from(id),
            title: new.title.clone(),
            content: new.content.clone(),
            author: new.author.clone(),
            references: None,
            published_at: new.published_at,
        };
        articles.insert(id, article.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(article)
    }

    async fn update(&self, id: &ArticleId, update: &ArticleUpdate) -> Result<Article> {
        if self.rejects(&update.title) {
            return Err(ArticleSmithError::Storage("store unavailable".into()));
        }
        let key: u64 = id.as_str().parse().unwrap();
        let article = Article {
            id: id.clone(),
            title: update.title.clone(),
            content: update.content.clone(),
            author: update.author.clone(),
            references: update.references.clone(),
            published_at: update.published_at,
        };
        self.articles.lock().unwrap().insert(key, article.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(article)
    }

    async fn list(&self) -> Result<Vec<Article>> {
        Ok(self.all())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// CountingSearch
// ---------------------------------------------------------------------------

pub(crate) struct CountingSearch {
    hits: Option<Vec<Reference>>,
    calls: AtomicUsize,
}

impl CountingSearch {
    pub fn returning(hits: Vec<Reference>) -> Self {
        Self {
            hits: Some(hits),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_quota() -> Self {
        Self {
            hits: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for CountingSearch {
    async fn search(&self, _query: &str, _count: u32) -> Result<Vec<Reference>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hits.clone().ok_or_else(ArticleSmithError::quota_exceeded)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

// ---------------------------------------------------------------------------
// CountingGenerator
// ---------------------------------------------------------------------------

pub(crate) struct CountingGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl CountingGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn quota() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.reply.clone().ok_or_else(ArticleSmithError::quota_exceeded)
    }

    fn model(&self) -> &str {
        "counting"
    }
}
