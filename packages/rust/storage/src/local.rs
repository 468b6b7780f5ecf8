//! Embedded libSQL article store (offline mode).

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Row, Value, params};
use tracing::{info, instrument};

use articlesmith_shared::{
    Article, ArticleId, ArticleSmithError, ArticleUpdate, NewArticle, Reference, Result,
};

use crate::{ArticleStore, migrations};

const ARTICLE_COLUMNS: &str = "id, title, content, author, published_at, references_json";

/// Article store backed by a local libSQL database file.
pub struct LocalArticleStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LocalArticleStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArticleSmithError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ArticleSmithError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ArticleSmithError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ArticleSmithError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    async fn fetch(&self, rowid: i64) -> Result<Option<Article>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
                params![rowid],
            )
            .await
            .map_err(|e| ArticleSmithError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_article(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ArticleSmithError::Storage(e.to_string())),
        }
    }
}

/// Local ids are integers; anything else cannot exist in this store.
fn rowid(id: &ArticleId) -> Option<i64> {
    id.as_str().parse().ok()
}

fn row_to_article(row: &Row) -> Result<Article> {
    let storage_err = |e: libsql::Error| ArticleSmithError::Storage(e.to_string());

    let id: i64 = row.get(0).map_err(storage_err)?;
    let published_raw: String = row.get(4).map_err(storage_err)?;
    let references = match row.get_value(5).map_err(storage_err)? {
        Value::Null => None,
        Value::Text(json) => Some(
            serde_json::from_str::<Vec<Reference>>(&json)
                .map_err(|e| ArticleSmithError::parse(format!("references_json: {e}")))?,
        ),
        other => {
            return Err(ArticleSmithError::Storage(format!(
                "references_json: expected text or NULL, got {other:?}"
            )));
        }
    };

    Ok(Article {
        id: ArticleId::from(id as u64),
        title: row.get(1).map_err(storage_err)?,
        content: row.get(2).map_err(storage_err)?,
        author: row.get(3).map_err(storage_err)?,
        references,
        published_at: DateTime::parse_from_rfc3339(&published_raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| ArticleSmithError::parse(format!("published_at: {e}")))?,
    })
}

#[async_trait]
impl ArticleStore for LocalArticleStore {
    #[instrument(skip(self), fields(id = %id))]
    async fn get(&self, id: &ArticleId) -> Result<Article> {
        let Some(rowid) = rowid(id) else {
            return Err(ArticleSmithError::not_found(id.as_str()));
        };
        self.fetch(rowid)
            .await?
            .ok_or_else(|| ArticleSmithError::not_found(id.as_str()))
    }

    #[instrument(skip_all, fields(title = %article.title))]
    async fn create(&self, article: &NewArticle) -> Result<Article> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO articles (title, content, author, published_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    article.title.as_str(),
                    article.content.as_str(),
                    article.author.as_str(),
                    article.published_at.to_rfc3339(),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| ArticleSmithError::PersistenceFailure(e.to_string()))?;

        let rowid = self.conn.last_insert_rowid();
        self.fetch(rowid).await?.ok_or_else(|| {
            ArticleSmithError::PersistenceFailure(format!("inserted row {rowid} not readable"))
        })
    }

    #[instrument(skip(self, update), fields(id = %id))]
    async fn update(&self, id: &ArticleId, update: &ArticleUpdate) -> Result<Article> {
        let Some(rowid) = rowid(id) else {
            return Err(ArticleSmithError::PersistenceFailure(format!(
                "no article with id {id}"
            )));
        };

        let references_json = update
            .references
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ArticleSmithError::PersistenceFailure(e.to_string()))?;

        let changed = self
            .conn
            .execute(
                "UPDATE articles
                 SET title = ?1, content = ?2, author = ?3, published_at = ?4,
                     references_json = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    update.title.as_str(),
                    update.content.as_str(),
                    update.author.as_str(),
                    update.published_at.to_rfc3339(),
                    references_json,
                    Utc::now().to_rfc3339(),
                    rowid
                ],
            )
            .await
            .map_err(|e| ArticleSmithError::PersistenceFailure(e.to_string()))?;

        if changed == 0 {
            return Err(ArticleSmithError::PersistenceFailure(format!(
                "no article with id {id}"
            )));
        }

        self.fetch(rowid).await?.ok_or_else(|| {
            ArticleSmithError::PersistenceFailure(format!("updated row {rowid} not readable"))
        })
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Article>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY id"),
                params![],
            )
            .await
            .map_err(|e| ArticleSmithError::Storage(e.to_string()))?;

        let mut articles = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ArticleSmithError::Storage(e.to_string()))?
        {
            articles.push(row_to_article(&row)?);
        }
        Ok(articles)
    }

    fn name(&self) -> &str {
        "local"
    }
}
