//! REST article store client.
//!
//! Responses may be bare records or wrapped in a `{ "data": ... }` envelope;
//! both shapes are accepted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use articlesmith_shared::{
    Article, ArticleId, ArticleSmithError, ArticleUpdate, NewArticle, Result,
};

use crate::ArticleStore;

const USER_AGENT: &str = concat!("ArticleSmith/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

/// Client for a remote REST article store.
pub struct HttpArticleStore {
    client: Client,
    base_url: String,
}

impl HttpArticleStore {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            ArticleSmithError::config(format!("invalid store base_url '{base_url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ArticleSmithError::config(format!(
                "store base_url must be http(s): {base_url}"
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ArticleSmithError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/articles", self.base_url)
    }

    fn article_url(&self, id: &ArticleId) -> String {
        format!("{}/articles/{}", self.base_url, id)
    }
}

#[async_trait]
impl ArticleStore for HttpArticleStore {
    #[instrument(skip(self), fields(id = %id))]
    async fn get(&self, id: &ArticleId) -> Result<Article> {
        let response = self
            .client
            .get(self.article_url(id))
            .send()
            .await
            .map_err(|e| ArticleSmithError::Network(format!("store read failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ArticleSmithError::not_found(id.as_str())),
            s if s.is_success() => read_json(response).await,
            s => Err(ArticleSmithError::Storage(format!("store read returned HTTP {s}"))),
        }
    }

    #[instrument(skip_all, fields(title = %article.title))]
    async fn create(&self, article: &NewArticle) -> Result<Article> {
        let response = self
            .client
            .post(self.collection_url())
            .json(article)
            .send()
            .await
            .map_err(|e| ArticleSmithError::PersistenceFailure(format!("store write failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArticleSmithError::PersistenceFailure(format!(
                "store rejected create with HTTP {status}: {}",
                body.trim()
            )));
        }

        read_json(response)
            .await
            .map_err(|e| ArticleSmithError::PersistenceFailure(e.to_string()))
    }

    #[instrument(skip(self, update), fields(id = %id))]
    async fn update(&self, id: &ArticleId, update: &ArticleUpdate) -> Result<Article> {
        let response = self
            .client
            .put(self.article_url(id))
            .json(update)
            .send()
            .await
            .map_err(|e| ArticleSmithError::PersistenceFailure(format!("store write failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArticleSmithError::PersistenceFailure(format!(
                "store rejected update with HTTP {status}: {}",
                body.trim()
            )));
        }

        // The write already happened; an unreadable echo is not a failure.
        match read_json::<Article>(response).await {
            Ok(article) => Ok(article),
            Err(e) => {
                warn!(error = %e, "store accepted update but echoed no article");
                Ok(Article {
                    id: id.clone(),
                    title: update.title.clone(),
                    content: update.content.clone(),
                    author: update.author.clone(),
                    references: update.references.clone(),
                    published_at: update.published_at,
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(|e| ArticleSmithError::Network(format!("store read failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArticleSmithError::Storage(format!(
                "store list returned HTTP {status}"
            )));
        }

        let articles: Vec<Article> = read_json(response).await?;
        debug!(count = articles.len(), "listed articles");
        Ok(articles)
    }

    fn name(&self) -> &str {
        "http"
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ArticleSmithError::Network(format!("store body read failed: {e}")))?;

    serde_json::from_str::<Envelope<T>>(&body)
        .map(Envelope::into_inner)
        .map_err(|e| ArticleSmithError::parse(format!("unexpected store payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn article_json(id: u64, author: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Live Chat Basics",
            "content": "Original body.",
            "author": author,
            "references": null,
            "published_at": "2024-03-01T10:00:00.000000Z",
            "created_at": "2024-03-01T10:00:00.000000Z",
            "updated_at": "2024-03-01T10:00:00.000000Z"
        })
    }

    async fn store_for(server: &MockServer) -> HttpArticleStore {
        HttpArticleStore::new(&format!("{}/api/", server.uri()), 5).unwrap()
    }

    #[tokio::test]
    async fn get_reads_bare_article() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles/36"))
            .respond_with(ResponseTemplate::new(200).set_body_json(article_json(36, "Admin")))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let article = store.get(&ArticleId::from(36)).await.unwrap();
        assert_eq!(article.id.as_str(), "36");
        assert_eq!(article.author, "Admin");
    }

    #[tokio::test]
    async fn get_reads_wrapped_article() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles/7"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": article_json(7, "Admin")})),
            )
            .mount(&server)
            .await;

        let article = store_for(&server).await.get(&ArticleId::from(7)).await.unwrap();
        assert_eq!(article.title, "Live Chat Basics");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "No query results"})))
            .mount(&server)
            .await;

        let err = store_for(&server).await.get(&ArticleId::from(99)).await.unwrap_err();
        assert!(matches!(err, ArticleSmithError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_sends_full_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/articles/36"))
            .and(body_partial_json(json!({
                "author": "Gemini AI",
                "published_at": "2024-03-01T10:00:00Z",
                "references": [{"title": "Guide", "url": "https://a.example/guide"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Article updated successfully",
                "data": article_json(36, "Gemini AI")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let update = ArticleUpdate {
            title: "Live Chat Basics".into(),
            content: "New body.".into(),
            author: "Gemini AI".into(),
            published_at: "2024-03-01T10:00:00Z".parse().unwrap(),
            references: Some(vec![articlesmith_shared::Reference::new(
                "Guide",
                "https://a.example/guide",
            )]),
        };
        let article = store_for(&server)
            .await
            .update(&ArticleId::from(36), &update)
            .await
            .unwrap();
        assert_eq!(article.author, "Gemini AI");
    }

    #[tokio::test]
    async fn rejected_update_is_persistence_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(422).set_body_string("validation failed"))
            .mount(&server)
            .await;

        let update = ArticleUpdate {
            title: "T".into(),
            content: "C".into(),
            author: "Gemini AI".into(),
            published_at: Utc::now(),
            references: None,
        };
        let err = store_for(&server)
            .await
            .update(&ArticleId::from(1), &update)
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleSmithError::PersistenceFailure(_)));
    }

    #[tokio::test]
    async fn create_posts_snake_case_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/articles"))
            .and(body_partial_json(json!({"title": "Live Chat Basics", "author": "Admin"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "status": "success",
                "data": article_json(41, "Admin")
            })))
            .mount(&server)
            .await;

        let new = NewArticle {
            title: "Live Chat Basics".into(),
            content: "Original body.".into(),
            author: "Admin".into(),
            published_at: Utc::now(),
        };
        let created = store_for(&server).await.create(&new).await.unwrap();
        assert_eq!(created.id.as_str(), "41");
    }

    #[tokio::test]
    async fn list_unwraps_data_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [article_json(1, "Admin"), article_json(2, "Gemini AI")]
            })))
            .mount(&server)
            .await;

        let articles = store_for(&server).await.list().await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].author, "Gemini AI");
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(HttpArticleStore::new("ftp://store.example", 5).is_err());
    }
}
