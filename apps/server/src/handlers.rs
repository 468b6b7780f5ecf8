use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use articlesmith_core::SilentProgress;
use articlesmith_shared::ArticleSmithError;

use crate::AppState;
use crate::response::{evolve_failure, ingest_failure};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EvolveRequest {
    #[serde(default)]
    id: Option<Value>,
}

impl EvolveRequest {
    /// The id as text. Numbers and strings are both accepted; anything
    /// else becomes an empty id and is rejected downstream.
    fn raw_id(&self) -> String {
        match &self.id {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }
}

pub(crate) async fn evolve(
    State(state): State<AppState>,
    body: Result<Json<EvolveRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "unreadable evolve request");
            return evolve_failure(&ArticleSmithError::invalid_request(
                "Article ID is required.",
            ));
        }
    };

    match state.services.evolution.evolve(&request.raw_id()).await {
        Ok(outcome) if outcome.already_evolved => {
            info!(id = %outcome.article.id, "article already evolved");
            Json(json!({
                "message": "This article is already optimized.",
                "data": outcome.article,
                "alreadyEvolved": true,
            }))
            .into_response()
        }
        Ok(outcome) => Json(json!({
            "message": "Evolution complete. Article updated successfully.",
            "data": outcome.article,
        }))
        .into_response(),
        Err(e) => evolve_failure(&e),
    }
}

pub(crate) async fn ingest(State(state): State<AppState>) -> Response {
    let config = &state.services.config.ingest;
    match state
        .services
        .ingestion
        .ingest(&config.listing_url, config.limit, &SilentProgress)
        .await
    {
        Ok(outcome) => Json(json!({
            "message": "Ingestion complete",
            "count": outcome.articles.len(),
            "data": outcome.articles,
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "ingestion failed");
            ingest_failure(&e)
        }
    }
}

pub(crate) async fn health() -> Json<Value> {
    Json(json!({
        "status": "UP",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use articlesmith_core::{
        EvolutionOrchestrator, EvolutionSettings, GeminiGenerator, GenerativeRewriter,
        IngestionPipeline, Services,
    };
    use articlesmith_crawler::{ContentExtractor, ExtractOptions, ListingOptions, ListingScraper};
    use articlesmith_discovery::CompetitorDiscovery;
    use articlesmith_shared::{
        AppConfig, DEFAULT_SENTINEL_AUTHOR, NewArticle, Reference, StoreBackend, StoreConfig,
    };
    use articlesmith_storage::open_store;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{AppState, build_router};

    fn load_fixture(name: &str) -> String {
        let path = format!("../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    /// Stands in for the listing page, one competitor page and the model.
    struct Upstream {
        server: MockServer,
    }

    impl Upstream {
        async fn start() -> Self {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/competitor"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(load_fixture("competitor_post.html")),
                )
                .mount(&server)
                .await;
            Self { server }
        }

        async fn listing(&self, body: String) {
            Mock::given(method("GET"))
                .and(path("/blogs/page/14/"))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&self.server)
                .await;
        }

        async fn model(&self, response: ResponseTemplate) {
            Mock::given(method("POST"))
                .respond_with(response)
                .mount(&self.server)
                .await;
        }
    }

    struct TestApp {
        addr: SocketAddr,
        services: Services,
        db: std::path::PathBuf,
    }

    impl Drop for TestApp {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.db);
        }
    }

    impl TestApp {
        fn url(&self, route: &str) -> String {
            format!("http://{}{route}", self.addr)
        }

        async fn seed(&self, author: &str) -> String {
            let article = self
                .services
                .store
                .create(&NewArticle {
                    title: "Live Chat Basics".into(),
                    content: "Live chat helps teams answer faster.".into(),
                    author: author.into(),
                    published_at: "2024-03-01T10:00:00Z".parse().unwrap(),
                })
                .await
                .unwrap();
            article.id.to_string()
        }
    }

    async fn spawn_app(upstream: &Upstream) -> TestApp {
        let db = std::env::temp_dir().join(format!("as_server_{}.db", uuid::Uuid::now_v7()));
        let mut config = AppConfig::default();
        config.store = StoreConfig {
            backend: StoreBackend::Local,
            db_path: db.to_string_lossy().into_owned(),
            ..StoreConfig::default()
        };
        config.gemini.endpoint = upstream.server.uri();
        config.ingest.listing_url = format!("{}/blogs/page/14/", upstream.server.uri());

        let store = open_store(&config.store).await.unwrap();
        let discovery = CompetitorDiscovery::new(None).with_fallback(vec![Reference::new(
            "Competitor",
            format!("{}/competitor", upstream.server.uri()),
        )]);
        let extractor = ContentExtractor::new(&ExtractOptions {
            allow_private: true,
            ..ExtractOptions::default()
        })
        .unwrap();
        let generator = GeminiGenerator::new(&config.gemini, "test-key").unwrap();
        let evolution = EvolutionOrchestrator::new(
            store.clone(),
            discovery,
            extractor,
            GenerativeRewriter::new(Arc::new(generator)),
            EvolutionSettings::default(),
        );
        let ingestion = IngestionPipeline::new(
            store.clone(),
            ListingScraper::new(&ListingOptions::default()).unwrap(),
            DEFAULT_SENTINEL_AUTHOR,
        );
        let services = Services {
            store,
            evolution,
            ingestion,
            config: Arc::new(config),
        };

        let app = build_router(AppState::new(services.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        TestApp { addr, services, db }
    }

    async fn post_json(url: &str, body: serde_json::Value) -> (u16, reqwest::header::HeaderMap, serde_json::Value) {
        let resp = reqwest::Client::new()
            .post(url)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        (status, headers, resp.json().await.unwrap())
    }

    fn model_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[tokio::test]
    async fn health_reports_up() {
        let upstream = Upstream::start().await;
        let app = spawn_app(&upstream).await;

        let resp = reqwest::get(app.url("/health")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert!(resp.headers().contains_key("x-request-id"));
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "UP");
        assert!(body["timestamp"].is_string());
    }

    async fn preflight(app: &TestApp, origin: &str) -> reqwest::Response {
        reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, app.url("/api/v1/articles/evolve"))
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn dashboard_origin_passes_preflight() {
        let upstream = Upstream::start().await;
        let app = spawn_app(&upstream).await;

        let resp = preflight(&app, "http://localhost:5173").await;
        assert!(resp.status().is_success());
        let headers = resp.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        for m in ["GET", "POST", "PUT", "DELETE"] {
            assert!(methods.contains(m), "missing {m} in {methods}");
        }
    }

    #[tokio::test]
    async fn other_origins_get_no_cors_grant() {
        let upstream = Upstream::start().await;
        let app = spawn_app(&upstream).await;

        let resp = preflight(&app, "http://evil.test").await;
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn simple_request_from_dashboard_is_allowed() {
        let upstream = Upstream::start().await;
        let app = spawn_app(&upstream).await;

        let resp = reqwest::Client::new()
            .get(app.url("/health"))
            .header("origin", "http://localhost:5173")
            .send()
            .await
            .unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn evolve_without_id_is_bad_request() {
        let upstream = Upstream::start().await;
        let app = spawn_app(&upstream).await;

        let (status, _, body) = post_json(&app.url("/evolve"), serde_json::json!({})).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Evolution failed");
        assert_eq!(body["details"], "Article ID is required.");
    }

    #[tokio::test]
    async fn evolve_unknown_article_is_not_found() {
        let upstream = Upstream::start().await;
        let app = spawn_app(&upstream).await;

        let (status, _, body) =
            post_json(&app.url("/api/v1/articles/evolve"), serde_json::json!({ "id": 999 })).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "Evolution failed");
    }

    #[tokio::test]
    async fn evolve_rewrites_then_short_circuits() {
        let upstream = Upstream::start().await;
        upstream.model(model_reply("## Live Chat\n\n**Faster** answers win.")).await;
        let app = spawn_app(&upstream).await;
        let id = app.seed("Admin").await;

        let (status, _, body) = post_json(
            &app.url("/api/v1/articles/evolve"),
            serde_json::json!({ "id": id.parse::<u64>().unwrap() }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Evolution complete. Article updated successfully.");
        assert_eq!(body["data"]["author"], DEFAULT_SENTINEL_AUTHOR);
        let content = body["data"]["content"].as_str().unwrap();
        assert!(!content.contains("**"));
        assert!(!content.contains('#'));

        let (status, _, body) =
            post_json(&app.url("/evolve"), serde_json::json!({ "id": id })).await;
        assert_eq!(status, 200);
        assert_eq!(body["alreadyEvolved"], true);
        assert_eq!(body["message"], "This article is already optimized.");
    }

    #[tokio::test]
    async fn model_quota_maps_to_429() {
        let upstream = Upstream::start().await;
        upstream.model(ResponseTemplate::new(429)).await;
        let app = spawn_app(&upstream).await;
        let id = app.seed("Admin").await;

        let (status, headers, body) =
            post_json(&app.url("/evolve"), serde_json::json!({ "id": id })).await;
        assert_eq!(status, 429);
        assert_eq!(headers["retry-after"], "60");
        assert_eq!(
            body["details"],
            "API Quota Exceeded. Please try again in 60 seconds."
        );

        let stored = app.services.store.list().await.unwrap();
        assert_eq!(stored[0].author, "Admin");
    }

    #[tokio::test]
    async fn ingest_persists_listing() {
        let upstream = Upstream::start().await;
        upstream.listing(load_fixture("blog_listing.html")).await;
        let app = spawn_app(&upstream).await;

        let (status, _, body) =
            post_json(&app.url("/api/v1/articles/ingest"), serde_json::json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Ingestion complete");
        assert_eq!(body["count"], 3);
        assert_eq!(app.services.store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn ingest_empty_listing_is_bad_request() {
        let upstream = Upstream::start().await;
        upstream
            .listing("<html><body><p>Nothing here.</p></body></html>".into())
            .await;
        let app = spawn_app(&upstream).await;

        let (status, _, body) = post_json(&app.url("/ingest"), serde_json::json!({})).await;
        assert_eq!(status, 400);
        assert_eq!(body["message"], "Scraper found no data.");
    }
}
