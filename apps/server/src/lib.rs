//! HTTP trigger service for ArticleSmith.
//!
//! Exposes `POST /evolve` and `POST /ingest` under both `/api/v1/articles`
//! and the root, plus `GET /health`. The dashboard origin from
//! `[server] allowed_origin` may call it cross-origin.

mod handlers;
mod middleware;
mod response;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tracing::warn;

use articlesmith_core::Services;

pub use response::status_for;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

/// Routes common to both mount points.
fn article_routes() -> Router<AppState> {
    Router::new()
        .route("/evolve", post(handlers::evolve))
        .route("/ingest", post(handlers::ingest))
}

/// CORS for the dashboard origin, or `None` when the origin is not a valid
/// header value.
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(origin.trim()) {
        Ok(origin) => origin,
        Err(e) => {
            warn!(origin, error = %e, "invalid allowed_origin, CORS disabled");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.services.config.server.allowed_origin);
    let router = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1/articles", article_routes())
        .merge(article_routes())
        .layer(axum::middleware::from_fn(
            middleware::request_tracing_middleware,
        ))
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
