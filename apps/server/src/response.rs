//! Mapping from [`ArticleSmithError`] to HTTP responses.

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use articlesmith_shared::ArticleSmithError;

/// Seconds a client should wait after a quota failure.
const RETRY_AFTER_SECS: &str = "60";

/// HTTP status for a failed evolution.
pub fn status_for(err: &ArticleSmithError) -> StatusCode {
    match err {
        ArticleSmithError::InvalidRequest { .. } | ArticleSmithError::Validation { .. } => {
            StatusCode::BAD_REQUEST
        }
        ArticleSmithError::NotFound { .. } => StatusCode::NOT_FOUND,
        ArticleSmithError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        ArticleSmithError::GenerationFailure(_)
        | ArticleSmithError::PersistenceFailure(_)
        | ArticleSmithError::Storage(_)
        | ArticleSmithError::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing detail text. Quota failures always carry the retry hint.
fn details(err: &ArticleSmithError) -> String {
    match err {
        ArticleSmithError::QuotaExceeded { retry_hint } => retry_hint.clone(),
        ArticleSmithError::InvalidRequest { message } => message.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn evolve_failure(err: &ArticleSmithError) -> Response {
    let status = status_for(err);
    let mut resp = (
        status,
        Json(json!({
            "error": "Evolution failed",
            "details": details(err),
            "kind": err.kind(),
        })),
    )
        .into_response();
    if status == StatusCode::TOO_MANY_REQUESTS {
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from_static(RETRY_AFTER_SECS));
    }
    resp
}

pub(crate) fn ingest_failure(err: &ArticleSmithError) -> Response {
    match err {
        ArticleSmithError::EmptyListing { .. } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Scraper found no data." })),
        )
            .into_response(),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to ingest articles",
                "details": other.to_string(),
            })),
        )
            .into_response(),
    }
}
