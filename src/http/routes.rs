use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::http::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = match state.poller.ping_store().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Article store ping failed: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "healthy",
        "store": store,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "clients": state.hub.len(),
        "buffer": state.poller.buffer_status(),
    }))
}

/// Current buffer. 503 until the first fill completes, 206 while it holds
/// fewer articles than required.
pub async fn articles(State(state): State<AppState>) -> Response {
    let required = state.poller.capacity();

    if !state.poller.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "articles": [],
                "status": "initializing",
                "message": "Service is collecting initial articles. Please try again shortly.",
                "required": required,
                "current": state.poller.buffer_len(),
            })),
        )
            .into_response();
    }

    let initial = state.poller.initial_articles();
    let current = initial.articles.len();

    if current < required {
        return (
            StatusCode::PARTIAL_CONTENT,
            Json(json!({
                "articles": initial.articles,
                "status": "partial",
                "message": format!("Service has only {current} of {required} required articles"),
                "required": required,
                "current": current,
            })),
        )
            .into_response();
    }

    Json(initial).into_response()
}

pub async fn clear_cache(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.poller.clear().await?;
    info!("Article cache and buffer cleared");

    Ok(Json(json!({
        "status": "success",
        "message": "Cache cleared successfully",
    })))
}

pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let articles = state.poller.snapshot();
    let path = state.exporter.save(&articles).await?;

    Ok(Json(json!({
        "path": path,
        "total_articles": articles.len(),
    })))
}
