pub mod routes;
pub mod sse;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use http::{header, header::InvalidHeaderValue, HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{export::ArticleExporter, hub::ClientHub, poller::FeedPoller};

#[derive(Clone)]
pub struct AppState {
    pub poller: Arc<FeedPoller>,
    pub hub: Arc<ClientHub>,
    pub exporter: Arc<ArticleExporter>,
}

pub fn router(state: AppState, cors_origin: &str) -> Result<Router, InvalidHeaderValue> {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_str(cors_origin)?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/health", get(routes::health))
        .route("/articles", get(routes::articles))
        .route("/stream", get(sse::stream))
        .route("/clear-cache", post(routes::clear_cache))
        .route("/export", post(routes::export))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
