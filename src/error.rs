use std::error::Error;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{export::ExportError, store::StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Error encountered accessing the article cache")]
    Store(#[from] StoreError),

    #[error("Error encountered exporting articles")]
    Export(#[from] ExportError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("{}: {:?}", self, self.source());

        let status = match self {
            ApiError::Store(StoreError::ConnectionFailed(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(json!({"message": self.to_string()}));

        (status, payload).into_response()
    }
}
