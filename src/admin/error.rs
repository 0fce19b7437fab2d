//! Admin API errors and the shared response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::redundancy::RedundancyError;

/// Body of every operator action response.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ActionResponse {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("operator identity required")]
    MissingOperator,

    #[error("invalid or missing API key")]
    Unauthorized,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    Redundancy(#[from] RedundancyError),
}

impl AdminError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::MissingOperator | AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AdminError::Redundancy(err) => match err {
                RedundancyError::NoSecondary => StatusCode::BAD_REQUEST,
                RedundancyError::Busy | RedundancyError::SyncInProgress => StatusCode::CONFLICT,
                RedundancyError::StoresUnavailable(_)
                | RedundancyError::NoStoreAvailable
                | RedundancyError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ActionResponse::new(false, self.to_string()))).into_response()
    }
}
