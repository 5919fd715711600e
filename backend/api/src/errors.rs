//! Application-wide error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use escrow_engine::EngineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Business outcomes map to client-facing statuses; storage failures stay
/// a generic 500 so internals never leak into a response body.
fn classify(err: &EngineError) -> (StatusCode, &'static str) {
    match err {
        EngineError::InsufficientFunds { .. } => (StatusCode::PAYMENT_REQUIRED, "insufficient_funds"),
        EngineError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        EngineError::NotAuthorized => (StatusCode::FORBIDDEN, "not_authorized"),
        EngineError::ContractClosed { .. } => (StatusCode::CONFLICT, "contract_closed"),
        EngineError::BudgetExceeded { .. } => (StatusCode::BAD_REQUEST, "budget_exceeded"),
        EngineError::ConcurrencyConflict => (StatusCode::CONFLICT, "concurrency_conflict"),
        EngineError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
        EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        EngineError::Database(_) | EngineError::Migrate(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Engine(e) => classify(e),
            ApiError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
        };
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error, kind })).into_response()
    }
}
