use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::ai::CompletionError;
use crate::billing::BillingError;
use crate::exercises::ExerciseError;
use crate::store::StoreError;
use crate::tier::{BonusError, LimitReachedResponse, LimitStatus};

/// Error returned by every HTTP handler
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("Usage limit reached")]
    LimitReached(LimitStatus),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Upstream provider error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.into())
    }
}

impl From<BonusError> for ApiError {
    fn from(e: BonusError) -> Self {
        match e {
            BonusError::AlreadyUnlimited => {
                ApiError::BadRequest(BonusError::AlreadyUnlimited.to_string())
            }
            BonusError::Store(e) => e.into(),
        }
    }
}

impl From<CompletionError> for ApiError {
    fn from(e: CompletionError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl From<BillingError> for ApiError {
    fn from(e: BillingError) -> Self {
        let message = e.to_string();
        match e {
            BillingError::NotConfigured(what) => ApiError::NotConfigured(what),
            BillingError::NoSubscription => ApiError::NotFound(message),
            BillingError::InvalidSignature | BillingError::InvalidPayload(_) => {
                ApiError::BadRequest(message)
            }
            BillingError::Store(e) => e.into(),
            BillingError::Http(_) | BillingError::Provider { .. } => ApiError::Upstream(message),
        }
    }
}

impl From<ExerciseError> for ApiError {
    fn from(e: ExerciseError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::LimitReached(status) => {
                return LimitReachedResponse::from_status(&status).into_response()
            }
            ApiError::NotConfigured(what) => {
                tracing::error!("{} is not configured", what);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{} is not configured", what),
                )
            }
            ApiError::Upstream(detail) => {
                tracing::error!("Upstream provider error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream provider error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
