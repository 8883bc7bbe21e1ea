use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::appeals::AppealError;
use crate::services::coupons::CouponError;
use crate::services::moderation::TransitionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not permitted")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_debug = format!("{:?}", self);

        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Not permitted".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PreconditionFailed(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidTransition(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %error_debug, "Request failed");
        }

        let body = Json(json!({
            "error": error_debug,
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotFound => AppError::NotFound("Petition not found".to_string()),
            TransitionError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
            TransitionError::StaleStatus => AppError::PreconditionFailed(e.to_string()),
            TransitionError::Validation(msg) => AppError::Validation(msg),
            TransitionError::Forbidden => AppError::Forbidden,
            TransitionError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<AppealError> for AppError {
    fn from(e: AppealError) -> Self {
        match e {
            AppealError::PetitionNotFound => AppError::NotFound("Petition not found".to_string()),
            AppealError::NotFound => AppError::NotFound("Appeal not found".to_string()),
            AppealError::Forbidden => AppError::Forbidden,
            AppealError::Validation(msg) => AppError::Validation(msg),
            AppealError::PetitionNotAppealable
            | AppealError::OpenAppealExists
            | AppealError::StaleStatus => AppError::PreconditionFailed(e.to_string()),
            AppealError::InvalidStatusChange { .. } => AppError::InvalidTransition(e.to_string()),
            AppealError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<CouponError> for AppError {
    fn from(e: CouponError) -> Self {
        match e {
            CouponError::NotFound => AppError::NotFound("Coupon not found".to_string()),
            CouponError::Inactive | CouponError::Expired | CouponError::Exhausted
            | CouponError::AlreadyUsed | CouponError::Conflict => {
                AppError::PreconditionFailed(e.to_string())
            }
            CouponError::Validation(msg) => AppError::Validation(msg),
            CouponError::Database(e) => AppError::Database(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
