use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::PlanError;
use crate::schedule::Rejection;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Internal server error")]
    InternalServerError,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, rejection) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Plan(PlanError::UnknownPlan(id)) => {
                (StatusCode::NOT_FOUND, format!("no plan with id {}", id), None)
            }
            AppError::Plan(e @ PlanError::LastPlan) => (StatusCode::CONFLICT, e.to_string(), None),
            AppError::Plan(e @ PlanError::EmptyName) => (StatusCode::BAD_REQUEST, e.to_string(), None),
            AppError::Rejected(rejection) => {
                let status = match rejection {
                    Rejection::AlreadyPlanned { .. } | Rejection::SlotConflict { .. } => StatusCode::CONFLICT,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, format!("Cannot add this course: {}", rejection), Some(rejection))
            }
            AppError::Catalog(msg) => {
                error!("catalog error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg, None)
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
            rejection,
        });

        (status, body).into_response()
    }
}
