use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    /// Absent, or not visible to the caller. The two cases are never told apart.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Business-rule rejection; nothing was written.
    #[error("{0}")]
    PreconditionFailed(String),

    #[error(
        "You can only have {max_per_user} {ticket_type}s. You already have {existing}, so you can only purchase {remaining} more."
    )]
    TicketLimitExceeded {
        ticket_type_id: i32,
        ticket_type: String,
        max_per_user: i32,
        existing: u64,
        remaining: u64,
    },

    #[error("Forbidden")]
    Forbidden,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Maps a unique-constraint violation to a precondition failure carrying
    /// `message`; every other database error passes through unchanged.
    pub fn on_unique_violation(err: DbErr, message: &str) -> AppError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::PreconditionFailed(message.to_string())
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code_and_body = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                None,
            ),
            AppError::PreconditionFailed(msg) => (
                actix_web::http::StatusCode::CONFLICT,
                "PRECONDITION_FAILED",
                msg.clone(),
                None,
            ),
            AppError::TicketLimitExceeded {
                ticket_type_id,
                max_per_user,
                existing,
                remaining,
                ..
            } => (
                actix_web::http::StatusCode::CONFLICT,
                "TICKET_LIMIT_EXCEEDED",
                self.to_string(),
                Some(json!({
                    "ticket_type_id": ticket_type_id,
                    "max_per_user": max_per_user,
                    "existing": existing,
                    "remaining": remaining,
                })),
            ),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Forbidden".to_string(),
                    None,
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    "Payment provider unavailable".to_string(),
                    None,
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    "Invalid access token".to_string(),
                    None,
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let (status_code, error_code, message, details) = status_code_and_body;
        let mut error = json!({
            "code": error_code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": error
        }))
    }
}
