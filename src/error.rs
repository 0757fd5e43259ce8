use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::engine::EngineError;
use crate::models::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

/// Shown to players whenever a product cannot be drawn.
pub const PRODUCT_UNAVAILABLE_MESSAGE: &str = "This product is temporarily unavailable";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Concurrency error: {0}")]
    ConcurrencyError(String),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => AppError::ValidationError(msg),
            e @ EngineError::Configuration { .. } => AppError::ConfigurationError(e.to_string()),
            e @ EngineError::Concurrency { .. } => AppError::ConcurrencyError(e.to_string()),
        }
    }
}

impl AppError {
    pub fn status_and_code(&self) -> (actix_web::http::StatusCode, &'static str) {
        use actix_web::http::StatusCode;
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::ConfigurationError(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PRODUCT_UNAVAILABLE")
            }
            AppError::ConcurrencyError(_) => (StatusCode::CONFLICT, "CONCURRENCY_CONFLICT"),
            AppError::InsufficientBalance => {
                (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_BALANCE")
            }
            AppError::AuthError(_) | AppError::JwtError(_) => {
                (StatusCode::UNAUTHORIZED, "AUTH_ERROR")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.status_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code) = self.status_and_code();
        let message = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                msg.clone()
            }
            AppError::ConfigurationError(msg) => {
                // players only ever see the generic message
                log::error!("Configuration error: {msg}");
                PRODUCT_UNAVAILABLE_MESSAGE.to_string()
            }
            AppError::ConcurrencyError(msg) => {
                log::warn!("Concurrency error: {msg}");
                "Too many simultaneous plays, please retry".to_string()
            }
            AppError::InsufficientBalance => "Insufficient balance".to_string(),
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                msg.clone()
            }
            AppError::JwtError(err) => {
                log::warn!("Authentication error: {err}");
                "Invalid access token".to_string()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                "Forbidden".to_string()
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(status_code).json(ApiResponse::error(error_code, message))
    }
}
