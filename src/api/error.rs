//! Error to HTTP response mapping.

use crate::errors::Error;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::SqlErr;
use serde_json::json;
use tracing::error;

impl Error {
    /// Status code this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Database(e) if is_unique_violation(e) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Config { .. } | Self::Io(_) | Self::PasswordHash { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn is_unique_violation(e: &sea_orm::DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => json!(errors),
            Self::InvalidCredentials => json!({"success": false, "message": "Invalid credentials"}),
            Self::Database(_) if status == StatusCode::BAD_REQUEST => {
                json!({"detail": "A row with these unique values already exists."})
            }
            _ if status.is_server_error() => {
                error!(error = %self, "Request failed");
                json!({"detail": "Internal server error"})
            }
            _ => json!({"detail": self.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}
