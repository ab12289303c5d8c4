//! Error type returned by HTTP handlers

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::password::PasswordError;
use crate::session::SessionError;
use crate::storage::StoreError;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Error, Debug)]
pub enum AppError {
    /// Username or email already taken
    #[error("{0}")]
    DuplicateKey(String),

    /// Login failed; the message never says which half was wrong
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No valid session
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    /// Rejected input, including mismatched confirmations and bad uploads
    #[error("{0}")]
    Validation(String),

    /// A store, session backend or hashing task failed
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateKey(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::InvalidCredentials => INVALID_CREDENTIALS.to_string(),
            AppError::StoreUnavailable(source) => {
                error!(error = ?source, "Request failed on an unavailable store");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(field) => AppError::DuplicateKey(format!("{} already exists", field)),
            StoreError::NotFound => AppError::NotFound("Not found".to_string()),
            StoreError::Unavailable(source) => AppError::StoreUnavailable(source),
        }
    }
}

/// Unreadable request bodies become 400s with a JSON message
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request: {}", rejection.body_text()))
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::StoreUnavailable(err.into())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::StoreUnavailable(err.into())
    }
}

/// Type alias for handler results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserField;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::DuplicateKey("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::StoreUnavailable(anyhow::anyhow!("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_map_to_http_kinds() {
        let dup: AppError = StoreError::DuplicateKey(UserField::Email).into();
        assert_eq!(dup.to_string(), "Email already exists");
        assert_eq!(dup.status(), StatusCode::BAD_REQUEST);

        let gone: AppError = StoreError::NotFound.into();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);

        let down: AppError = StoreError::Unavailable(anyhow::anyhow!("connection refused")).into();
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unavailable_store_detail_stays_out_of_the_body() {
        let response =
            AppError::StoreUnavailable(anyhow::anyhow!("password authentication failed")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("password authentication failed"));

        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "message": "Internal server error" }));
    }
}
