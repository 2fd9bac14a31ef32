use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::accounts::{
    jwt::TokenError, password::PasswordError, repo::StoreError, validation::ValidationErrors,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("username already taken")]
    DuplicateUsername,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token has expired")]
    ExpiredToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing bearer token")]
    MissingToken,
    #[error("user not found")]
    UserNotFound,
    #[error("bad request body: {0}")]
    BadRequest(String),
    #[error("corrupt stored credential: {0}")]
    CorruptCredential(String),
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ValidationErrors>,
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            StoreError::DuplicateUsername => AppError::DuplicateUsername,
            // The row vanished between lookup and write.
            StoreError::NotFound(_) => AppError::UserNotFound,
            other => AppError::Store(other),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Corrupt(msg) => AppError::CorruptCredential(msg),
            PasswordError::Hash(msg) => AppError::Internal(msg),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::ExpiredToken,
            TokenError::Invalid => AppError::InvalidToken,
            TokenError::Signing => AppError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateEmail
            | AppError::DuplicateUsername
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::ExpiredToken
            | AppError::InvalidToken
            | AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::CorruptCredential(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation failed",
            AppError::DuplicateEmail => "Email already registered",
            AppError::DuplicateUsername => "Username already taken",
            AppError::InvalidCredentials => "Invalid email or password",
            AppError::ExpiredToken => "Token has expired",
            AppError::InvalidToken => "Invalid token",
            AppError::MissingToken => "Missing or malformed Authorization header",
            AppError::UserNotFound => "User not found",
            AppError::BadRequest(_) => "Invalid request body",
            AppError::CorruptCredential(_) | AppError::Store(_) | AppError::Internal(_) => {
                "Internal server error"
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else if let AppError::BadRequest(detail) = &self {
            warn!(%detail, "rejected request body");
        }

        let body = ErrorBody {
            error: self.message(),
            details: match self {
                AppError::Validation(details) => Some(details),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicateUsername.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::CorruptCredential("bad".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_duplicates_map_to_domain_errors() {
        assert!(matches!(
            AppError::from(StoreError::DuplicateEmail),
            AppError::DuplicateEmail
        ));
        assert!(matches!(
            AppError::from(StoreError::DuplicateUsername),
            AppError::DuplicateUsername
        ));
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let resp = AppError::CorruptCredential("phc parse: missing $".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
    }
}
