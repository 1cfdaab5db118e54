// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::TokenError;
use crate::database::store::StoreError;
use crate::middleware::auth::AuthError;

/// Message used for every token verification failure. The internal error
/// kinds stay distinct (expired, bad signature, wrong issuer); the boundary
/// deliberately exposes a single message so callers cannot probe which
/// check failed.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// HTTP API error with appropriate status codes and client-safe messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found - also covers "exists but belongs to someone else",
    // so record ids cannot be enumerated across accounts
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::Internal(msg) => msg,
        }
    }

    /// Convert to the `{error, message}` JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": self.error_code(),
            "message": self.message(),
        });

        if let ApiError::ValidationError {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            body["fieldErrors"] = json!(field_errors);
        }

        body
    }
}

// Static constructors
impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn validation_fields(
        message: impl Into<String>,
        field_errors: HashMap<String, String>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            // Credential extraction failures keep their exact messages
            TokenError::MissingHeader | TokenError::MalformedHeader | TokenError::MissingToken => {
                ApiError::unauthorized(err.to_string())
            }
            // Verification failures collapse into one generic message
            TokenError::Invalid | TokenError::Expired | TokenError::WrongIssuer => {
                ApiError::unauthorized(INVALID_TOKEN_MESSAGE)
            }
            TokenError::Signing => {
                tracing::error!("token signing failed");
                ApiError::internal("Failed to issue token")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(e) => e.into(),
            // The account behind a valid token no longer exists; to the
            // caller this is indistinguishable from a bad token.
            AuthError::AccountNotFound => ApiError::unauthorized(INVALID_TOKEN_MESSAGE),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::conflict("Email is already registered"),
            StoreError::Sqlx(e) => {
                // Log the real error but return a generic message
                tracing::error!("store error: {}", e);
                ApiError::internal("An error occurred while processing your request")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_errors_keep_their_messages() {
        let err: ApiError = TokenError::MissingHeader.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Authorization header is missing");

        let err: ApiError = TokenError::MalformedHeader.into();
        assert_eq!(err.message(), "Invalid authorization header format");

        let err: ApiError = TokenError::MissingToken.into();
        assert_eq!(err.message(), "Token is missing");
    }

    #[test]
    fn verification_errors_share_one_generic_message() {
        for err in [TokenError::Invalid, TokenError::Expired, TokenError::WrongIssuer] {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(api.message(), INVALID_TOKEN_MESSAGE);
        }
    }

    #[test]
    fn missing_account_is_a_generic_unauthorized() {
        let api: ApiError = AuthError::AccountNotFound.into();
        assert_eq!(api.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(api.message(), INVALID_TOKEN_MESSAGE);
    }

    #[test]
    fn duplicate_email_maps_to_conflict() {
        let api: ApiError = StoreError::DuplicateEmail.into();
        assert_eq!(api.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn error_body_has_error_and_message() {
        let body = ApiError::not_found("Note not found").to_json();
        assert_eq!(body["error"], "NOT_FOUND");
        assert_eq!(body["message"], "Note not found");
    }
}
