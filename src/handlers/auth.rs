use axum::{
    extract::{Extension, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::password;
use crate::database::store::{Account, NewAccount};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_DISPLAY_NAME_LENGTH: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub account: Account,
}

/// POST /auth/register - Create an account and receive a bearer token
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<SessionResponse> {
    let email = payload.email.trim().to_lowercase();
    let display_name = payload.display_name.trim().to_string();
    validate_registration(&email, &display_name, &payload.password)?;

    let password_hash = password::hash_password(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal("Failed to create account")
    })?;

    // DuplicateEmail surfaces as 409 via the StoreError mapping
    let account = state
        .accounts
        .create(NewAccount {
            email,
            display_name,
            password_hash,
        })
        .await?;

    let token = state.tokens.issue(&account)?;
    tracing::info!("registered account {}", account.id);

    Ok(ApiResponse::created(SessionResponse { token, account }))
}

/// POST /auth/login - Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<SessionResponse> {
    let email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password produce the same response, so the
    // endpoint cannot be used to probe which emails are registered.
    let account = state
        .accounts
        .find_by_email(&email)
        .await?
        .filter(|account| password::verify_password(&payload.password, &account.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let token = state.tokens.issue(&account)?;

    Ok(ApiResponse::success(SessionResponse { token, account }))
}

/// GET /auth/whoami - Works with or without a session (optional auth)
pub async fn whoami(user: Option<Extension<CurrentUser>>) -> ApiResult<Value> {
    let body = match user {
        Some(Extension(user)) => json!({
            "authenticated": true,
            "account": {
                "id": user.account_id,
                "email": user.email,
                "displayName": user.display_name,
            }
        }),
        None => json!({ "authenticated": false }),
    };

    Ok(ApiResponse::success(body))
}

fn validate_registration(
    email: &str,
    display_name: &str,
    password: &str,
) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();

    if !is_plausible_email(email) {
        field_errors.insert("email".to_string(), "Invalid email format".to_string());
    }
    if display_name.is_empty() {
        field_errors.insert(
            "displayName".to_string(),
            "Display name is required".to_string(),
        );
    } else if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        field_errors.insert(
            "displayName".to_string(),
            format!("Display name must be at most {} characters", MAX_DISPLAY_NAME_LENGTH),
        );
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        field_errors.insert(
            "password".to_string(),
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_fields("Invalid registration", field_errors))
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
