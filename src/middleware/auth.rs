use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{self, Claims, TokenError};
use crate::database::store::StoreError;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated identity attached to the request after the guard passes.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            account_id: claims.account_id,
            email: claims.email,
            display_name: claims.display_name,
        }
    }
}

/// Everything that can go wrong between a raw request and an authenticated
/// identity. The boundary maps each kind explicitly; nothing sniffs error
/// names at runtime.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("account behind the token no longer exists")]
    AccountNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mandatory guard: extract, verify, confirm the account still exists.
/// Any failure rejects the request before a resource is touched.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Optional guard: same steps, but every failure is swallowed and the
/// request proceeds unauthenticated. Intended behavior for endpoints that
/// serve both anonymous and signed-in callers, not error hiding.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(user) = authenticate(&state, request.headers()).await {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AuthError> {
    let header_value = match headers.get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| TokenError::MalformedHeader)?),
        None => None,
    };

    let token = auth::extract_from_header(header_value)?;
    let claims = state.tokens.verify(token)?;

    // A valid token is not enough: the account must still exist
    state
        .accounts
        .find_by_id(claims.account_id)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    Ok(CurrentUser::from(claims))
}
