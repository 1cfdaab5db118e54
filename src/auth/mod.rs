use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::store::Account;

pub mod password;

/// Fixed issuer claim; tokens carrying any other issuer are rejected even
/// when the signature checks out.
pub const TOKEN_ISSUER: &str = "quill-api";

const BEARER_PREFIX: &str = "Bearer ";

/// Payload carried by every bearer token. Field names match the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "accountId")]
    pub account_id: Uuid,
    pub email: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Authorization header is missing")]
    MissingHeader,
    #[error("Invalid authorization header format")]
    MalformedHeader,
    #[error("Token is missing")]
    MissingToken,
    #[error("token signature is invalid or token is malformed")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("token issuer is not recognized")]
    WrongIssuer,
    #[error("failed to sign token")]
    Signing,
}

/// Issues and verifies bearer tokens. Stateless: tokens are never persisted
/// and cannot be revoked before expiry.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: &str, expiry: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        }
    }

    /// Mint a token for the given account with issued-at/expiry claims.
    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            account_id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|_| TokenError::Signing)
    }

    /// Verify signature, expiry and issuer; on success the embedded payload
    /// is returned unchanged.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
                _ => TokenError::Invalid,
            }),
        }
    }
}

/// Pull the raw token out of an `Authorization` header value. Interior
/// whitespace between the scheme and the token is tolerated and trimmed.
pub fn extract_from_header(header: Option<&str>) -> Result<&str, TokenError> {
    let header = header.ok_or(TokenError::MissingHeader)?;
    let rest = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(TokenError::MalformedHeader)?;

    let token = rest.trim();
    if token.is_empty() {
        return Err(TokenError::MissingToken);
    }

    Ok(token)
}
