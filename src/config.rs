use std::env;

pub const DEFAULT_TOKEN_EXPIRY_HOURS: u64 = 24;

/// Runtime configuration, read once at startup and passed into the
/// services that need it. There is no global config lookup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// When unset the server runs on the in-memory store backend.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_expiry_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("QUILL_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3000);

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("JWT_SECRET not set, falling back to development secret");
                "quill-dev-secret".to_string()
            }
        };

        let token_expiry_hours = env::var("JWT_EXPIRY_HOURS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TOKEN_EXPIRY_HOURS);

        Self {
            port,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret,
            token_expiry_hours,
        }
    }
}
