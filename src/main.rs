use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let state = AppState::from_config(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to initialize store: {}", e));

    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("quill-api listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/health", get(health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        // Usable with or without a session
        .merge(optional_auth_routes(state.clone()))
        // Protected
        .merge(note_routes(state.clone()))
        .with_state(state)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn optional_auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/whoami", get(handlers::auth::whoami))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth::optional_auth,
        ))
}

fn note_routes(state: AppState) -> Router<AppState> {
    use handlers::notes;

    Router::new()
        .route("/notes", get(notes::list).post(notes::create))
        .route(
            "/notes/:id",
            get(notes::get_one)
                .put(notes::update)
                .patch(notes::update)
                .delete(notes::remove),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}
