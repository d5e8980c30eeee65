use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod auth;
mod config;
mod db;
mod error;
mod internal_api;
mod model;
mod registry;
mod state;

use auth::Authenticator;
use config::AppConfig;
use db::DBLayer;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // -----------------------------
    // Shared state / Dependencies
    // -----------------------------
    let db = Arc::new(DBLayer::new(&config.db_path)?);
    let auth = Authenticator::new(config.auth_mode, config.jwt_secret.clone());
    let admin_enabled = config.admin.is_some();
    let state = AppState::new(db, auth, config.admin, config.jwt_secret);

    let app = build_app(state);

    info!(
        addr = %config.addr,
        db_path = %config.db_path,
        auth_mode = ?config.auth_mode,
        admin_enabled,
        "device registry listening"
    );

    let listener = TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Device resource (authenticated)
        .merge(api::router(state.clone()))
        // Operator API (admin basic auth)
        .merge(internal_api::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::build_app;
    use crate::{auth::Authenticator, config::AuthMode, db::DBLayer, state::AppState};

    #[tokio::test]
    async fn health_is_public() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DBLayer::new(dir.path().to_str().unwrap()).unwrap());
        let state = AppState::new(db, Authenticator::new(AuthMode::Basic, None), None, None);
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .oneshot(Request::get("/api/device/abc/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
