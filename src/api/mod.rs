use axum::{middleware, routing::any, Router};

use crate::state::AppState;

pub mod auth;
pub mod handlers;
pub mod types;

use handlers::{device_collection, device_item};

/// Device resource router (gated by the configured authenticator).
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // POST, or GET/DELETE with ?token=&service=
        .route("/api/device", any(device_collection))
        .route("/api/device/", any(device_collection))
        .route("/api/device/{token}/{service}", any(device_item))
        .route("/api/device/{token}/{service}/", any(device_item))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_auth))
}
