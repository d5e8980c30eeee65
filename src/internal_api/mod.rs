use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod handlers;
pub mod types;

use handlers::{create_service, create_user, issue_token, list_services, list_user_devices};

/// Operator routes (HTTP Basic with the configured admin credentials).
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/internal/users", post(create_user))
        .route("/internal/users/{user_id}/devices", get(list_user_devices))
        .route("/internal/users/{user_id}/token", post(issue_token))
        .route("/internal/services", get(list_services).post(create_service))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_internal_auth,
        ))
}
