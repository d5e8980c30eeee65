use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// Runs the configured [`Authenticator`](crate::auth::Authenticator) before any
/// device logic. Rejections never reach method dispatch.
pub async fn require_api_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(user) = state.auth.authenticate(&state.db, req.headers()).await? {
        debug!(user = %user.username, method = %req.method(), "api caller authenticated");
    }
    Ok(next.run(req).await)
}
