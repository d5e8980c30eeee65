use axum::extract::{rejection::JsonRejection, Json, Path, State};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{jwt, password::hash_password},
    error::ApiError,
    internal_api::types::{
        CreateServiceRequest, CreateUserRequest, TokenResponse, UserDevicesResponse,
    },
    model::{
        notification_service::NotificationService,
        user::{User, UserSummary},
    },
    state::AppState,
};

pub async fn create_user(
    State(state): State<AppState>,
    req: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<UserSummary>, ApiError> {
    let Json(req) = req?;
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }

    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            Some(hash_password(password).map_err(|e| ApiError::Internal(e.to_string()))?)
        }
        None => None,
    };

    let user = User {
        id: Uuid::new_v4().to_string(),
        username,
        password_hash,
        is_staff: req.is_staff,
        created_ts: chrono::Utc::now().timestamp(),
    };

    state.db.create_user(&user).await?;
    info!(user_id = %user.id, username = %user.username, is_staff = user.is_staff, "user created");

    Ok(Json(UserSummary::from(&user)))
}

pub async fn list_user_devices(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserDevicesResponse>, ApiError> {
    let mut devices = state.db.list_devices_for_user(&user_id).await?;
    devices.sort_by(|a, b| (a.service, &a.token).cmp(&(b.service, &b.token)));

    Ok(Json(UserDevicesResponse { user_id, devices }))
}

pub async fn issue_token(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(secret) = state.jwt_secret.as_deref() else {
        return Err(ApiError::Validation("JWT_SECRET is not configured".into()));
    };

    if state.db.load_user(&user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("No user with id {user_id}")));
    }

    let token = jwt::make_jwt(&user_id, secret).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse {
        user_id,
        jwt: token,
        expires_in: jwt::TOKEN_TTL_SECS,
    }))
}

pub async fn create_service(
    State(state): State<AppState>,
    req: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> Result<Json<NotificationService>, ApiError> {
    let Json(req) = req?;
    let name = req.name.trim();
    let hostname = req.hostname.trim();
    if name.is_empty() || hostname.is_empty() {
        return Err(ApiError::Validation("name and hostname are required".into()));
    }

    let service = state.db.create_service(name, hostname).await?;
    info!(service_id = service.id, name = %service.name, "notification service created");

    Ok(Json(service))
}

pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationService>>, ApiError> {
    Ok(Json(state.db.list_services().await?))
}
