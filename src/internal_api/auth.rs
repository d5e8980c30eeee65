use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{error, warn};

use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

pub async fn require_internal_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(config) = state.admin.as_deref() else {
        error!("internal admin credentials are missing; internal routes disabled");
        return Ok(internal_error_response());
    };

    let Some(header) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(unauthorized_response());
    };

    let Ok(header_str) = header.to_str() else {
        return Ok(unauthorized_response());
    };

    let Some(encoded) = header_str.strip_prefix("Basic ") else {
        return Ok(unauthorized_response());
    };

    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return Ok(unauthorized_response());
    };

    let Ok(decoded_str) = String::from_utf8(decoded) else {
        return Ok(unauthorized_response());
    };

    let (username, password) = decoded_str.split_once(':').unwrap_or((decoded_str.as_str(), ""));

    if username != config.username || password != config.password {
        warn!(username, "rejected internal admin credentials");
        return Ok(unauthorized_response());
    }

    Ok(next.run(req).await)
}

fn unauthorized_response() -> Response {
    let mut res = Response::new(Body::from("unauthorized"));
    *res.status_mut() = StatusCode::UNAUTHORIZED;
    res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"Internal\""),
    );
    res
}

fn internal_error_response() -> Response {
    let mut res = Response::new(Body::from("internal auth not configured"));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}
