//! Errors returned by the HTTP surface.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials. Carries the `WWW-Authenticate` challenge.
    #[error("unauthorized")]
    Unauthorized { challenge: &'static str },

    /// Method outside the resource's supported set.
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        method: String,
        allowed: &'static [&'static str],
    },

    /// Supported method without a handler.
    #[error("method {0} not implemented")]
    NotImplemented(String),

    #[error("{0}")]
    NotFound(String),

    /// Deactivate of a device that was never registered.
    #[error("{0}")]
    BadRequest(String),

    /// Malformed or incomplete input.
    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn device_missing(token: &str, service: u64) -> Self {
        Self::BadRequest(format!(
            "Device with token {token} and service {service} does not exist"
        ))
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(name) => {
                Self::Validation(format!("username {name} is already taken"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

// Extractor rejections are reported through the same `{error}` body as the
// handlers' own validation failures.
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            Self::Unauthorized { challenge } => {
                let mut res = (status, Json(json!({ "error": "unauthorized" }))).into_response();
                res.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
                res
            }
            Self::MethodNotAllowed { method, allowed } => {
                let mut res = (
                    status,
                    Json(json!({
                        "error": format!("method {method} not allowed"),
                        "allowed": allowed,
                    })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                    res.headers_mut().insert(header::ALLOW, value);
                }
                res
            }
            Self::Internal(detail) => {
                // details stay in the log
                error!(%detail, "request failed");
                (status, Json(json!({ "error": "internal server error" }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::Unauthorized { challenge: "Basic" }.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotImplemented("PUT".into()).status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::device_missing("abc", 1).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn device_missing_message_names_key() {
        assert_eq!(
            ApiError::device_missing("abc", 1).to_string(),
            "Device with token abc and service 1 does not exist"
        );
    }

    #[test]
    fn method_not_allowed_sets_allow_header() {
        let res = ApiError::MethodNotAllowed {
            method: "PATCH".into(),
            allowed: &["GET", "POST"],
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[header::ALLOW], "GET, POST");
    }

    #[test]
    fn unauthorized_sets_challenge() {
        let res = ApiError::Unauthorized {
            challenge: "Bearer",
        }
        .into_response();
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn store_conflict_is_internal() {
        let err: ApiError = StoreError::Conflict {
            token: "abc".into(),
            service: 1,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
