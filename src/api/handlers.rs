use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::Method,
    Json,
};

use crate::{
    api::types::{parse_service_id, DeviceQuery, RegisterPayload},
    error::ApiError,
    model::device::Device,
    registry::DeviceRegistration,
    state::AppState,
};

/// Methods the device resource declares. Anything else is rejected before a
/// handler is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl DeviceMethod {
    pub const ALLOWED: &'static [&'static str] = &["GET", "POST", "PUT", "DELETE"];

    pub fn from_http(method: &Method) -> Result<Self, ApiError> {
        match *method {
            Method::GET => Ok(Self::Get),
            Method::POST => Ok(Self::Post),
            Method::PUT => Ok(Self::Put),
            Method::DELETE => Ok(Self::Delete),
            _ => Err(ApiError::MethodNotAllowed {
                method: method.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

pub async fn device_collection(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<DeviceQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<Device>, ApiError> {
    let Query(query) = query?;
    dispatch(&state, &method, None, query, &body).await
}

pub async fn device_item(
    State(state): State<AppState>,
    method: Method,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<Device>, ApiError> {
    let Path((token, service)) = path?;
    let Query(query) = query?;
    dispatch(&state, &method, Some((token, service)), query, &body).await
}

async fn dispatch(
    state: &AppState,
    method: &Method,
    path_key: Option<(String, String)>,
    query: DeviceQuery,
    body: &[u8],
) -> Result<Json<Device>, ApiError> {
    match DeviceMethod::from_http(method)? {
        DeviceMethod::Get => {
            let (token, service) = device_key(path_key, &query)?;
            state.registry.fetch(&token, service).await.map(Json)
        }
        DeviceMethod::Post => {
            let reg = DeviceRegistration::try_from(parse_payload(body)?)?;
            state
                .registry
                .register(reg, query.uid.as_deref())
                .await
                .map(Json)
        }
        DeviceMethod::Put => Err(ApiError::NotImplemented(method.to_string())),
        DeviceMethod::Delete => {
            let (token, service) = device_key(path_key, &query)?;
            state.registry.deactivate(&token, service).await.map(Json)
        }
    }
}

/// Path segments win over `?token=&service=`.
fn device_key(
    path_key: Option<(String, String)>,
    query: &DeviceQuery,
) -> Result<(String, u64), ApiError> {
    let (token, service) = match path_key {
        Some(key) => key,
        None => match (query.token.as_deref(), query.service.as_deref()) {
            (Some(token), Some(service)) if !token.is_empty() && !service.is_empty() => {
                (token.to_string(), service.to_string())
            }
            _ => return Err(ApiError::Validation("token and service are required".into())),
        },
    };
    Ok((token, parse_service_id(&service)?))
}

fn parse_payload(body: &[u8]) -> Result<RegisterPayload, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::Validation("request body must be a JSON object".into()));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("invalid JSON payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::{device_key, parse_payload, DeviceMethod};
    use crate::{api::types::DeviceQuery, error::ApiError};
    use axum::http::Method;

    #[test]
    fn dispatch_table() {
        assert_eq!(DeviceMethod::from_http(&Method::GET).unwrap(), DeviceMethod::Get);
        assert_eq!(DeviceMethod::from_http(&Method::PUT).unwrap(), DeviceMethod::Put);
        assert!(matches!(
            DeviceMethod::from_http(&Method::PATCH),
            Err(ApiError::MethodNotAllowed { allowed, .. }) if allowed == DeviceMethod::ALLOWED
        ));
    }

    #[test]
    fn path_key_takes_precedence() {
        let query = DeviceQuery {
            token: Some("q".into()),
            service: Some("9".into()),
            uid: None,
        };
        let key = device_key(Some(("p".into(), "1".into())), &query).unwrap();
        assert_eq!(key, ("p".to_string(), 1));
        assert_eq!(device_key(None, &query).unwrap(), ("q".to_string(), 9));
    }

    #[test]
    fn missing_key_is_validation_error() {
        let err = device_key(None, &DeviceQuery::default()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = device_key(Some(("abc".into(), "x".into())), &DeviceQuery::default());
        assert!(matches!(err, Err(ApiError::Validation(_))));
    }

    #[test]
    fn empty_or_broken_body_is_rejected() {
        assert!(parse_payload(b"").is_err());
        assert!(parse_payload(b"  \n").is_err());
        assert!(parse_payload(b"{token").is_err());
        assert!(parse_payload(br#"{"token":"abc","service":1}"#).is_ok());
    }
}
