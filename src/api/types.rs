use serde::Deserialize;
use serde_json::Value;

use crate::{error::ApiError, registry::DeviceRegistration};

/// Body of a device registration. Everything is optional here so that missing
/// fields surface as a JSON `{error}` instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub service: Option<Value>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
}

impl TryFrom<RegisterPayload> for DeviceRegistration {
    type Error = ApiError;

    fn try_from(payload: RegisterPayload) -> Result<Self, Self::Error> {
        // tokens are opaque: stored byte for byte, only absence is rejected
        let token = payload
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Validation("token is required".into()))?;

        let service = match payload.service {
            None | Some(Value::Null) => {
                return Err(ApiError::Validation("service is required".into()))
            }
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(ApiError::Validation("service is required".into()))
            }
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        }
        .ok_or_else(|| ApiError::Validation("service must be an integer id".into()))?;

        let mut reg = DeviceRegistration::new(token, service);
        reg.platform = payload.platform;
        reg.display = payload.display;
        reg.os_version = payload.os_version;
        Ok(reg)
    }
}

/// Query string accepted on every device route.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceQuery {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

pub fn parse_service_id(raw: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ApiError::Validation(format!("service {raw:?} is not an integer id")))
}
