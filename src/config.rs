use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

use crate::internal_api::auth::AdminCredentials;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DB_PATH: &str = "devicedb";

/// Credential scheme required on the device resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    None,
    Basic,
    BasicStaff,
    Bearer,
}

impl FromStr for AuthMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "basic_staff" | "basicisstaff" => Ok(Self::BasicStaff),
            "bearer" | "jwt" => Ok(Self::Bearer),
            other => Err(anyhow!(
                "unknown AUTH_MODE {other:?} (expected none, basic, basic_staff or bearer)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: String,
    pub db_path: String,
    pub auth_mode: AuthMode,
    pub jwt_secret: Option<String>,
    pub admin: Option<AdminCredentials>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth_mode = match non_empty("AUTH_MODE") {
            Some(raw) => raw.parse()?,
            None => AuthMode::Basic,
        };

        let jwt_secret = non_empty("JWT_SECRET");
        if auth_mode == AuthMode::Bearer && jwt_secret.is_none() {
            bail!("AUTH_MODE=bearer requires JWT_SECRET");
        }

        let admin = match (
            non_empty("INTERNAL_ADMIN_USER"),
            non_empty("INTERNAL_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            _ => None,
        };

        Ok(Self {
            addr: non_empty("PUSHREG_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            db_path: non_empty("PUSHREG_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            auth_mode,
            jwt_secret,
            admin,
        })
    }
}
