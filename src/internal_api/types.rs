use serde::{Deserialize, Serialize};

use crate::model::device::Device;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub hostname: String,
}

#[derive(Debug, Serialize)]
pub struct UserDevicesResponse {
    pub user_id: String,
    pub devices: Vec<Device>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: String,
    pub jwt: String,
    pub expires_in: i64,
}
