use serde::{Deserialize, Serialize};

/// A registered push endpoint. At most one record exists per `(token, service)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub token: String,
    pub service: u64, // FK → NotificationService.id
    pub is_active: bool,
    #[serde(default)]
    pub users: Vec<String>, // FK → User.id
    pub created_ts: i64,
    #[serde(default)]
    pub deactivated_ts: Option<i64>,
    #[serde(default)]
    pub last_notified_ts: Option<i64>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
}

impl Device {
    pub fn new(token: impl Into<String>, service: u64) -> Self {
        Self {
            token: token.into(),
            service,
            is_active: true,
            users: Vec::new(),
            created_ts: chrono::Utc::now().timestamp(),
            deactivated_ts: None,
            last_notified_ts: None,
            platform: None,
            display: None,
            os_version: None,
        }
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.deactivated_ts = None;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.deactivated_ts = Some(chrono::Utc::now().timestamp());
    }

    /// Makes `user_id` the sole owner of this device.
    pub fn replace_owner(&mut self, user_id: &str) {
        self.users.clear();
        self.users.push(user_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::Device;

    #[test]
    fn new_device_is_active_and_unowned() {
        let device = Device::new("abc", 1);
        assert!(device.is_active);
        assert!(device.users.is_empty());
        assert!(device.deactivated_ts.is_none());
    }

    #[test]
    fn deactivate_then_activate_clears_timestamp() {
        let mut device = Device::new("abc", 1);
        device.deactivate();
        assert!(!device.is_active);
        assert!(device.deactivated_ts.is_some());

        device.activate();
        assert!(device.is_active);
        assert!(device.deactivated_ts.is_none());
    }

    #[test]
    fn replace_owner_drops_previous_users() {
        let mut device = Device::new("abc", 1);
        device.users = vec!["u1".into(), "u2".into()];
        device.replace_owner("u3");
        assert_eq!(device.users, vec!["u3".to_string()]);
    }

    #[test]
    fn serializes_expected_fields() {
        let device = Device::new("abc", 7);
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["token"], "abc");
        assert_eq!(value["service"], 7);
        assert_eq!(value["is_active"], true);
        assert_eq!(value["users"], serde_json::json!([]));
        assert!(value["last_notified_ts"].is_null());
    }
}
