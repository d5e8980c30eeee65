use serde::{Deserialize, Serialize};

/// Push provider configuration a device token belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationService {
    pub id: u64,
    pub name: String,
    pub hostname: String,
    pub created_ts: i64,
}
