use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    db::{DBLayer, StoreError},
    error::ApiError,
    model::{device::Device, user::User},
};

/// A validated registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub token: String,
    pub service: u64,
    pub platform: Option<String>,
    pub display: Option<String>,
    pub os_version: Option<String>,
}

impl DeviceRegistration {
    pub fn new(token: impl Into<String>, service: u64) -> Self {
        Self {
            token: token.into(),
            service,
            platform: None,
            display: None,
            os_version: None,
        }
    }

    fn apply_details(&self, device: &mut Device) {
        if let Some(platform) = &self.platform {
            device.platform = Some(platform.clone());
        }
        if let Some(display) = &self.display {
            device.display = Some(display.clone());
        }
        if let Some(os_version) = &self.os_version {
            device.os_version = Some(os_version.clone());
        }
    }
}

/// Owns the lifecycle of [`Device`] records. Devices are never removed, only
/// deactivated.
#[derive(Clone)]
pub struct DeviceRegistry {
    db: Arc<DBLayer>,
}

impl DeviceRegistry {
    pub fn new(db: Arc<DBLayer>) -> Self {
        Self { db }
    }

    pub async fn fetch(&self, token: &str, service: u64) -> Result<Device, ApiError> {
        self.db.load_device(token, service).await?.ok_or_else(|| {
            ApiError::NotFound(format!(
                "No device with token {token} and service {service}"
            ))
        })
    }

    /// Creates the device or reactivates the existing one. A resolvable `uid`
    /// becomes the device's only user; an unknown `uid` is ignored.
    pub async fn register(
        &self,
        reg: DeviceRegistration,
        uid: Option<&str>,
    ) -> Result<Device, ApiError> {
        if self.db.load_service(reg.service).await?.is_none() {
            return Err(ApiError::Validation(format!(
                "Service with id {} does not exist",
                reg.service
            )));
        }

        let owner = self.resolve_owner(uid).await?;

        if let Some(existing) = self.db.load_device(&reg.token, reg.service).await? {
            return self.reactivate(existing, &reg, owner.as_ref()).await;
        }

        let device = Device::new(reg.token.clone(), reg.service);
        self.create_or_reactivate(device, &reg, owner.as_ref()).await
    }

    /// Inserts a new record. If another registration stored the same key in
    /// the meantime, the stored record is reactivated instead.
    async fn create_or_reactivate(
        &self,
        mut device: Device,
        reg: &DeviceRegistration,
        owner: Option<&User>,
    ) -> Result<Device, ApiError> {
        reg.apply_details(&mut device);
        if let Some(user) = owner {
            device.replace_owner(&user.id);
        }

        match self.db.insert_device(&device).await {
            Ok(()) => {
                info!(token = %device.token, service = device.service, "device registered");
                Ok(device)
            }
            Err(StoreError::Conflict { token, service }) => {
                warn!(%token, service, "concurrent registration; retrying as update");
                let existing = self.db.load_device(&token, service).await?.ok_or_else(|| {
                    ApiError::Internal(format!("device {token}/{service} vanished after conflict"))
                })?;
                self.reactivate(existing, reg, owner).await
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn deactivate(&self, token: &str, service: u64) -> Result<Device, ApiError> {
        let mut device = self
            .db
            .load_device(token, service)
            .await?
            .ok_or_else(|| ApiError::device_missing(token, service))?;

        device.deactivate();
        self.db.save_device(&device).await?;
        info!(token, service, "device deactivated");
        Ok(device)
    }

    async fn reactivate(
        &self,
        mut device: Device,
        reg: &DeviceRegistration,
        owner: Option<&User>,
    ) -> Result<Device, ApiError> {
        device.activate();
        reg.apply_details(&mut device);
        if let Some(user) = owner {
            device.replace_owner(&user.id);
        }

        self.db.save_device(&device).await?;
        info!(token = %device.token, service = device.service, "device reactivated");
        Ok(device)
    }

    async fn resolve_owner(&self, uid: Option<&str>) -> Result<Option<User>, ApiError> {
        let Some(uid) = uid.map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let user = self.db.load_user(uid).await?;
        if user.is_none() {
            debug!(uid, "uid does not resolve; skipping user association");
        }
        Ok(user)
    }
}
