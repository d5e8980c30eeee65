use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::{device::Device, notification_service::NotificationService, user::User};

use std::str;

const SERVICE_SEQ_KEY: &str = "service_seq";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("device with token {token} and service {service} already exists")]
    Conflict { token: String, service: u64 },

    #[error("username {0} is already taken")]
    UsernameTaken(String),

    #[error("corrupt record at {0}")]
    Corrupt(String),

    #[error(transparent)]
    Rocks(#[from] rocksdb::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub struct DBLayer {
    db: DB,
    // serializes read-modify-write sections; plain reads go straight to rocksdb
    write_lock: Mutex<()>,
}

impl DBLayer {
    pub fn new(path: &str) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    // ============================================================
    // KEYS
    // ============================================================
    fn device_key(token: &str, service: u64) -> String {
        format!("device:{:020}:{token}", service)
        // 020 → zero-padded service id keeps devices of one service contiguous
    }

    fn user_device_prefix(user_id: &str) -> String {
        format!("user_device:{user_id}:")
    }

    fn user_device_key(user_id: &str, device_key: &str) -> String {
        format!("{}{}", Self::user_device_prefix(user_id), device_key)
    }

    fn user_key(id: &str) -> String {
        format!("user:{id}")
    }

    fn username_key(username: &str) -> String {
        format!("username:{username}")
    }

    fn service_key(id: u64) -> String {
        format!("service:{:020}", id)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        Ok(self
            .db
            .get(key)?
            .map(|v| serde_json::from_slice(&v))
            .transpose()?)
    }

    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let mut out = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = str::from_utf8(&key).map_err(|_| StoreError::Corrupt(prefix.to_string()))?;
            if !k.starts_with(prefix) {
                break;
            }
            out.push((k.to_string(), val.to_vec()));
        }
        Ok(out)
    }

    // ============================================================
    // DEVICE STORAGE
    // ============================================================
    pub async fn load_device(&self, token: &str, service: u64) -> StoreResult<Option<Device>> {
        self.get_json(&Self::device_key(token, service))
    }

    /// Stores a brand new device. Fails with [`StoreError::Conflict`] if a
    /// record for the same `(token, service)` already exists.
    pub async fn insert_device(&self, device: &Device) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let key = Self::device_key(&device.token, device.service);
        if self.db.get(&key)?.is_some() {
            return Err(StoreError::Conflict {
                token: device.token.clone(),
                service: device.service,
            });
        }
        self.write_device(&key, device)
    }

    /// Overwrites a device record. The user association index is rewritten in
    /// the same batch, so replacing `device.users` is a single atomic write.
    pub async fn save_device(&self, device: &Device) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let key = Self::device_key(&device.token, device.service);
        self.write_device(&key, device)
    }

    fn write_device(&self, key: &str, device: &Device) -> StoreResult<()> {
        let previous: Option<Device> = self.get_json(key)?;

        let mut batch = WriteBatch::default();
        if let Some(previous) = previous {
            for stale in previous.users.iter().filter(|u| !device.users.contains(u)) {
                batch.delete(Self::user_device_key(stale, key));
            }
        }
        for user_id in &device.users {
            batch.put(Self::user_device_key(user_id, key), key.as_bytes());
        }
        batch.put(key, serde_json::to_vec(device)?);

        self.db.write(batch)?;
        Ok(())
    }

    pub async fn list_devices_for_user(&self, user_id: &str) -> StoreResult<Vec<Device>> {
        let prefix = Self::user_device_prefix(user_id);
        let mut out = Vec::new();

        for (index_key, device_key) in self.scan_prefix(&prefix)? {
            let device_key =
                String::from_utf8(device_key).map_err(|_| StoreError::Corrupt(index_key.clone()))?;
            if let Some(device) = self.get_json::<Device>(&device_key)? {
                if device.users.iter().any(|u| u == user_id) {
                    out.push(device);
                }
            }
        }
        Ok(out)
    }

    // ============================================================
    // USER STORAGE
    // ============================================================
    pub async fn create_user(&self, user: &User) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let name_key = Self::username_key(&user.username);
        if self.db.get(&name_key)?.is_some() {
            return Err(StoreError::UsernameTaken(user.username.clone()));
        }

        let mut batch = WriteBatch::default();
        batch.put(Self::user_key(&user.id), serde_json::to_vec(user)?);
        batch.put(name_key, user.id.as_bytes());
        self.db.write(batch)?;
        Ok(())
    }

    pub async fn load_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.get_json(&Self::user_key(id))
    }

    pub async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let Some(id) = self.db.get(Self::username_key(username))? else {
            return Ok(None);
        };
        let id = String::from_utf8(id).map_err(|_| StoreError::Corrupt(username.to_string()))?;
        self.get_json(&Self::user_key(&id))
    }

    // ============================================================
    // NOTIFICATION SERVICE STORAGE
    // ============================================================
    pub async fn create_service(
        &self,
        name: &str,
        hostname: &str,
    ) -> StoreResult<NotificationService> {
        let _guard = self.write_lock.lock().await;

        let last = match self.db.get(SERVICE_SEQ_KEY)? {
            Some(raw) => str::from_utf8(&raw)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| StoreError::Corrupt(SERVICE_SEQ_KEY.to_string()))?,
            None => 0,
        };

        let service = NotificationService {
            id: last + 1,
            name: name.to_string(),
            hostname: hostname.to_string(),
            created_ts: chrono::Utc::now().timestamp(),
        };

        let mut batch = WriteBatch::default();
        batch.put(SERVICE_SEQ_KEY, service.id.to_string().as_bytes());
        batch.put(Self::service_key(service.id), serde_json::to_vec(&service)?);
        self.db.write(batch)?;
        Ok(service)
    }

    pub async fn load_service(&self, id: u64) -> StoreResult<Option<NotificationService>> {
        self.get_json(&Self::service_key(id))
    }

    pub async fn list_services(&self) -> StoreResult<Vec<NotificationService>> {
        self.scan_prefix("service:")?
            .into_iter()
            .map(|(_, val)| serde_json::from_slice(&val).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DBLayer, StoreError};
    use crate::model::{device::Device, user::User};
    use tempfile::TempDir;

    fn open() -> (TempDir, DBLayer) {
        let dir = TempDir::new().unwrap();
        let db = DBLayer::new(dir.path().to_str().unwrap()).unwrap();
        (dir, db)
    }

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.into(),
            username: username.into(),
            password_hash: None,
            is_staff: false,
            created_ts: 0,
        }
    }

    #[tokio::test]
    async fn insert_device_rejects_duplicate_key() {
        let (_dir, db) = open();
        db.insert_device(&Device::new("abc", 1)).await.unwrap();

        let err = db.insert_device(&Device::new("abc", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { service: 1, .. }));

        // same token under another service is a different device
        db.insert_device(&Device::new("abc", 2)).await.unwrap();
    }

    #[tokio::test]
    async fn save_device_moves_user_index() {
        let (_dir, db) = open();
        let mut device = Device::new("abc", 1);
        device.users = vec!["u1".into()];
        db.insert_device(&device).await.unwrap();
        assert_eq!(db.list_devices_for_user("u1").await.unwrap().len(), 1);

        device.replace_owner("u2");
        db.save_device(&device).await.unwrap();

        assert!(db.list_devices_for_user("u1").await.unwrap().is_empty());
        let owned = db.list_devices_for_user("u2").await.unwrap();
        assert_eq!(owned, vec![device]);
    }

    #[tokio::test]
    async fn user_prefix_does_not_leak_into_similar_ids() {
        let (_dir, db) = open();
        let mut device = Device::new("abc", 1);
        device.users = vec!["u10".into()];
        db.insert_device(&device).await.unwrap();

        assert!(db.list_devices_for_user("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let (_dir, db) = open();
        db.create_user(&user("1", "alice")).await.unwrap();

        let err = db.create_user(&user("2", "alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken(name) if name == "alice"));

        let found = db.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, "1");
        assert!(db.find_user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn service_ids_are_sequential() {
        let (_dir, db) = open();
        let a = db.create_service("sandbox", "gateway.sandbox.push.apple.com").await.unwrap();
        let b = db.create_service("production", "gateway.push.apple.com").await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let listed = db.list_services().await.unwrap();
        assert_eq!(listed, vec![a.clone(), b]);
        assert_eq!(db.load_service(1).await.unwrap(), Some(a));
        assert!(db.load_service(3).await.unwrap().is_none());
    }
}
