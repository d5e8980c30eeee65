use std::sync::Arc;

use crate::{
    auth::Authenticator, db::DBLayer, internal_api::auth::AdminCredentials,
    registry::DeviceRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DBLayer>,
    pub registry: DeviceRegistry,
    pub auth: Arc<Authenticator>,
    pub admin: Option<Arc<AdminCredentials>>,
    pub jwt_secret: Option<String>,
}

impl AppState {
    pub fn new(
        db: Arc<DBLayer>,
        auth: Authenticator,
        admin: Option<AdminCredentials>,
        jwt_secret: Option<String>,
    ) -> Self {
        Self {
            registry: DeviceRegistry::new(db.clone()),
            db,
            auth: Arc::new(auth),
            admin: admin.map(Arc::new),
            jwt_secret,
        }
    }
}
