pub mod jwt;
pub mod password;

use axum::http::HeaderMap;
use headers::{
    authorization::{Basic, Bearer},
    Authorization, HeaderMapExt,
};
use tracing::warn;

use crate::{config::AuthMode, db::DBLayer, error::ApiError, model::user::User};

const BASIC_CHALLENGE: &str = "Basic realm=\"api\"";
const BEARER_CHALLENGE: &str = "Bearer";

/// Gate in front of the device resource. Which credential it accepts is
/// chosen once at startup through [`AuthMode`].
#[derive(Debug, Clone)]
pub struct Authenticator {
    mode: AuthMode,
    jwt_secret: Option<String>,
}

impl Authenticator {
    pub fn new(mode: AuthMode, jwt_secret: Option<String>) -> Self {
        Self { mode, jwt_secret }
    }

    /// Returns the calling user, or `None` when authentication is disabled.
    pub async fn authenticate(
        &self,
        db: &DBLayer,
        headers: &HeaderMap,
    ) -> Result<Option<User>, ApiError> {
        match self.mode {
            AuthMode::None => Ok(None),
            AuthMode::Basic => self.basic(db, headers, false).await.map(Some),
            AuthMode::BasicStaff => self.basic(db, headers, true).await.map(Some),
            AuthMode::Bearer => self.bearer(db, headers).await.map(Some),
        }
    }

    async fn basic(
        &self,
        db: &DBLayer,
        headers: &HeaderMap,
        require_staff: bool,
    ) -> Result<User, ApiError> {
        let rejected = ApiError::Unauthorized {
            challenge: BASIC_CHALLENGE,
        };

        let Some(Authorization(creds)) = headers.typed_get::<Authorization<Basic>>() else {
            return Err(rejected);
        };

        let Some(user) = db.find_user_by_username(creds.username()).await? else {
            warn!(username = creds.username(), "basic auth for unknown user");
            return Err(rejected);
        };

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(rejected);
        };

        let valid = match password::verify_password(hash, creds.password()) {
            Ok(valid) => valid,
            Err(err) => {
                warn!(username = %user.username, %err, "stored password hash is unreadable");
                false
            }
        };
        if !valid {
            warn!(username = %user.username, "basic auth password mismatch");
            return Err(rejected);
        }

        if require_staff && !user.is_staff {
            warn!(username = %user.username, "basic auth caller is not staff");
            return Err(rejected);
        }

        Ok(user)
    }

    async fn bearer(&self, db: &DBLayer, headers: &HeaderMap) -> Result<User, ApiError> {
        let rejected = ApiError::Unauthorized {
            challenge: BEARER_CHALLENGE,
        };

        let Some(secret) = self.jwt_secret.as_deref() else {
            return Err(ApiError::Internal("bearer auth without JWT_SECRET".into()));
        };

        let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
            return Err(rejected);
        };

        let user_id = jwt::decode_jwt(bearer.token(), secret).map_err(|err| {
            warn!(%err, "invalid bearer token");
            ApiError::Unauthorized {
                challenge: BEARER_CHALLENGE,
            }
        })?;

        db.load_user(&user_id).await?.ok_or(rejected)
    }
}
