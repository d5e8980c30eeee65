use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const TOKEN_TTL_SECS: i64 = 60 * 60 * 24 * 7; // 7 days

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn make_jwt(user_id: &str, secret: &str) -> Result<String> {
    make_jwt_expiring(user_id, secret, chrono::Utc::now().timestamp() + TOKEN_TTL_SECS)
}

fn make_jwt_expiring(user_id: &str, secret: &str, exp: i64) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Returns the user id (`sub`) of a valid, unexpired HS256 token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<String> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_subject() {
        let token = make_jwt("user-1", "secret").unwrap();
        assert_eq!(decode_jwt(&token, "secret").unwrap(), "user-1");
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = make_jwt("user-1", "secret").unwrap();
        assert!(decode_jwt(&token, "other").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let an_hour_ago = chrono::Utc::now().timestamp() - 3600;
        let token = make_jwt_expiring("user-1", "secret", an_hour_ago).unwrap();
        assert!(decode_jwt(&token, "secret").is_err());
    }
}
