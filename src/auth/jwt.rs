use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};

/// Identity claims embedded in every session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub usertype: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys derived from the shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Claims for a freshly signed-in user
    pub fn claims_for(&self, user: &User) -> Claims {
        let now = Utc::now();
        Claims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            usertype: user.usertype.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    /// Signs a token for the user
    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.encode(&self.claims_for(user))
    }

    /// Verifies signature and expiry, returning the claims of a valid token
    pub fn decode(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => debug!("Rejected expired token"),
                    _ => warn!("Token verification failed: {}", e),
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            role: Role::Professor,
            usertype: "Normal".into(),
            iat: now,
            exp: now + exp_offset_secs,
        }
    }

    #[test]
    fn test_decode_returns_signed_claims() {
        let keys = JwtKeys::new("test-secret", 24);
        let claims = claims(3600);
        let token = keys.encode(&claims).unwrap();
        assert_eq!(keys.decode(&token), Some(claims));
    }

    #[test]
    fn test_decode_rejects_expired_token() {
        let keys = JwtKeys::new("test-secret", 24);
        let token = keys.encode(&claims(-3600)).unwrap();
        assert!(keys.decode(&token).is_none());
    }

    #[test]
    fn test_decode_rejects_foreign_signature() {
        let ours = JwtKeys::new("test-secret", 24);
        let theirs = JwtKeys::new("other-secret", 24);
        let token = theirs.encode(&claims(3600)).unwrap();
        assert!(ours.decode(&token).is_none());
        assert!(ours.decode("not.a.token").is_none());
    }
}
