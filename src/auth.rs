//! Credential layer: argon2 password hashing and HS256 access tokens.
//!
//! Plaintext passwords exist only between the transfer schema and
//! [`AuthService::hash_password`]; nothing outbound ever carries a hash.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::errors::{ApiError, ServiceError};

/// JWT claim set carried in access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Identity recovered from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins may act on any user's resources, customers only on their own.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_lifetime_secs: u64,
}

impl AuthService {
    pub fn new(jwt_secret: &str, token_lifetime_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_lifetime_secs,
        }
    }

    /// One-way hash applied to inbound plaintext before persistence.
    pub fn hash_password(&self, plaintext: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
    }

    pub fn verify_password(&self, plaintext: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ServiceError::InternalError(format!("stored hash unreadable: {e}")))?;
        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }

    /// Issues a signed token carrying the user id and role.
    pub fn issue_token(&self, user_id: Uuid, role: UserRole) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + self.token_lifetime_secs as i64,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("token encoding failed: {e}")))
    }

    /// Recovers the identity from a token or fails with an auth error.
    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ServiceError::AuthError("Token expired".to_string())
                }
                _ => ServiceError::AuthError("Invalid token".to_string()),
            })?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ServiceError::AuthError("Invalid token subject".to_string()))?;
        Ok(AuthenticatedUser {
            user_id,
            role: data.claims.role,
        })
    }
}

#[async_trait]
impl FromRequestParts<Arc<crate::AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        state
            .services
            .auth
            .verify_token(token)
            .map_err(ApiError::ServiceError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new("test_secret_key_for_testing_purposes_only_32chars", 1800)
    }

    #[test]
    fn hash_verify_roundtrip() {
        let auth = service();
        let hash = auth.hash_password("hunter2hunter2").unwrap();
        assert_ne!(hash, "hunter2hunter2");
        assert!(auth.verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!auth.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn hashing_is_salted() {
        let auth = service();
        let a = auth.hash_password("same-password").unwrap();
        let b = auth.hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_roundtrip_recovers_identity() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let token = auth.issue_token(user_id, UserRole::Admin).unwrap();
        let identity = auth.verify_token(&token).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert!(identity.is_admin());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let auth = service();
        let token = auth.issue_token(Uuid::new_v4(), UserRole::Customer).unwrap();
        let other = AuthService::new("another_secret_key_that_is_also_32_chars!", 1800);
        assert!(matches!(
            other.verify_token(&token),
            Err(ServiceError::AuthError(_))
        ));
    }

    #[test]
    fn customer_cannot_access_other_users() {
        let me = Uuid::new_v4();
        let identity = AuthenticatedUser {
            user_id: me,
            role: UserRole::Customer,
        };
        assert!(identity.can_access(me));
        assert!(!identity.can_access(Uuid::new_v4()));
    }
}
