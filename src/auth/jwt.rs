//! JWT token management
//!
//! Validates admin tokens and issues tokens for operators

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::Result;

/// JWT claims carried by management tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Subject (operator identifier)
    pub sub: String,
    /// Role name, compared against the configured admin roles
    pub role: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// JWT token manager
pub struct JwtManager {
    /// Encoding key
    encoding_key: EncodingKey,
    /// Decoding key
    decoding_key: DecodingKey,
    /// Validation configuration
    validation: Validation,
    /// Roles accepted as admin
    admin_roles: Vec<String>,
}

impl JwtManager {
    /// Create new JWT manager
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 30; // 30 seconds tolerance

        Self {
            encoding_key,
            decoding_key,
            validation,
            admin_roles: config.admin_roles.clone(),
        }
    }

    /// Issue a token for `subject` with `role`, valid for `ttl`
    pub fn generate_token(&self, subject: &str, role: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| crate::error!(Internal, "Token generation failed", e))
    }

    /// Validate signature and expiry
    pub fn validate_token(&self, token: &str) -> Result<AdminClaims> {
        let token_data: TokenData<AdminClaims> =
            decode(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        crate::error!(Auth, "认证令牌已过期")
                    }
                    _ => crate::error!(Auth, "Token validation failed", e),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Whether the claims carry an admin role
    #[must_use]
    pub fn is_admin(&self, claims: &AdminClaims) -> bool {
        self.admin_roles.iter().any(|role| role == &claims.role)
    }

    /// Validate the token and require an admin role
    pub fn authorize_admin(&self, token: &str) -> Result<AdminClaims> {
        let claims = self.validate_token(token)?;
        if !self.is_admin(&claims) {
            crate::bail!(Permission, "角色 {} 无权访问管理接口", claims.role);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn manager() -> JwtManager {
        JwtManager::new(&AuthConfig {
            jwt_secret: "unit-test-secret".to_string(),
            admin_roles: vec!["admin".to_string(), "super_admin".to_string()],
        })
    }

    #[test]
    fn test_admin_token_round_trip() {
        let manager = manager();
        let token = manager
            .generate_token("ops", "super_admin", Duration::hours(1))
            .unwrap();
        let claims = manager.authorize_admin(&token).unwrap();
        assert_eq!(claims.sub, "ops");
        assert_eq!(claims.role, "super_admin");
    }

    #[test]
    fn test_reader_role_is_forbidden() {
        let manager = manager();
        let token = manager
            .generate_token("reader", "reader", Duration::hours(1))
            .unwrap();
        assert!(matches!(
            manager.authorize_admin(&token),
            Err(AppError::Permission { .. })
        ));
    }

    #[test]
    fn test_wrong_secret_and_expired_are_unauthorized() {
        let other = JwtManager::new(&AuthConfig {
            jwt_secret: "another-secret".to_string(),
            admin_roles: vec!["admin".to_string()],
        });
        let token = other.generate_token("ops", "admin", Duration::hours(1)).unwrap();
        assert!(matches!(
            manager().authorize_admin(&token),
            Err(AppError::Auth { .. })
        ));

        let expired = manager()
            .generate_token("ops", "admin", Duration::hours(-2))
            .unwrap();
        assert!(matches!(
            manager().authorize_admin(&expired),
            Err(AppError::Auth { .. })
        ));
    }
}
