//! JWT 令牌服务
//!
//! Tokens are issued elsewhere; this service only validates HS256 access
//! tokens into a [`CurrentUser`]. `generate_token` exists for tests and
//! local tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use shared::AppError;
use thiserror::Error;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_COURIER: &str = "courier";
pub const ROLE_CUSTOMER: &str = "customer";

/// Permission that lets a non-courier account report delivery outcomes
pub const PERMISSION_DELIVERY: &str = "orders:delivery";

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 密钥 (至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
    pub issuer: String,
    pub audience: String,
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID (Subject)
    pub sub: String,
    pub username: String,
    pub role: String,
    /// 权限列表 (逗号分隔)
    #[serde(default)]
    pub permissions: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// Printable random secret for development runs without `JWT_SECRET`
pub fn generate_printable_secret() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 48];
    if rng.fill(&mut bytes).is_err() {
        tracing::error!("System RNG unavailable, using fixed development secret");
        return "shop-server-development-secret-do-not-use-in-production".to_string();
    }
    bytes
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

/// JWT 令牌服务
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish()
    }
}

impl JwtService {
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn generate_token(
        &self,
        user_id: &str,
        username: &str,
        role: &str,
        permissions: &[String],
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            permissions: permissions.join(","),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            })
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

/// 当前用户上下文 (从 JWT Claims 解析)
///
/// Unknown roles are treated as customers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        let permissions = claims
            .permissions
            .split(',')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
            permissions,
        }
    }
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn is_courier(&self) -> bool {
        self.role == ROLE_COURIER
    }

    /// 检查是否拥有指定权限 (`orders:*` 前缀通配)
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        self.permissions.iter().any(|p| {
            p == permission
                || p.strip_suffix(":*")
                    .is_some_and(|prefix| permission.starts_with(&format!("{prefix}:")))
        })
    }

    pub fn ensure_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::admin_required())
        }
    }

    /// Admins and couriers (or holders of the delivery permission)
    pub fn ensure_delivery_staff(&self) -> Result<(), AppError> {
        if self.is_courier() || self.has_permission(PERMISSION_DELIVERY) {
            Ok(())
        } else {
            Err(AppError::permission_denied("Courier or admin role required"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: generate_printable_secret(),
            expiration_minutes: 60,
            issuer: "shop-server".into(),
            audience: "shop-clients".into(),
        })
    }

    fn user(role: &str, permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            id: "u1".into(),
            username: "minh".into(),
            role: role.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_generate_and_validate() {
        let service = service();
        let token = service
            .generate_token("u1", "minh", ROLE_CUSTOMER, &["orders:read".to_string()])
            .unwrap();
        let current: CurrentUser = service.validate_token(&token).unwrap().into();
        assert_eq!(current.id, "u1");
        assert_eq!(current.role, ROLE_CUSTOMER);
        assert_eq!(current.permissions, vec!["orders:read"]);
    }

    #[test]
    fn test_foreign_and_expired_tokens() {
        let token = service().generate_token("u1", "minh", ROLE_ADMIN, &[]).unwrap();
        assert!(matches!(
            service().validate_token(&token),
            Err(JwtError::InvalidSignature)
        ));

        let mut short = service();
        short.config.expiration_minutes = -10;
        let short = JwtService::with_config(short.config);
        let expired = short.generate_token("u1", "minh", ROLE_ADMIN, &[]).unwrap();
        assert!(matches!(short.validate_token(&expired), Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_roles() {
        assert!(user(ROLE_ADMIN, &[]).ensure_admin().is_ok());
        assert!(user(ROLE_COURIER, &[]).ensure_admin().is_err());
        assert!(user(ROLE_COURIER, &[]).ensure_delivery_staff().is_ok());
        assert!(user(ROLE_ADMIN, &[]).ensure_delivery_staff().is_ok());
        assert!(user(ROLE_CUSTOMER, &["orders:*"]).ensure_delivery_staff().is_ok());
        assert!(user(ROLE_CUSTOMER, &[]).ensure_delivery_staff().is_err());
        assert!(user("guest", &[]).ensure_admin().is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
