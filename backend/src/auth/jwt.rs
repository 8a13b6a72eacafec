//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Role as its snake_case name
    pub role: String,
    /// JWT ID (for revocation)
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    /// "access" or "refresh"
    pub token_type: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Generate an access token for a user
pub fn generate_access_token(
    user: &User,
    jti: &str,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    generate_token(user, jti, secret, ttl_seconds, TokenType::Access)
}

/// Generate a refresh token for a user
pub fn generate_refresh_token(
    user: &User,
    jti: &str,
    secret: &str,
    ttl_days: i64,
) -> Result<String, JwtError> {
    generate_token(user, jti, secret, ttl_days * 24 * 60 * 60, TokenType::Refresh)
}

fn generate_token(
    user: &User,
    jti: &str,
    secret: &str,
    ttl_seconds: i64,
    token_type: TokenType,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        jti: jti.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: token_type.as_str().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::DecodingFailed(e.to_string()),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn create_test_user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "officer@example.com".to_string(),
            name: "Test Officer".to_string(),
            password_hash: String::new(),
            role,
            branch: Some("Central".to_string()),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_access_token() {
        let user = create_test_user(UserRole::LoanOfficer);
        let jti = Uuid::new_v4().to_string();
        let secret = "test-secret-key";

        let token = generate_access_token(&user, &jti, secret, 900).unwrap();
        let claims = verify_token(&token, secret).unwrap();

        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.role, "loan_officer");
        assert_eq!(claims.jti, jti);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_generate_refresh_token() {
        let user = create_test_user(UserRole::ApproverAdmin);
        let jti = Uuid::new_v4().to_string();

        let token = generate_refresh_token(&user, &jti, "test-secret-key", 7).unwrap();
        let claims = verify_token(&token, "test-secret-key").unwrap();
        assert_eq!(claims.token_type, "refresh");
    }

    #[test]
    fn test_expired_token() {
        let user = create_test_user(UserRole::SuperAdmin);
        let token = generate_access_token(&user, "jti", "secret", -3600).unwrap();

        let err = verify_token(&token, "secret").unwrap_err();
        assert!(matches!(err, JwtError::TokenExpired));
    }

    #[test]
    fn test_wrong_secret() {
        let user = create_test_user(UserRole::LoanOfficer);
        let token = generate_access_token(&user, "jti", "secret1", 900).unwrap();
        assert!(verify_token(&token, "secret2").is_err());
        assert!(verify_token("invalid.token.here", "secret1").is_err());
    }
}
