//! Authentication service
//!
//! Password login, token issuance and session revocation for staff users.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuthSession, AuthTokensResponse, User};

use super::jwt::{generate_access_token, generate_refresh_token, verify_token, JwtError, TokenType};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Session not found or revoked")]
    SessionNotFound,

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, branch, active, created_at, updated_at";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db_pool: PgPool,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
}

impl AuthService {
    pub fn new(
        db_pool: PgPool,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            db_pool,
            jwt_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_days,
        }
    }

    /// Check credentials and open a session
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthTokensResponse, AuthError> {
        let user: User = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1) AND active = TRUE",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        if !bcrypt::verify(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let (tokens, jti, refresh_hash) = self.issue_tokens(user)?;
        let session_expires_at = Utc::now() + Duration::days(self.refresh_token_ttl_days);

        sqlx::query(
            r#"
            INSERT INTO auth_sessions (id, user_id, jti, refresh_token_hash, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tokens.user.id)
        .bind(&jti)
        .bind(&refresh_hash)
        .bind(&ip_address)
        .bind(&user_agent)
        .bind(session_expires_at)
        .execute(&self.db_pool)
        .await?;

        tracing::info!(user_id = %tokens.user.id, role = %tokens.user.role, "User logged in");

        Ok(tokens)
    }

    /// Rotate tokens using a valid refresh token
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthTokensResponse, AuthError> {
        let claims = verify_token(refresh_token, &self.jwt_secret)?;
        if claims.token_type != TokenType::Refresh.as_str() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let session: AuthSession = sqlx::query_as(
            r#"
            SELECT id, user_id, jti, refresh_token_hash, ip_address, user_agent, expires_at, revoked, revoked_at, created_at, updated_at
            FROM auth_sessions
            WHERE refresh_token_hash = $1 AND revoked = FALSE AND expires_at > NOW()
            "#,
        )
        .bind(hash_token(refresh_token))
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(AuthError::SessionNotFound)?;

        let user = self.get_user_by_id(session.user_id).await?;
        if !user.active {
            return Err(AuthError::SessionNotFound);
        }

        let (tokens, jti, refresh_hash) = self.issue_tokens(user)?;
        let session_expires_at = Utc::now() + Duration::days(self.refresh_token_ttl_days);

        sqlx::query(
            r#"
            UPDATE auth_sessions
            SET jti = $1, refresh_token_hash = $2, expires_at = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(&jti)
        .bind(&refresh_hash)
        .bind(session_expires_at)
        .bind(session.id)
        .execute(&self.db_pool)
        .await?;

        Ok(tokens)
    }

    /// Revoke a session (logout)
    pub async fn revoke_session(&self, jti: &str) -> Result<(), AuthError> {
        let rows_affected = sqlx::query(
            "UPDATE auth_sessions SET revoked = TRUE, revoked_at = NOW() WHERE jti = $1 AND revoked = FALSE",
        )
        .bind(jti)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AuthError::SessionNotFound);
        }

        Ok(())
    }

    /// Revoke all sessions for a user
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let rows_affected = sqlx::query(
            "UPDATE auth_sessions SET revoked = TRUE, revoked_at = NOW() WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, AuthError> {
        sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Verify a session is valid (not revoked, not expired, user still active)
    pub async fn verify_session(&self, jti: &str) -> Result<(), AuthError> {
        let valid: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT u.active
            FROM auth_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.jti = $1 AND s.revoked = FALSE AND s.expires_at > NOW()
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.db_pool)
        .await?;

        match valid {
            Some(true) => Ok(()),
            _ => Err(AuthError::SessionNotFound),
        }
    }

    /// Get JWT secret (for middleware access)
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    fn issue_tokens(&self, user: User) -> Result<(AuthTokensResponse, String, String), AuthError> {
        let jti = Uuid::new_v4().to_string();
        let access_token =
            generate_access_token(&user, &jti, &self.jwt_secret, self.access_token_ttl_seconds)?;

        let refresh_jti = Uuid::new_v4().to_string();
        let refresh_token = generate_refresh_token(
            &user,
            &refresh_jti,
            &self.jwt_secret,
            self.refresh_token_ttl_days,
        )?;
        let refresh_hash = hash_token(&refresh_token);

        let tokens = AuthTokensResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            user: user.into(),
        };

        Ok((tokens, jti, refresh_hash))
    }
}

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Refresh tokens are stored hashed
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = hash_token("refresh-token");
        let b = hash_token("refresh-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_token("other-token"));
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = bcrypt::hash("correct horse", 4).unwrap();
        assert!(bcrypt::verify("correct horse", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }
}
