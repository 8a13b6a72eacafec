//! Authentication extractor
//!
//! Verifies the bearer token, checks the session has not been revoked and
//! yields an [`AuthenticatedUser`]: the per-request session object handed to
//! every service call.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{verify_token, AuthError, AuthService, JwtError, TokenType};
use crate::models::UserRole;
use crate::workflow::{Actor, Permission, Policy, WorkflowError};

/// Authenticated staff session
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub jti: String,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }

    /// Fail unless the session's role holds `permission`
    pub fn require(&self, permission: Permission) -> Result<(), WorkflowError> {
        Policy::require(self.role, permission)
    }
}

#[derive(Debug, Serialize)]
struct AuthRejection {
    error: AuthRejectionDetails,
}

#[derive(Debug, Serialize)]
struct AuthRejectionDetails {
    code: &'static str,
    message: &'static str,
}

fn reject(code: &'static str, message: &'static str) -> Response {
    reject_with(StatusCode::UNAUTHORIZED, code, message)
}

fn reject_with(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(AuthRejection {
            error: AuthRejectionDetails { code, message },
        }),
    )
        .into_response()
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    reject(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = verify_token(bearer.token(), auth_service.jwt_secret()).map_err(|e| match e {
            JwtError::TokenExpired => reject("TOKEN_EXPIRED", "Token has expired"),
            _ => reject("INVALID_TOKEN", "Invalid token"),
        })?;

        if claims.token_type != TokenType::Access.as_str() {
            return Err(reject("INVALID_TOKEN_TYPE", "Expected access token"));
        }

        let user_id = claims
            .user_id()
            .map_err(|_| reject("INVALID_TOKEN", "Invalid user ID in token"))?;

        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|_| reject("INVALID_TOKEN", "Invalid role in token"))?;

        auth_service
            .verify_session(&claims.jti)
            .await
            .map_err(|e| match e {
                AuthError::Database(err) => {
                    tracing::error!(error = %err, "Session lookup failed");
                    reject_with(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "SESSION_CHECK_FAILED",
                        "Unable to verify session, please retry",
                    )
                }
                other => {
                    tracing::debug!(error = %other, "Session rejected");
                    reject("SESSION_REVOKED", "Session has been revoked")
                }
            })?;

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
            role,
            jti: claims.jti,
        })
    }
}
