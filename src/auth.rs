use anyhow::anyhow;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use model::entities::user::{self, Role};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::schemas::AppState;

pub const BCRYPT_COST: u32 = 10;

/// Session tokens are valid for a day; the refresh endpoint re-issues them.
const SESSION_TTL_HOURS: i64 = 24;
/// Email verification and password reset links expire after an hour.
const ACTION_TTL_HOURS: i64 = 1;

pub const PURPOSE_VERIFY_EMAIL: &str = "verify-email";
pub const PURPOSE_RESET_PASSWORD: &str = "reset-password";

const MSG_NOT_AUTHORIZED: &str = "You are not authorized to access this resource.";
const MSG_INVALID_TOKEN: &str = "Invalid Token.";

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.to_value(),
            exp: (Utc::now() + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        }
    }

    pub fn role(&self) -> Result<Role, ApiError> {
        Role::try_from_value(&self.role)
            .map_err(|_| ApiError::Unauthorized(MSG_INVALID_TOKEN.to_string()))
    }

    /// Explicit allow-list check, called at the top of protected handlers.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role()?) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Single-purpose claims for email verification and password reset links.
/// The `purpose` field stops a reset token being replayed as a verify token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionClaims {
    pub email: String,
    pub purpose: String,
    pub exp: i64,
}

pub fn sign_token(secret: &str, claims: &Claims) -> Result<String, ApiError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| ApiError::Internal(anyhow!(err)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized(MSG_INVALID_TOKEN.to_string()))
}

pub fn sign_action_token(secret: &str, email: &str, purpose: &str) -> Result<String, ApiError> {
    let claims = ActionClaims {
        email: email.to_string(),
        purpose: purpose.to_string(),
        exp: (Utc::now() + Duration::hours(ACTION_TTL_HOURS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| ApiError::Internal(anyhow!(err)))
}

/// Validates an action token and returns the subject email. Fails when the
/// token is expired, malformed, or minted for a different purpose.
pub fn verify_action_token(secret: &str, token: &str, purpose: &str) -> Result<String, ApiError> {
    let claims = decode::<ActionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized(MSG_INVALID_TOKEN.to_string()))?;

    if claims.purpose != purpose {
        return Err(ApiError::Unauthorized(MSG_INVALID_TOKEN.to_string()));
    }
    Ok(claims.email)
}

/// Hashes a plaintext password for persistence. Every write path that touches
/// a password goes through here, there is no implicit hashing on save.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|err| ApiError::Internal(anyhow!(err)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, hash).map_err(|err| ApiError::Internal(anyhow!(err)))
}

/// Default avatar assigned at signup; can be replaced later via the avatar
/// update endpoint.
pub fn default_avatar_url(username: &str) -> String {
    format!("https://ui-avatars.com/api/?name={username}&background=random")
}

/// Extractor for authenticated routes. Reads the `Authorization: Bearer`
/// header and rejects with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(MSG_NOT_AUTHORIZED.to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized(MSG_NOT_AUTHORIZED.to_string()))?;

        verify_token(&state.config.jwt_secret, token).map(AuthUser)
    }
}
