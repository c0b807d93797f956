use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use model::entities::prelude::User;
use model::entities::user::{self, Role};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{self, AuthUser, Claims, PURPOSE_RESET_PASSWORD, PURPOSE_VERIFY_EMAIL};
use crate::error::{unique_conflict, ApiError};
use crate::schemas::{ApiResponse, AppState};

/// Request structure for registering a new account
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct SignupRequest {
    /// Display name, unique per account
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    /// Login email, unique per account
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new account. New accounts always start with the `user` role and
/// an unverified email; a verification link is mailed out before the row is
/// written.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Invalid request data"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[instrument(skip(state, request))]
pub async fn signup(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<SignupRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    debug!("Signing up user with email: {}", request.email);

    let existing = User::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        warn!("Signup rejected, email already registered");
        return Err(ApiError::Conflict("User Already Exists.".to_string()));
    }

    let token = auth::sign_action_token(&state.config.jwt_secret, &request.email, PURPOSE_VERIFY_EMAIL)?;
    let link = format!(
        "{}/api/v1/auth/verify-email/{}",
        state.config.frontend_origin, token
    );
    state.mailer.send_verification_link(&request.email, &link)?;

    let password_hash = auth::hash_password(&request.password)?;
    let new_user = user::ActiveModel {
        username: Set(request.username.clone()),
        email: Set(request.email.clone()),
        password_hash: Set(password_hash),
        avatar: Set(Some(auth::default_avatar_url(&request.username))),
        role: Set(Role::User),
        is_verified: Set(false),
        ..Default::default()
    };
    let user_model = new_user
        .insert(&state.db)
        .await
        .map_err(|err| unique_conflict(err, "User Already Exists."))?;

    info!("Successfully signed up user with ID: {}", user_model.id);
    Ok(ApiResponse::message(
        StatusCode::CREATED,
        "User Signup Successfully.",
    ))
}

/// Exchange credentials for a session token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<LoginRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    debug!("Login attempt for email: {}", request.email);

    let user_model = User::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid Credentials.".to_string()))?;

    if !auth::verify_password(&request.password, &user_model.password_hash)? {
        warn!("Login rejected for user {}", user_model.id);
        return Err(ApiError::Unauthorized("Invalid Credentials.".to_string()));
    }

    let token = auth::sign_token(&state.config.jwt_secret, &Claims::for_user(&user_model))?;
    info!("User {} logged in", user_model.id);
    Ok(ApiResponse::ok(
        "User Login Successfully.",
        TokenResponse { token },
    ))
}

/// Sends a password reset link by email. The single-use token is also stored
/// on the user row so a later reset invalidates earlier links.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent"),
        (status = 404, description = "No account for that email"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[instrument(skip(state, request))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<ForgotPasswordRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let user_model = User::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found.".to_string()))?;

    let token =
        auth::sign_action_token(&state.config.jwt_secret, &user_model.email, PURPOSE_RESET_PASSWORD)?;
    let link = format!("{}/resetpassword/{}", state.config.frontend_origin, token);
    state.mailer.send_password_reset_link(&user_model.email, &link)?;

    let mut active: user::ActiveModel = user_model.into();
    active.reset_password_token = Set(Some(token));
    active.update(&state.db).await?;

    Ok(ApiResponse::message(
        StatusCode::OK,
        "Password Reset Email Sent Successfully.",
    ))
}

/// Sets a new password from a reset token. The token must be the most
/// recently issued one for the account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/resetpassword",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 401, description = "Invalid or expired token"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[instrument(skip(state, request))]
pub async fn reset_password(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<ResetPasswordRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let email =
        auth::verify_action_token(&state.config.jwt_secret, &request.token, PURPOSE_RESET_PASSWORD)?;

    let user_model = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found.".to_string()))?;

    if user_model.reset_password_token.as_deref() != Some(request.token.as_str()) {
        warn!("Stale reset token for user {}", user_model.id);
        return Err(ApiError::Unauthorized("Invalid Token.".to_string()));
    }

    let password_hash = auth::hash_password(&request.new_password)?;
    let mut active: user::ActiveModel = user_model.into();
    active.password_hash = Set(password_hash);
    active.reset_password_token = Set(None);
    let updated = active.update(&state.db).await?;

    info!("Password reset for user {}", updated.id);
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Password Reset Successfully.",
    ))
}

/// Re-issues a session token for the authenticated caller.
#[utoipa::path(
    get,
    path = "/api/v1/auth/refresh-token",
    responses(
        (status = 200, description = "Fresh token issued", body = TokenResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[instrument(skip(state, claims))]
pub async fn refresh_token(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    // Claims are rebuilt from the user row so role changes take effect here.
    let user_model = User::find_by_id(claims.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found.".to_string()))?;

    let token = auth::sign_token(&state.config.jwt_secret, &Claims::for_user(&user_model))?;
    Ok(ApiResponse::ok(
        "Refresh Token Successfully.",
        TokenResponse { token },
    ))
}

/// Marks the account behind the token as verified.
#[utoipa::path(
    get,
    path = "/api/v1/auth/verify-email/{token}",
    params(("token" = String, Path, description = "Verification token from the signup email")),
    responses(
        (status = 200, description = "Email verified"),
        (status = 401, description = "Invalid or expired token"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already verified"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[instrument(skip(state, token))]
pub async fn verify_email(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let email = auth::verify_action_token(&state.config.jwt_secret, &token, PURPOSE_VERIFY_EMAIL)?;

    let user_model = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found.".to_string()))?;

    if user_model.is_verified {
        return Err(ApiError::Conflict("User Already Verified.".to_string()));
    }

    let user_id = user_model.id;
    let mut active: user::ActiveModel = user_model.into();
    active.is_verified = Set(true);
    active.update(&state.db).await?;

    info!("User {} verified their email", user_id);
    Ok(ApiResponse::message(
        StatusCode::OK,
        "User Verified Successfully.",
    ))
}
