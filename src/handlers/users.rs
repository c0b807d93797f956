use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use model::entities::prelude::{User, UserCourse};
use model::entities::{user, user_course};
use sea_orm::{ActiveEnum, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{unique_conflict, ApiError};
use crate::schemas::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateAvatarRequest {
    #[validate(url)]
    pub avatar: String,
}

/// Public account shape. The password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: String,
    pub is_verified: bool,
    /// Ids of the courses on the account's enrolled list
    pub courses: Vec<i32>,
}

impl UserResponse {
    fn from_model(model: user::Model, courses: Vec<i32>) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            avatar: model.avatar,
            role: model.role.to_value(),
            is_verified: model.is_verified,
            courses,
        }
    }
}

async fn enrolled_course_ids(state: &AppState, user_id: i32) -> Result<Vec<i32>, ApiError> {
    let ids = UserCourse::find()
        .filter(user_course::Column::UserId.eq(user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|row| row.course_id)
        .collect();
    Ok(ids)
}

async fn find_user(state: &AppState, user_id: i32) -> Result<user::Model, ApiError> {
    User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found.".to_string()))
}

/// Update the caller's profile fields
#[utoipa::path(
    put,
    path = "/api/v1/users/update",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Username or email already taken"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[instrument(skip(state, claims, request))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    debug!("Updating profile for user {}", claims.user_id);

    let user_model = find_user(&state, claims.user_id).await?;
    let mut active: user::ActiveModel = user_model.into();
    if let Some(username) = request.username {
        active.username = Set(username);
    }
    if let Some(email) = request.email {
        active.email = Set(email);
    }
    let updated = active
        .update(&state.db)
        .await
        .map_err(|err| unique_conflict(err, "User Already Exists."))?;

    let courses = enrolled_course_ids(&state, updated.id).await?;
    info!("Successfully updated user {}", updated.id);
    Ok(ApiResponse::ok(
        "User Updated Successfully.",
        UserResponse::from_model(updated, courses),
    ))
}

/// Replace the caller's avatar URL
#[utoipa::path(
    put,
    path = "/api/v1/users/update-avatar",
    request_body = UpdateAvatarRequest,
    responses(
        (status = 200, description = "Avatar updated", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[instrument(skip(state, claims, request))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateAvatarRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user_model = find_user(&state, claims.user_id).await?;
    let mut active: user::ActiveModel = user_model.into();
    active.avatar = Set(Some(request.avatar));
    let updated = active.update(&state.db).await?;

    let courses = enrolled_course_ids(&state, updated.id).await?;
    Ok(ApiResponse::ok(
        "Avatar Updated Successfully.",
        UserResponse::from_model(updated, courses),
    ))
}

/// Fetch the caller's own profile
#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[instrument(skip(state, claims))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user_model = find_user(&state, claims.user_id).await?;
    let courses = enrolled_course_ids(&state, user_model.id).await?;
    Ok(ApiResponse::ok(
        "User Fetched Successfully.",
        UserResponse::from_model(user_model, courses),
    ))
}

/// Public instructor lookup
#[utoipa::path(
    get,
    path = "/api/v1/users/instructor-profile/{id}",
    params(("id" = i32, Path, description = "Instructor user ID")),
    responses(
        (status = 200, description = "Instructor profile", body = UserResponse),
        (status = 404, description = "Instructor not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "users"
)]
#[instrument(skip(state))]
pub async fn get_instructor_profile(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user_model = find_user(&state, id).await?;
    let courses = enrolled_course_ids(&state, user_model.id).await?;
    Ok(ApiResponse::ok(
        "Instructor Fetched Successfully.",
        UserResponse::from_model(user_model, courses),
    ))
}
