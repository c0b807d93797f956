use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use model::entities::prelude::{Content, Course, Lecture};
use model::entities::user::Role;
use model::entities::{content, course, lecture};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{AuthUser, Claims};
use crate::error::{unique_conflict, ApiError};
use crate::schemas::{ApiResponse, AppState};

const MSG_CONTENT_NOT_FOUND: &str = "Content Not Found.";
const MSG_CONTENT_TITLE_TAKEN: &str = "Content With This Title Already Exists.";

/// Request structure for creating a course section
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    pub description: String,
    /// Position of the section within the course
    pub order: i32,
    pub course_id: i32,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub course_id: i32,
}

impl From<content::Model> for ContentResponse {
    fn from(model: content::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            order: model.sort_order,
            course_id: model.course_id,
        }
    }
}

/// Loads a course the caller is allowed to edit.
async fn find_owned_course(
    state: &AppState,
    course_id: i32,
    claims: &Claims,
) -> Result<course::Model, ApiError> {
    let mut select = Course::find_by_id(course_id);
    if claims.role()? != Role::Admin {
        select = select.filter(course::Column::InstructorId.eq(claims.user_id));
    }
    select
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course Not Found.".to_string()))
}

/// Loads a content row after checking the caller owns its course.
async fn find_owned_content(
    state: &AppState,
    content_id: i32,
    claims: &Claims,
) -> Result<content::Model, ApiError> {
    let content_model = Content::find_by_id(content_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_CONTENT_NOT_FOUND.to_string()))?;
    find_owned_course(state, content_model.course_id, claims).await?;
    Ok(content_model)
}

/// Add a section to a course
#[utoipa::path(
    post,
    path = "/api/v1/contents",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Content created", body = ContentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Title already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "contents"
)]
#[instrument(skip(state, claims, request))]
pub async fn create_content(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<CreateContentRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ContentResponse>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let course_model = find_owned_course(&state, request.course_id, &claims).await?;
    debug!(
        "Creating content '{}' in course {}",
        request.title, course_model.id
    );

    let new_content = content::ActiveModel {
        title: Set(request.title),
        description: Set(request.description),
        sort_order: Set(request.order),
        course_id: Set(course_model.id),
        ..Default::default()
    };
    let content_model = new_content
        .insert(&state.db)
        .await
        .map_err(|err| unique_conflict(err, MSG_CONTENT_TITLE_TAKEN))?;

    info!("Successfully created content with ID: {}", content_model.id);
    Ok(ApiResponse::created(
        "Content Created Successfully.",
        ContentResponse::from(content_model),
    ))
}

/// Update a section
#[utoipa::path(
    patch,
    path = "/api/v1/contents/{id}",
    params(("id" = i32, Path, description = "Content ID")),
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Content updated", body = ContentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Content not found"),
        (status = 409, description = "Title already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "contents"
)]
#[instrument(skip(state, claims, request))]
pub async fn update_content(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateContentRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ContentResponse>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let content_model = find_owned_content(&state, id, &claims).await?;

    let mut active: content::ActiveModel = content_model.into();
    if let Some(title) = request.title {
        active.title = Set(title);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
    }
    if let Some(order) = request.order {
        active.sort_order = Set(order);
    }
    let updated = active
        .update(&state.db)
        .await
        .map_err(|err| unique_conflict(err, MSG_CONTENT_TITLE_TAKEN))?;

    info!("Successfully updated content {}", id);
    Ok(ApiResponse::ok(
        "Content Updated Successfully.",
        ContentResponse::from(updated),
    ))
}

/// Delete a section together with its lectures. Progress snapshots taken by
/// already-enrolled students keep their rows for the deleted ids.
#[utoipa::path(
    delete,
    path = "/api/v1/contents/{id}",
    params(("id" = i32, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Content deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Content not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "contents"
)]
#[instrument(skip(state, claims))]
pub async fn delete_content(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let content_model = find_owned_content(&state, id, &claims).await?;

    let txn = state.db.begin().await?;
    Lecture::delete_many()
        .filter(lecture::Column::ContentId.eq(content_model.id))
        .exec(&txn)
        .await?;
    Content::delete_by_id(content_model.id).exec(&txn).await?;
    txn.commit().await?;

    info!("Successfully deleted content {}", id);
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Content Deleted Successfully.",
    ))
}
