use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use model::entities::prelude::{Content, Course, Lecture};
use model::entities::user::Role;
use model::entities::{content, course, lecture};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{AuthUser, Claims};
use crate::error::{unique_conflict, ApiError};
use crate::schemas::{ApiResponse, AppState};

const MSG_LECTURE_NOT_FOUND: &str = "Lecture Not Found.";
const MSG_LECTURE_TITLE_TAKEN: &str = "Lecture With This Title Already Exists.";

/// Request structure for creating a lecture inside a section
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLectureRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    pub description: String,
    /// Position of the lecture within its section
    pub order: i32,
    #[validate(url)]
    pub video_url: String,
    /// Display duration, e.g. "12:30"
    pub duration: String,
    /// Whether the lecture is viewable without enrolling
    pub is_preview: Option<bool>,
    pub content_id: i32,
    /// Attachment URLs
    pub resources: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLectureRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
    #[validate(url)]
    pub video_url: Option<String>,
    pub duration: Option<String>,
    pub is_preview: Option<bool>,
    pub resources: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LectureResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub video_url: String,
    pub duration: String,
    pub is_preview: bool,
    pub content_id: i32,
    pub resources: Vec<String>,
}

impl From<lecture::Model> for LectureResponse {
    fn from(model: lecture::Model) -> Self {
        let resources = model
            .resources
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            order: model.sort_order,
            video_url: model.video_url,
            duration: model.duration,
            is_preview: model.is_preview,
            content_id: model.content_id,
            resources,
        }
    }
}

fn encode_resources(resources: &[String]) -> Result<String, ApiError> {
    serde_json::to_string(resources).map_err(|err| ApiError::Internal(err.into()))
}

/// Loads a lecture after checking the caller owns the course it belongs to.
async fn find_owned_lecture(
    state: &AppState,
    lecture_id: i32,
    claims: &Claims,
) -> Result<lecture::Model, ApiError> {
    let lecture_model = Lecture::find_by_id(lecture_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_LECTURE_NOT_FOUND.to_string()))?;
    find_owned_content(state, lecture_model.content_id, claims).await?;
    Ok(lecture_model)
}

async fn find_owned_content(
    state: &AppState,
    content_id: i32,
    claims: &Claims,
) -> Result<content::Model, ApiError> {
    let content_model = Content::find_by_id(content_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Content Not Found.".to_string()))?;

    let mut select = Course::find_by_id(content_model.course_id);
    if claims.role()? != Role::Admin {
        select = select.filter(course::Column::InstructorId.eq(claims.user_id));
    }
    select
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course Not Found.".to_string()))?;
    Ok(content_model)
}

/// Add a lecture to a section
#[utoipa::path(
    post,
    path = "/api/v1/lectures",
    request_body = CreateLectureRequest,
    responses(
        (status = 201, description = "Lecture created", body = LectureResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Content not found"),
        (status = 409, description = "Title already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "lectures"
)]
#[instrument(skip(state, claims, request))]
pub async fn create_lecture(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<CreateLectureRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<LectureResponse>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let content_model = find_owned_content(&state, request.content_id, &claims).await?;
    debug!(
        "Creating lecture '{}' in content {}",
        request.title, content_model.id
    );

    let resources = match &request.resources {
        Some(resources) => Some(encode_resources(resources)?),
        None => None,
    };
    let new_lecture = lecture::ActiveModel {
        title: Set(request.title),
        description: Set(request.description),
        sort_order: Set(request.order),
        video_url: Set(request.video_url),
        duration: Set(request.duration),
        is_preview: Set(request.is_preview.unwrap_or(false)),
        content_id: Set(content_model.id),
        resources: Set(resources),
        ..Default::default()
    };
    let lecture_model = new_lecture
        .insert(&state.db)
        .await
        .map_err(|err| unique_conflict(err, MSG_LECTURE_TITLE_TAKEN))?;

    info!("Successfully created lecture with ID: {}", lecture_model.id);
    Ok(ApiResponse::created(
        "Lecture Created Successfully.",
        LectureResponse::from(lecture_model),
    ))
}

/// Update a lecture
#[utoipa::path(
    patch,
    path = "/api/v1/lectures/{id}",
    params(("id" = i32, Path, description = "Lecture ID")),
    request_body = UpdateLectureRequest,
    responses(
        (status = 200, description = "Lecture updated", body = LectureResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Lecture not found"),
        (status = 409, description = "Title already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "lectures"
)]
#[instrument(skip(state, claims, request))]
pub async fn update_lecture(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateLectureRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<LectureResponse>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let lecture_model = find_owned_lecture(&state, id, &claims).await?;

    let mut active: lecture::ActiveModel = lecture_model.into();
    if let Some(title) = request.title {
        active.title = Set(title);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
    }
    if let Some(order) = request.order {
        active.sort_order = Set(order);
    }
    if let Some(video_url) = request.video_url {
        active.video_url = Set(video_url);
    }
    if let Some(duration) = request.duration {
        active.duration = Set(duration);
    }
    if let Some(is_preview) = request.is_preview {
        active.is_preview = Set(is_preview);
    }
    if let Some(resources) = request.resources {
        active.resources = Set(Some(encode_resources(&resources)?));
    }
    let updated = active
        .update(&state.db)
        .await
        .map_err(|err| unique_conflict(err, MSG_LECTURE_TITLE_TAKEN))?;

    info!("Successfully updated lecture {}", id);
    Ok(ApiResponse::ok(
        "Lecture Updated Successfully.",
        LectureResponse::from(updated),
    ))
}

/// Delete a lecture. Progress snapshot rows referencing it are left as-is.
#[utoipa::path(
    delete,
    path = "/api/v1/lectures/{id}",
    params(("id" = i32, Path, description = "Lecture ID")),
    responses(
        (status = 200, description = "Lecture deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Lecture not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "lectures"
)]
#[instrument(skip(state, claims))]
pub async fn delete_lecture(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let lecture_model = find_owned_lecture(&state, id, &claims).await?;

    Lecture::delete_by_id(lecture_model.id).exec(&state.db).await?;
    info!("Successfully deleted lecture {}", id);
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Lecture Deleted Successfully.",
    ))
}
