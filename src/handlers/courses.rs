use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use common::{ContentOutline, CourseOutline, PageParams, ProgressState};
use model::entities::prelude::{
    Content, Course, CourseStudent, Lecture, Progress, User, UserCourse,
};
use model::entities::user::Role;
use model::entities::{
    content, course, course_student, lecture, notification, progress, progress_content,
    progress_lecture, user_course,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{unique_conflict, ApiError};
use crate::schemas::{ApiResponse, AppState, CachedData};

const MSG_COURSE_NOT_FOUND: &str = "Course Not Found.";
const MSG_TITLE_TAKEN: &str = "Course With This Title Already Exists.";

fn course_cache_key(course_id: i32) -> String {
    format!("course-{course_id}")
}

/// Request structure for creating a new course
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    /// Course title, unique across the catalog
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    pub description: String,
    /// Price in the platform currency; zero makes the course free
    pub price: Decimal,
    pub estimated_price: Option<Decimal>,
    /// Total duration in hours
    pub duration: i32,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[validate(length(min = 3, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub estimated_price: Option<Decimal>,
    pub duration: Option<i32>,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

/// Filter body for the catalog listing
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseListRequest {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive title substring match
    pub search: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    /// Filter by instructor user id
    pub instructor: Option<i32>,
    /// Exact price match
    pub price: Option<Decimal>,
    /// Matches courses carrying any of the tags
    pub tags: Option<Vec<String>>,
    /// One of: title, price, ratings, duration, totalSales (default id)
    pub sort: Option<String>,
    /// "asc" or "desc" (default desc)
    pub order: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub estimated_price: Option<Decimal>,
    pub duration: i32,
    pub thumbnail: Option<String>,
    pub instructor_id: i32,
    pub category: Option<String>,
    pub language: String,
    pub tags: Vec<String>,
    pub ratings: Decimal,
    pub is_published: bool,
    pub is_free: bool,
    pub total_sales: i32,
}

impl From<course::Model> for CourseResponse {
    fn from(model: course::Model) -> Self {
        let tags = model
            .tags
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            price: model.price,
            estimated_price: model.estimated_price,
            duration: model.duration,
            thumbnail: model.thumbnail,
            instructor_id: model.instructor_id,
            category: model.category,
            language: model.language,
            tags,
            ratings: model.ratings,
            is_published: model.is_published,
            is_free: model.is_free,
            total_sales: model.total_sales,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseListResponse {
    pub courses: Vec<CourseResponse>,
    pub total_courses: u64,
    pub total_pages: u64,
}

fn encode_tags(tags: &[String]) -> Result<String, ApiError> {
    serde_json::to_string(tags).map_err(|err| ApiError::Internal(err.into()))
}

/// Create a new course owned by the calling instructor
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 409, description = "Title already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "courses"
)]
#[instrument(skip(state, claims, request))]
pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<CreateCourseRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<CourseResponse>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    debug!("Creating course titled '{}'", request.title);

    let tags = match &request.tags {
        Some(tags) => Some(encode_tags(tags)?),
        None => None,
    };
    let is_free = request.price.is_zero();
    let new_course = course::ActiveModel {
        title: Set(request.title.clone()),
        description: Set(request.description),
        price: Set(request.price),
        estimated_price: Set(request.estimated_price),
        duration: Set(request.duration),
        thumbnail: Set(request.thumbnail),
        instructor_id: Set(claims.user_id),
        category: Set(request.category),
        language: Set(request.language.unwrap_or_else(|| "English".to_string())),
        tags: Set(tags),
        ratings: Set(Decimal::ZERO),
        is_published: Set(request.is_published.unwrap_or(false)),
        is_free: Set(is_free),
        total_sales: Set(0),
        ..Default::default()
    };

    let course_model = new_course
        .insert(&state.db)
        .await
        .map_err(|err| unique_conflict(err, MSG_TITLE_TAKEN))?;

    info!("Successfully created course with ID: {}", course_model.id);
    Ok(ApiResponse::created(
        "Course Created Successfully.",
        CourseResponse::from(course_model),
    ))
}

/// Filtered, sorted and paginated catalog listing
#[utoipa::path(
    post,
    path = "/api/v1/courses/list",
    request_body = CourseListRequest,
    responses(
        (status = 200, description = "Page of courses", body = CourseListResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "courses"
)]
#[instrument(skip(state, query))]
pub async fn list_courses(
    State(state): State<AppState>,
    Valid(Json(query)): Valid<Json<CourseListRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<CourseListResponse>>), ApiError> {
    let params = PageParams::new(query.page, query.limit);

    let mut select = Course::find();
    if let Some(search) = &query.search {
        select = select.filter(course::Column::Title.contains(search));
    }
    if let Some(category) = &query.category {
        select = select.filter(course::Column::Category.eq(category));
    }
    if let Some(language) = &query.language {
        select = select.filter(course::Column::Language.eq(language));
    }
    if let Some(instructor) = query.instructor {
        select = select.filter(course::Column::InstructorId.eq(instructor));
    }
    if let Some(price) = query.price {
        select = select.filter(course::Column::Price.eq(price));
    }
    if let Some(tags) = &query.tags {
        // any-of semantics over the stored tag list
        let mut condition = Condition::any();
        for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            condition = condition.add(course::Column::Tags.contains(tag));
        }
        select = select.filter(condition);
    }

    let sort_column = match query.sort.as_deref() {
        Some("title") => course::Column::Title,
        Some("price") => course::Column::Price,
        Some("ratings") => course::Column::Ratings,
        Some("duration") => course::Column::Duration,
        Some("totalSales") => course::Column::TotalSales,
        None => course::Column::Id,
        Some(other) => {
            return Err(ApiError::Validation(format!("Invalid Sort Field: {other}.")));
        }
    };
    let direction = if query.order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let select = select.order_by(sort_column, direction);

    let paginator = select.paginate(&state.db, params.limit);
    let total_courses = paginator.num_items().await?;
    let total_pages = params.total_pages(total_courses);
    let courses = paginator
        .fetch_page(params.page_index())
        .await?
        .into_iter()
        .map(CourseResponse::from)
        .collect::<Vec<_>>();

    debug!(
        "Listed {} of {} courses (page {})",
        courses.len(),
        total_courses,
        params.page
    );
    Ok(ApiResponse::ok(
        "Courses Fetched Successfully.",
        CourseListResponse {
            courses,
            total_courses,
            total_pages,
        },
    ))
}

/// Course detail lookup, served from the read cache when warm
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course details", body = CourseResponse),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "courses"
)]
#[instrument(skip(state))]
pub async fn get_course(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<CourseResponse>>), ApiError> {
    if let Some(CachedData::Course(cached)) = state.cache.get(&course_cache_key(id)).await {
        debug!("Course {} served from cache", id);
        return Ok(ApiResponse::ok("Course Fetched Successfully.", cached));
    }

    let course_model = Course::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_COURSE_NOT_FOUND.to_string()))?;

    let response = CourseResponse::from(course_model);
    state
        .cache
        .insert(course_cache_key(id), CachedData::Course(response.clone()))
        .await;

    Ok(ApiResponse::ok("Course Fetched Successfully.", response))
}

/// Update a course owned by the caller (admins may edit any course)
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = i32, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Title already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "courses"
)]
#[instrument(skip(state, claims, request))]
pub async fn update_course(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateCourseRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<CourseResponse>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let course_model = find_owned_course(&state, id, &claims).await?;

    let mut active: course::ActiveModel = course_model.into();
    if let Some(title) = request.title {
        active.title = Set(title);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
    }
    if let Some(price) = request.price {
        active.price = Set(price);
        active.is_free = Set(price.is_zero());
    }
    if let Some(estimated_price) = request.estimated_price {
        active.estimated_price = Set(Some(estimated_price));
    }
    if let Some(duration) = request.duration {
        active.duration = Set(duration);
    }
    if let Some(thumbnail) = request.thumbnail {
        active.thumbnail = Set(Some(thumbnail));
    }
    if let Some(category) = request.category {
        active.category = Set(Some(category));
    }
    if let Some(language) = request.language {
        active.language = Set(language);
    }
    if let Some(tags) = request.tags {
        active.tags = Set(Some(encode_tags(&tags)?));
    }
    if let Some(is_published) = request.is_published {
        active.is_published = Set(is_published);
    }

    let updated = active
        .update(&state.db)
        .await
        .map_err(|err| unique_conflict(err, MSG_TITLE_TAKEN))?;

    state.cache.invalidate(&course_cache_key(id)).await;
    info!("Successfully updated course {}", id);
    Ok(ApiResponse::ok(
        "Course Updated Successfully.",
        CourseResponse::from(updated),
    ))
}

/// Delete a course and everything hanging off it
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an instructor"),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "courses"
)]
#[instrument(skip(state, claims))]
pub async fn delete_course(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;
    let course_model = find_owned_course(&state, id, &claims).await?;

    Course::delete_by_id(course_model.id).exec(&state.db).await?;
    state.cache.invalidate(&course_cache_key(id)).await;

    info!("Successfully deleted course {}", id);
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Course Deleted Successfully.",
    ))
}

/// Enroll the calling user into a course. Membership rows, the progress
/// snapshot and the instructor notification are written in one transaction,
/// so a crash can never leave a half-enrolled account behind.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    params(("id" = i32, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrolled"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Already enrolled"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "courses"
)]
#[instrument(skip(state, claims))]
pub async fn enroll_course(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let txn = state.db.begin().await?;

    let course_model = Course::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_COURSE_NOT_FOUND.to_string()))?;
    let user_model = User::find_by_id(claims.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found.".to_string()))?;

    let on_roster = CourseStudent::find_by_id((course_model.id, user_model.id))
        .one(&txn)
        .await?
        .is_some();
    let on_enrolled_list = UserCourse::find_by_id((user_model.id, course_model.id))
        .one(&txn)
        .await?
        .is_some();

    if on_roster && on_enrolled_list {
        warn!(
            "User {} already enrolled in course {}",
            user_model.id, course_model.id
        );
        return Err(ApiError::Conflict("Course Already Enrolled.".to_string()));
    }

    // A partially-enrolled account (one membership row missing) is repaired
    // rather than rejected.
    if !on_roster {
        course_student::ActiveModel {
            course_id: Set(course_model.id),
            user_id: Set(user_model.id),
        }
        .insert(&txn)
        .await?;
    }
    if !on_enrolled_list {
        user_course::ActiveModel {
            user_id: Set(user_model.id),
            course_id: Set(course_model.id),
        }
        .insert(&txn)
        .await?;
    }

    let has_snapshot = Progress::find()
        .filter(progress::Column::UserId.eq(user_model.id))
        .filter(progress::Column::CourseId.eq(course_model.id))
        .one(&txn)
        .await?
        .is_some();
    if !has_snapshot {
        let contents = Content::find()
            .filter(content::Column::CourseId.eq(course_model.id))
            .order_by_asc(content::Column::SortOrder)
            .all(&txn)
            .await?;
        let mut outline = CourseOutline::default();
        for content_model in &contents {
            let lecture_ids = Lecture::find()
                .filter(lecture::Column::ContentId.eq(content_model.id))
                .order_by_asc(lecture::Column::SortOrder)
                .all(&txn)
                .await?
                .into_iter()
                .map(|lecture_model| lecture_model.id)
                .collect();
            outline.contents.push(ContentOutline {
                content_id: content_model.id,
                lecture_ids,
            });
        }
        let snapshot = ProgressState::from_outline(&outline);

        let progress_row = progress::ActiveModel {
            user_id: Set(user_model.id),
            course_id: Set(course_model.id),
            course_completed: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        for content_progress in &snapshot.contents_progress {
            let content_row = progress_content::ActiveModel {
                progress_id: Set(progress_row.id),
                content_id: Set(content_progress.content_id),
                completed: Set(false),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            for lecture_progress in &content_progress.lectures_progress {
                progress_lecture::ActiveModel {
                    progress_content_id: Set(content_row.id),
                    lecture_id: Set(lecture_progress.lecture_id),
                    completed: Set(false),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    notification::ActiveModel {
        user_id: Set(course_model.instructor_id),
        title: Set("New Enrollment".to_string()),
        description: Set(format!(
            "{} has enrolled in {}",
            user_model.username, course_model.title
        )),
        kind: Set("enrollment".to_string()),
        is_read: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    state
        .cache
        .invalidate(&format!("notifications-{}", course_model.instructor_id))
        .await;

    info!(
        "User {} enrolled in course {}",
        user_model.id, course_model.id
    );
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Course Enrolled Successfully.",
    ))
}

/// Instructors may only touch their own courses; admins may touch any.
async fn find_owned_course(
    state: &AppState,
    course_id: i32,
    claims: &crate::auth::Claims,
) -> Result<course::Model, ApiError> {
    let mut select = Course::find_by_id(course_id);
    if claims.role()? != Role::Admin {
        select = select.filter(course::Column::InstructorId.eq(claims.user_id));
    }
    select
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_COURSE_NOT_FOUND.to_string()))
}
