use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use model::entities::prelude::{Course, CourseStudent, Review};
use model::entities::user::Role;
use model::entities::{course, notification, review};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{unique_conflict, ApiError};
use crate::schemas::{ApiResponse, AppState, CachedData};

const MSG_REVIEW_NOT_FOUND: &str = "Review Not Found.";

fn reviews_cache_key(course_id: i32) -> String {
    format!("reviews-{course_id}")
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub course_id: i32,
    /// Star rating from 1 to 5
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1))]
    pub review: String,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    #[validate(length(min = 1))]
    pub review: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct ReplyReviewRequest {
    #[validate(length(min = 1))]
    pub reply: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewListQuery {
    /// Course to list reviews for
    pub course: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub rating: i32,
    pub review: String,
    pub reply: Option<String>,
    pub replied_by: Option<i32>,
}

impl From<review::Model> for ReviewResponse {
    fn from(model: review::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            course_id: model.course_id,
            rating: model.rating,
            review: model.review,
            reply: model.reply,
            replied_by: model.replied_by,
        }
    }
}

/// Recomputes the course's average rating from its surviving reviews.
async fn refresh_course_rating<C: sea_orm::ConnectionTrait>(
    db: &C,
    course_id: i32,
) -> Result<(), ApiError> {
    let ratings: Vec<i32> = Review::find()
        .filter(review::Column::CourseId.eq(course_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.rating)
        .collect();

    let average = if ratings.is_empty() {
        Decimal::ZERO
    } else {
        let sum: i32 = ratings.iter().sum();
        (Decimal::from(sum) / Decimal::from(ratings.len() as i64)).round_dp(2)
    };

    if let Some(course_model) = Course::find_by_id(course_id).one(db).await? {
        let mut active: course::ActiveModel = course_model.into();
        active.ratings = Set(average);
        active.update(db).await?;
    }
    Ok(())
}

/// Post a review for an enrolled course. One review per user per course.
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not enrolled"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course already reviewed"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
#[instrument(skip(state, claims, request))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<CreateReviewRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    let course_model = Course::find_by_id(request.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course Not Found.".to_string()))?;

    let enrolled = CourseStudent::find_by_id((course_model.id, claims.user_id))
        .one(&state.db)
        .await?
        .is_some();
    if !enrolled {
        warn!(
            "User {} tried to review course {} without enrolling",
            claims.user_id, course_model.id
        );
        return Err(ApiError::Forbidden);
    }

    let txn = state.db.begin().await?;
    let review_model = review::ActiveModel {
        user_id: Set(claims.user_id),
        course_id: Set(course_model.id),
        rating: Set(request.rating),
        review: Set(request.review),
        reply: Set(None),
        replied_by: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| unique_conflict(err, "Course Already Reviewed."))?;

    refresh_course_rating(&txn, course_model.id).await?;

    notification::ActiveModel {
        user_id: Set(course_model.instructor_id),
        title: Set("New Review".to_string()),
        description: Set(format!(
            "{} left a {}-star review on {}",
            claims.username, review_model.rating, course_model.title
        )),
        kind: Set("review".to_string()),
        is_read: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    state.cache.invalidate(&reviews_cache_key(course_model.id)).await;
    state
        .cache
        .invalidate(&format!("course-{}", course_model.id))
        .await;
    state
        .cache
        .invalidate(&format!("notifications-{}", course_model.instructor_id))
        .await;

    info!("Successfully created review with ID: {}", review_model.id);
    Ok(ApiResponse::created(
        "Review Created Successfully.",
        ReviewResponse::from(review_model),
    ))
}

/// List the reviews of a course, served from the read cache when warm
#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    params(ReviewListQuery),
    responses(
        (status = 200, description = "Reviews for the course", body = [ReviewResponse]),
        (status = 400, description = "Malformed course parameter"),
        (status = 404, description = "Course parameter missing"),
        (status = 500, description = "Internal server error")
    ),
    tag = "reviews"
)]
#[instrument(skip(state, query))]
pub async fn list_reviews(
    query: Result<Query<ReviewListQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ReviewResponse>>>), ApiError> {
    // A malformed query string still gets the uniform envelope.
    let Query(query) = query.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let course_id = query
        .course
        .ok_or_else(|| ApiError::NotFound("Course Not Found.".to_string()))?;

    if let Some(CachedData::Reviews(cached)) =
        state.cache.get(&reviews_cache_key(course_id)).await
    {
        debug!("Reviews for course {} served from cache", course_id);
        return Ok(ApiResponse::ok("Reviews Fetched Successfully.", cached));
    }

    let reviews: Vec<ReviewResponse> = Review::find()
        .filter(review::Column::CourseId.eq(course_id))
        .order_by_desc(review::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(ReviewResponse::from)
        .collect();

    state
        .cache
        .insert(
            reviews_cache_key(course_id),
            CachedData::Reviews(reviews.clone()),
        )
        .await;

    Ok(ApiResponse::ok("Reviews Fetched Successfully.", reviews))
}

/// Single review lookup
#[utoipa::path(
    get,
    path = "/api/v1/reviews/{id}",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review details", body = ReviewResponse),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "reviews"
)]
#[instrument(skip(state))]
pub async fn get_review(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    let review_model = Review::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_REVIEW_NOT_FOUND.to_string()))?;

    Ok(ApiResponse::ok(
        "Review Fetched Successfully.",
        ReviewResponse::from(review_model),
    ))
}

/// Edit an own review (admins may edit any)
#[utoipa::path(
    patch,
    path = "/api/v1/reviews/{id}",
    params(("id" = i32, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the review author"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
#[instrument(skip(state, claims, request))]
pub async fn update_review(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateReviewRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    let review_model = Review::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_REVIEW_NOT_FOUND.to_string()))?;
    if review_model.user_id != claims.user_id && claims.role()? != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    let course_id = review_model.course_id;
    let mut active: review::ActiveModel = review_model.into();
    if let Some(rating) = request.rating {
        active.rating = Set(rating);
    }
    if let Some(review_text) = request.review {
        active.review = Set(review_text);
    }

    let txn = state.db.begin().await?;
    let updated = active.update(&txn).await?;
    refresh_course_rating(&txn, course_id).await?;
    txn.commit().await?;

    state.cache.invalidate(&reviews_cache_key(course_id)).await;
    state.cache.invalidate(&format!("course-{course_id}")).await;

    info!("Successfully updated review {}", id);
    Ok(ApiResponse::ok(
        "Review Updated Successfully.",
        ReviewResponse::from(updated),
    ))
}

/// Delete an own review (admins may delete any)
#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the review author"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
#[instrument(skip(state, claims))]
pub async fn delete_review(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let review_model = Review::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_REVIEW_NOT_FOUND.to_string()))?;
    if review_model.user_id != claims.user_id && claims.role()? != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    let course_id = review_model.course_id;
    let txn = state.db.begin().await?;
    Review::delete_by_id(review_model.id).exec(&txn).await?;
    refresh_course_rating(&txn, course_id).await?;
    txn.commit().await?;

    state.cache.invalidate(&reviews_cache_key(course_id)).await;
    state.cache.invalidate(&format!("course-{course_id}")).await;

    info!("Successfully deleted review {}", id);
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Review Deleted Successfully.",
    ))
}

/// Reply to a review of an own course
#[utoipa::path(
    post,
    path = "/api/v1/reviews/reply/{id}",
    params(("id" = i32, Path, description = "Review ID")),
    request_body = ReplyReviewRequest,
    responses(
        (status = 200, description = "Reply recorded", body = ReviewResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller does not own the course"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
#[instrument(skip(state, claims, request))]
pub async fn reply_review(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<ReplyReviewRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    claims.require_role(&[Role::Instructor, Role::Admin])?;

    let review_model = Review::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_REVIEW_NOT_FOUND.to_string()))?;
    let course_model = Course::find_by_id(review_model.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course Not Found.".to_string()))?;
    if course_model.instructor_id != claims.user_id && claims.role()? != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    let mut active: review::ActiveModel = review_model.into();
    active.reply = Set(Some(request.reply));
    active.replied_by = Set(Some(claims.user_id));
    let updated = active.update(&state.db).await?;

    state
        .cache
        .invalidate(&reviews_cache_key(course_model.id))
        .await;

    info!("Instructor {} replied to review {}", claims.user_id, id);
    Ok(ApiResponse::ok(
        "Reply Added Successfully.",
        ReviewResponse::from(updated),
    ))
}
