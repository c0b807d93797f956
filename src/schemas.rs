use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::config::AppConfig;
use crate::email::EmailSender;
use crate::handlers::courses::CourseResponse;
use crate::handlers::notifications::NotificationResponse;
use crate::handlers::reviews::ReviewResponse;
use crate::payments::CheckoutGateway;

/// Shared application context handed to every handler through axum state.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cache: Cache<String, CachedData>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn EmailSender>,
    pub checkout: Arc<dyn CheckoutGateway>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("cache_entries", &self.cache.entry_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Payloads stored in the short-lived read cache, keyed by strings such as
/// `course-{id}`, `notifications-{user_id}` and `reviews-{course_id}`.
#[derive(Debug, Clone)]
pub enum CachedData {
    Course(CourseResponse),
    Notifications(Vec<NotificationResponse>),
    Reviews(Vec<ReviewResponse>),
}

/// Uniform response envelope. `statusCode` always mirrors the HTTP status and
/// `data` is omitted from the payload entirely when there is nothing to carry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize + DeserializeOwned> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    pub fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: T,
    ) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                status_code: status.as_u16(),
                message: message.into(),
                data: Some(data),
            }),
        )
    }
}

impl ApiResponse<()> {
    /// Envelope without a data payload.
    pub fn message(
        status: StatusCode,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        (
            status,
            Json(ApiResponse {
                status_code: status.as_u16(),
                message: message.into(),
                data: None,
            }),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::signup,
        crate::handlers::auth::login,
        crate::handlers::auth::forgot_password,
        crate::handlers::auth::reset_password,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::verify_email,
        crate::handlers::users::update_profile,
        crate::handlers::users::update_avatar,
        crate::handlers::users::get_profile,
        crate::handlers::users::get_instructor_profile,
        crate::handlers::courses::create_course,
        crate::handlers::courses::list_courses,
        crate::handlers::courses::get_course,
        crate::handlers::courses::update_course,
        crate::handlers::courses::delete_course,
        crate::handlers::courses::enroll_course,
        crate::handlers::contents::create_content,
        crate::handlers::contents::update_content,
        crate::handlers::contents::delete_content,
        crate::handlers::lectures::create_lecture,
        crate::handlers::lectures::update_lecture,
        crate::handlers::lectures::delete_lecture,
        crate::handlers::progress::mark_lecture_complete,
        crate::handlers::reviews::create_review,
        crate::handlers::reviews::list_reviews,
        crate::handlers::reviews::get_review,
        crate::handlers::reviews::update_review,
        crate::handlers::reviews::delete_review,
        crate::handlers::reviews::reply_review,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_all_as_read,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::checkout_webhook,
    ),
    components(schemas(
        HealthResponse,
        crate::handlers::auth::SignupRequest,
        crate::handlers::auth::LoginRequest,
        crate::handlers::auth::ForgotPasswordRequest,
        crate::handlers::auth::ResetPasswordRequest,
        crate::handlers::auth::TokenResponse,
        crate::handlers::users::UpdateUserRequest,
        crate::handlers::users::UpdateAvatarRequest,
        crate::handlers::users::UserResponse,
        crate::handlers::courses::CreateCourseRequest,
        crate::handlers::courses::CourseListRequest,
        crate::handlers::courses::UpdateCourseRequest,
        crate::handlers::courses::CourseResponse,
        crate::handlers::courses::CourseListResponse,
        crate::handlers::contents::CreateContentRequest,
        crate::handlers::contents::UpdateContentRequest,
        crate::handlers::contents::ContentResponse,
        crate::handlers::lectures::CreateLectureRequest,
        crate::handlers::lectures::UpdateLectureRequest,
        crate::handlers::lectures::LectureResponse,
        crate::handlers::progress::MarkLectureCompleteRequest,
        crate::handlers::reviews::CreateReviewRequest,
        crate::handlers::reviews::UpdateReviewRequest,
        crate::handlers::reviews::ReplyReviewRequest,
        crate::handlers::reviews::ReviewResponse,
        crate::handlers::notifications::NotificationResponse,
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::OrderResponse,
        crate::handlers::orders::WebhookAck,
        crate::payments::WebhookEvent,
        crate::payments::WebhookData,
        crate::payments::WebhookObject,
        common::ProgressState,
        common::ContentProgress,
        common::LectureProgress,
        common::RollUp,
    ))
)]
pub struct ApiDoc;
