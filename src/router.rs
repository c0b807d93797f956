use crate::handlers::{
    auth::{forgot_password, login, refresh_token, reset_password, signup, verify_email},
    contents::{create_content, delete_content, update_content},
    courses::{
        create_course, delete_course, enroll_course, get_course, list_courses, update_course,
    },
    health::health_check,
    lectures::{create_lecture, delete_lecture, update_lecture},
    notifications::{list_notifications, mark_all_as_read},
    orders::{checkout_webhook, create_order, list_orders},
    progress::mark_lecture_complete,
    reviews::{create_review, delete_review, get_review, list_reviews, reply_review, update_review},
    users::{get_instructor_profile, get_profile, update_avatar, update_profile},
};
use crate::schemas::{ApiDoc, AppState};
use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_origin);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/forgot-password", post(forgot_password))
        .route("/api/v1/auth/resetpassword", post(reset_password))
        .route("/api/v1/auth/refresh-token", get(refresh_token))
        .route("/api/v1/auth/verify-email/:token", get(verify_email))
        // User routes
        .route("/api/v1/users/update", put(update_profile))
        .route("/api/v1/users/update-avatar", put(update_avatar))
        .route("/api/v1/users/profile", get(get_profile))
        .route(
            "/api/v1/users/instructor-profile/:id",
            get(get_instructor_profile),
        )
        // Course catalog routes
        .route("/api/v1/courses", post(create_course))
        .route("/api/v1/courses/list", post(list_courses))
        .route("/api/v1/courses/:id", get(get_course))
        .route("/api/v1/courses/:id", put(update_course))
        .route("/api/v1/courses/:id", delete(delete_course))
        .route("/api/v1/courses/:id/enroll", post(enroll_course))
        // Content and lecture routes
        .route("/api/v1/contents", post(create_content))
        .route("/api/v1/contents/:id", patch(update_content))
        .route("/api/v1/contents/:id", delete(delete_content))
        .route("/api/v1/lectures", post(create_lecture))
        .route("/api/v1/lectures/:id", patch(update_lecture))
        .route("/api/v1/lectures/:id", delete(delete_lecture))
        // Progress routes
        .route(
            "/api/v1/progress/mark-lecture-complete",
            post(mark_lecture_complete),
        )
        // Review routes
        .route("/api/v1/reviews", post(create_review))
        .route("/api/v1/reviews", get(list_reviews))
        .route("/api/v1/reviews/:id", get(get_review))
        .route("/api/v1/reviews/:id", patch(update_review))
        .route("/api/v1/reviews/:id", delete(delete_review))
        .route("/api/v1/reviews/reply/:id", post(reply_review))
        // Notification routes
        .route("/api/v1/notifications", get(list_notifications))
        .route("/api/v1/notifications/mark-as-read", put(mark_all_as_read))
        // Order routes
        .route("/api/v1/orders", post(create_order))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/webhook", post(checkout_webhook))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(cors),
        )
        .with_state(state)
}

/// Locks CORS down to the configured frontend origin, falling back to a
/// permissive policy when the origin cannot be parsed.
fn cors_layer(frontend_origin: &str) -> CorsLayer {
    match frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        Err(_) => {
            warn!("Invalid FRONTEND_ORIGIN, falling back to permissive CORS");
            CorsLayer::permissive()
        }
    }
}
