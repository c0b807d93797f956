use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use model::entities::notification;
use model::entities::prelude::Notification;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, CachedData};

fn notifications_cache_key(user_id: i32) -> String {
    format!("notifications-{user_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// Event category, e.g. "enrollment" or "review"
    pub kind: String,
    pub is_read: bool,
}

impl From<notification::Model> for NotificationResponse {
    fn from(model: notification::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            kind: model.kind,
            is_read: model.is_read,
        }
    }
}

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses(
        (status = 200, description = "Notifications", body = [NotificationResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, claims))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<Vec<NotificationResponse>>>), ApiError> {
    if let Some(CachedData::Notifications(cached)) = state
        .cache
        .get(&notifications_cache_key(claims.user_id))
        .await
    {
        debug!("Notifications for user {} served from cache", claims.user_id);
        return Ok(ApiResponse::ok(
            "Notifications Fetched Successfully.",
            cached,
        ));
    }

    let notifications: Vec<NotificationResponse> = Notification::find()
        .filter(notification::Column::UserId.eq(claims.user_id))
        .order_by_desc(notification::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(NotificationResponse::from)
        .collect();

    state
        .cache
        .insert(
            notifications_cache_key(claims.user_id),
            CachedData::Notifications(notifications.clone()),
        )
        .await;

    Ok(ApiResponse::ok(
        "Notifications Fetched Successfully.",
        notifications,
    ))
}

/// Mark every unread notification of the caller as read
#[utoipa::path(
    put,
    path = "/api/v1/notifications/mark-as-read",
    responses(
        (status = 200, description = "Notifications marked as read"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, claims))]
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let result = Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(claims.user_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(&state.db)
        .await?;

    state
        .cache
        .invalidate(&notifications_cache_key(claims.user_id))
        .await;

    info!(
        "Marked {} notifications as read for user {}",
        result.rows_affected, claims.user_id
    );
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Notifications Marked As Read.",
    ))
}
