use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use model::entities::order::{self, OrderStatus};
use model::entities::prelude::{Course, Order, User};
use model::entities::{course, notification};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::payments::{
    WebhookEvent, EVENT_CHECKOUT_COMPLETED, EVENT_CHECKOUT_FAILED, FREE_TRANSACTION_ID,
};
use crate::schemas::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub course_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i32,
    pub course_id: i32,
    #[schema(value_type = String)]
    pub amount: rust_decimal::Decimal,
    pub status: String,
    pub transaction_id: String,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            course_id: model.course_id,
            amount: model.amount,
            status: model.status.to_value(),
            transaction_id: model.transaction_id,
        }
    }
}

/// Start a purchase. Free courses complete immediately; paid courses get a
/// pending order plus a hosted checkout URL, and completion arrives through
/// the webhook.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created; data carries the checkout URL for paid courses", body = String),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course already purchased"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
#[instrument(skip(state, claims, request))]
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<CreateOrderRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<String>>), ApiError> {
    let course_model = Course::find_by_id(request.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course Not Found.".to_string()))?;
    let user_model = User::find_by_id(claims.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found.".to_string()))?;

    let already_purchased = Order::find()
        .filter(order::Column::UserId.eq(user_model.id))
        .filter(order::Column::CourseId.eq(course_model.id))
        .filter(order::Column::Status.eq(OrderStatus::Completed))
        .one(&state.db)
        .await?
        .is_some();
    if already_purchased {
        return Err(ApiError::Conflict("Course Already Purchased.".to_string()));
    }

    if course_model.is_free || course_model.price.is_zero() {
        debug!(
            "Free purchase of course {} by user {}",
            course_model.id, user_model.id
        );
        order::ActiveModel {
            user_id: Set(user_model.id),
            course_id: Set(course_model.id),
            amount: Set(course_model.price),
            status: Set(OrderStatus::Completed),
            transaction_id: Set(FREE_TRANSACTION_ID.to_string()),
            ..Default::default()
        }
        .insert(&state.db)
        .await?;

        return Ok(ApiResponse::created(
            "Course Purchased Successfully.",
            FREE_TRANSACTION_ID.to_string(),
        ));
    }

    let session = state.checkout.create_session(
        &user_model.email,
        &course_model.title,
        course_model.price,
    )?;
    order::ActiveModel {
        user_id: Set(user_model.id),
        course_id: Set(course_model.id),
        amount: Set(course_model.price),
        status: Set(OrderStatus::Pending),
        transaction_id: Set(session.id.clone()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(
        "Pending order for course {} by user {} (session {})",
        course_model.id, user_model.id, session.id
    );
    Ok(ApiResponse::created(
        "Order Created Successfully.",
        session.url,
    ))
}

/// List the caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders for the authenticated user", body = Vec<OrderResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
#[instrument(skip(state, claims))]
pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<Vec<OrderResponse>>>), ApiError> {
    let orders = Order::find()
        .filter(order::Column::UserId.eq(claims.user_id))
        .order_by_desc(order::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(OrderResponse::from)
        .collect();

    Ok(ApiResponse::ok("Orders Fetched Successfully.", orders))
}

/// Checkout provider webhook. Orders move out of `pending` exactly once, so
/// replayed completion events cannot bump a course's sales twice.
#[utoipa::path(
    post,
    path = "/api/v1/orders/webhook",
    request_body = WebhookEvent,
    responses(
        (status = 200, description = "Event processed", body = WebhookAck),
        (status = 500, description = "Internal server error")
    ),
    tag = "orders"
)]
#[instrument(skip(state, event), fields(event_type = %event.event_type))]
pub async fn checkout_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<(StatusCode, Json<ApiResponse<WebhookAck>>), ApiError> {
    let session_id = &event.data.object.id;
    match event.event_type.as_str() {
        EVENT_CHECKOUT_COMPLETED => {
            let pending = Order::find()
                .filter(order::Column::TransactionId.eq(session_id))
                .filter(order::Column::Status.eq(OrderStatus::Pending))
                .one(&state.db)
                .await?;
            match pending {
                Some(order_model) => {
                    // A second pending order for a pair that already settled
                    // must not complete again, or the sale would double-count.
                    let already_purchased = Order::find()
                        .filter(order::Column::UserId.eq(order_model.user_id))
                        .filter(order::Column::CourseId.eq(order_model.course_id))
                        .filter(order::Column::Status.eq(OrderStatus::Completed))
                        .one(&state.db)
                        .await?
                        .is_some();
                    if already_purchased {
                        warn!(
                            "Session {} duplicates an already-purchased course; marking failed",
                            session_id
                        );
                        let mut active: order::ActiveModel = order_model.into();
                        active.status = Set(OrderStatus::Failed);
                        active.update(&state.db).await?;
                        return Ok(ApiResponse::ok(
                            "Webhook Processed Successfully.",
                            WebhookAck { received: true },
                        ));
                    }

                    let txn = state.db.begin().await?;

                    let course_model = Course::find_by_id(order_model.course_id)
                        .one(&txn)
                        .await?;
                    let user_id = order_model.user_id;
                    let mut active: order::ActiveModel = order_model.into();
                    active.status = Set(OrderStatus::Completed);
                    active.update(&txn).await?;

                    if let Some(course_model) = course_model {
                        let course_id = course_model.id;
                        let new_total = course_model.total_sales + 1;
                        let mut course_active: course::ActiveModel = course_model.into();
                        course_active.total_sales = Set(new_total);
                        course_active.update(&txn).await?;

                        notification::ActiveModel {
                            user_id: Set(user_id),
                            title: Set("Payment Successful".to_string()),
                            description: Set("Your course purchase is complete.".to_string()),
                            kind: Set("order".to_string()),
                            is_read: Set(false),
                            ..Default::default()
                        }
                        .insert(&txn)
                        .await?;

                        txn.commit().await?;
                        state.cache.invalidate(&format!("course-{course_id}")).await;
                        state
                            .cache
                            .invalidate(&format!("notifications-{user_id}"))
                            .await;
                        info!("Completed order for session {}", session_id);
                    } else {
                        txn.commit().await?;
                        warn!(
                            "Completed order for session {} but its course is gone",
                            session_id
                        );
                    }
                }
                None => {
                    // Unknown or already-settled session; acknowledged without
                    // touching anything.
                    warn!("Ignoring completion for unmatched session {}", session_id);
                }
            }
        }
        EVENT_CHECKOUT_FAILED => {
            let pending = Order::find()
                .filter(order::Column::TransactionId.eq(session_id))
                .filter(order::Column::Status.eq(OrderStatus::Pending))
                .one(&state.db)
                .await?;
            if let Some(order_model) = pending {
                let mut active: order::ActiveModel = order_model.into();
                active.status = Set(OrderStatus::Failed);
                active.update(&state.db).await?;
                info!("Marked order failed for session {}", session_id);
            } else {
                warn!("Ignoring failure for unmatched session {}", session_id);
            }
        }
        other => {
            debug!("Ignoring webhook event type {}", other);
        }
    }

    Ok(ApiResponse::ok(
        "Webhook Processed Successfully.",
        WebhookAck { received: true },
    ))
}
