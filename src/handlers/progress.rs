use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum_valid::Valid;
use common::{ContentProgress, LectureProgress, ProgressState, RollUp};
use model::entities::prelude::{Progress, ProgressContent, ProgressLecture};
use model::entities::{progress, progress_content, progress_lecture};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkLectureCompleteRequest {
    pub course_id: i32,
    pub content_id: i32,
    pub lecture_id: i32,
}

/// Marks a lecture as watched in the caller's progress snapshot and rolls
/// completion up to the content and course levels. The whole snapshot is
/// loaded, mutated in memory and written back in one transaction, so the
/// stored flags always agree with each other.
#[utoipa::path(
    post,
    path = "/api/v1/progress/mark-lecture-complete",
    request_body = MarkLectureCompleteRequest,
    responses(
        (status = 200, description = "Progress updated", body = RollUp),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No snapshot, or unknown content/lecture id"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "progress"
)]
#[instrument(skip(state, claims, request))]
pub async fn mark_lecture_complete(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Valid(Json(request)): Valid<Json<MarkLectureCompleteRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<RollUp>>), ApiError> {
    debug!(
        "Marking lecture {} complete for user {} in course {}",
        request.lecture_id, claims.user_id, request.course_id
    );

    let progress_row = Progress::find()
        .filter(progress::Column::UserId.eq(claims.user_id))
        .filter(progress::Column::CourseId.eq(request.course_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Progress Not Found.".to_string()))?;

    // Rebuild the snapshot, keeping the row handles for the write-back.
    let content_rows = ProgressContent::find()
        .filter(progress_content::Column::ProgressId.eq(progress_row.id))
        .order_by_asc(progress_content::Column::Id)
        .all(&state.db)
        .await?;
    let mut lecture_rows_by_content = Vec::with_capacity(content_rows.len());
    let mut snapshot = ProgressState {
        course_completed: progress_row.course_completed,
        contents_progress: Vec::with_capacity(content_rows.len()),
    };
    for content_row in &content_rows {
        let lecture_rows = ProgressLecture::find()
            .filter(progress_lecture::Column::ProgressContentId.eq(content_row.id))
            .order_by_asc(progress_lecture::Column::Id)
            .all(&state.db)
            .await?;
        snapshot.contents_progress.push(ContentProgress {
            content_id: content_row.content_id,
            completed: content_row.completed,
            lectures_progress: lecture_rows
                .iter()
                .map(|row| LectureProgress {
                    lecture_id: row.lecture_id,
                    completed: row.completed,
                })
                .collect(),
        });
        lecture_rows_by_content.push(lecture_rows);
    }

    let roll_up = snapshot
        .mark_lecture_complete(request.content_id, request.lecture_id)
        .map_err(|err| ApiError::NotFound(err.to_string()))?;

    // Persist only the flags that flipped.
    let txn = state.db.begin().await?;
    for (index, content_row) in content_rows.iter().enumerate() {
        let content_state = &snapshot.contents_progress[index];
        for (lecture_index, lecture_row) in lecture_rows_by_content[index].iter().enumerate() {
            let lecture_state = &content_state.lectures_progress[lecture_index];
            if lecture_state.completed != lecture_row.completed {
                let mut active: progress_lecture::ActiveModel = lecture_row.clone().into();
                active.completed = Set(lecture_state.completed);
                active.update(&txn).await?;
            }
        }
        if content_state.completed != content_row.completed {
            let mut active: progress_content::ActiveModel = content_row.clone().into();
            active.completed = Set(content_state.completed);
            active.update(&txn).await?;
        }
    }
    if snapshot.course_completed != progress_row.course_completed {
        let mut active: progress::ActiveModel = progress_row.into();
        active.course_completed = Set(snapshot.course_completed);
        active.update(&txn).await?;
    }
    txn.commit().await?;

    info!(
        "User {} progress updated in course {} (content completed: {}, course completed: {})",
        claims.user_id, request.course_id, roll_up.content_completed, roll_up.course_completed
    );
    Ok(ApiResponse::ok("Progress Updated Successfully.", roll_up))
}
