//! Per-enrollment progress tracking.
//!
//! A [`ProgressState`] is a point-in-time snapshot of a course's
//! Content → Lecture tree taken at enrollment. It is never re-synced when the
//! catalog changes afterwards; completion only ever moves forward.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Errors from the roll-up state machine. Both map to NotFound at the API
/// boundary: the caller referenced a content or lecture that is not part of
/// this snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressStateError {
    #[error("content {0} is not part of this progress snapshot")]
    ContentNotFound(i32),
    #[error("lecture {0} is not part of this progress snapshot")]
    LectureNotFound(i32),
}

/// The lecture list of one content item, as seen at enrollment time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentOutline {
    pub content_id: i32,
    pub lecture_ids: Vec<i32>,
}

/// The Content → Lecture tree of a course at enrollment time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseOutline {
    pub contents: Vec<ContentOutline>,
}

/// Completion flag for a single snapshotted lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LectureProgress {
    pub lecture_id: i32,
    pub completed: bool,
}

/// Completion state for one snapshotted content item and its lectures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentProgress {
    pub content_id: i32,
    pub completed: bool,
    pub lectures_progress: Vec<LectureProgress>,
}

/// Full progress state for one (user, course) enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub course_completed: bool,
    pub contents_progress: Vec<ContentProgress>,
}

/// What a single mark-complete call changed, after rolling the flags up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RollUp {
    /// The targeted content item has all of its lectures completed.
    pub content_completed: bool,
    /// Every content item of the course is completed.
    pub course_completed: bool,
}

impl ProgressState {
    /// Build the initial snapshot for an enrollment: one entry per content
    /// and lecture, every flag false.
    pub fn from_outline(outline: &CourseOutline) -> Self {
        Self {
            course_completed: false,
            contents_progress: outline
                .contents
                .iter()
                .map(|content| ContentProgress {
                    content_id: content.content_id,
                    completed: false,
                    lectures_progress: content
                        .lecture_ids
                        .iter()
                        .map(|&lecture_id| LectureProgress {
                            lecture_id,
                            completed: false,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Mark one lecture complete and roll the completion flags up through the
    /// content item to the whole course.
    ///
    /// Completion is monotonic: flags only ever flip from false to true, and
    /// re-marking an already-completed lecture is a no-op. An id that does
    /// not match the snapshot leaves the state untouched and returns an
    /// error.
    pub fn mark_lecture_complete(
        &mut self,
        content_id: i32,
        lecture_id: i32,
    ) -> Result<RollUp, ProgressStateError> {
        let content = self
            .contents_progress
            .iter_mut()
            .find(|c| c.content_id == content_id)
            .ok_or(ProgressStateError::ContentNotFound(content_id))?;

        let lecture = content
            .lectures_progress
            .iter_mut()
            .find(|l| l.lecture_id == lecture_id)
            .ok_or(ProgressStateError::LectureNotFound(lecture_id))?;

        lecture.completed = true;

        if content.lectures_progress.iter().all(|l| l.completed) {
            content.completed = true;
        }
        if self.contents_progress.iter().all(|c| c.completed) {
            self.course_completed = true;
        }

        tracing::debug!(
            content_id,
            lecture_id,
            course_completed = self.course_completed,
            "lecture marked complete"
        );

        Ok(RollUp {
            content_completed: self
                .contents_progress
                .iter()
                .find(|c| c.content_id == content_id)
                .map(|c| c.completed)
                .unwrap_or(false),
            course_completed: self.course_completed,
        })
    }
}
