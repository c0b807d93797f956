//! Framework-free domain types shared between the backend handlers and the
//! workspace tests: the per-enrollment progress state machine and the
//! pagination math used by list endpoints.

mod pagination;
mod progress;

pub use pagination::{PageParams, DEFAULT_PAGE, DEFAULT_PAGE_LIMIT};
pub use progress::{
    ContentOutline, ContentProgress, CourseOutline, LectureProgress, ProgressState,
    ProgressStateError, RollUp,
};
