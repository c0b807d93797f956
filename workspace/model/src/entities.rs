//! SeaORM entities for the learning platform.
//!
//! The catalog is a Course → Content → Lecture containment chain; progress
//! snapshots mirror that chain per enrollment. Membership is intentionally
//! kept as two separate link tables (`course_students` and `user_courses`),
//! one per side of the relationship, because enrollment checks and repairs
//! each side independently.

pub mod content;
pub mod course;
pub mod course_student;
pub mod lecture;
pub mod notification;
pub mod order;
pub mod progress;
pub mod progress_content;
pub mod progress_lecture;
pub mod review;
pub mod user;
pub mod user_course;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::content::Entity as Content;
    pub use super::course::Entity as Course;
    pub use super::course_student::Entity as CourseStudent;
    pub use super::lecture::Entity as Lecture;
    pub use super::notification::Entity as Notification;
    pub use super::order::Entity as Order;
    pub use super::progress::Entity as Progress;
    pub use super::progress_content::Entity as ProgressContent;
    pub use super::progress_lecture::Entity as ProgressLecture;
    pub use super::review::Entity as Review;
    pub use super::user::Entity as User;
    pub use super::user_course::Entity as UserCourse;
}
