pub mod auth;
pub mod contents;
pub mod courses;
pub mod health;
pub mod lectures;
pub mod notifications;
pub mod orders;
pub mod progress;
pub mod reviews;
pub mod users;
