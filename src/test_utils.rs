#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use crate::auth::{self, Claims};
    use crate::config::AppConfig;
    use crate::email::ConsoleEmailSender;
    use crate::payments::HostedCheckout;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::http::HeaderValue;
    use axum::Router;
    use migration::{Migrator, MigratorTrait};
    use model::entities::user::Role;
    use model::entities::{content, course, lecture, user};
    use moka::future::Cache;
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set,
    };

    pub const TEST_PASSWORD: &str = "password123!";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            jwt_secret: "test-secret".to_string(),
            frontend_origin: "http://localhost:3000".to_string(),
        }
    }

    /// Create AppState for testing, backed by a fresh in-memory database
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        let cache = Cache::new(100);
        let config = test_config();

        AppState {
            db,
            cache,
            config: Arc::new(config),
            mailer: Arc::new(ConsoleEmailSender),
            checkout: Arc::new(HostedCheckout::new("http://localhost:3000")),
        }
    }

    /// Create axum app plus its state, so tests can inspect the database
    pub async fn setup_test_app() -> (axum_test::TestServer, AppState) {
        let state = setup_test_app_state().await;
        let app: Router = create_router(state.clone());
        let server = axum_test::TestServer::new(app).expect("Failed to start test server");
        (server, state)
    }

    /// Insert a user directly, bypassing the signup endpoint. The password is
    /// always [`TEST_PASSWORD`], hashed with a low cost to keep tests fast.
    pub async fn seed_user(
        db: &DatabaseConnection,
        username: &str,
        email: &str,
        role: Role,
    ) -> user::Model {
        let password_hash = bcrypt::hash(TEST_PASSWORD, 4).expect("Failed to hash password");
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            avatar: Set(None),
            role: Set(role),
            is_verified: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to seed user")
    }

    pub async fn seed_course(
        db: &DatabaseConnection,
        instructor_id: i32,
        title: &str,
        price: Decimal,
    ) -> course::Model {
        course::ActiveModel {
            title: Set(title.to_string()),
            description: Set(format!("About {title}")),
            price: Set(price),
            estimated_price: Set(None),
            duration: Set(120),
            thumbnail: Set(None),
            instructor_id: Set(instructor_id),
            category: Set(Some("programming".to_string())),
            language: Set("English".to_string()),
            tags: Set(None),
            ratings: Set(Decimal::ZERO),
            is_published: Set(true),
            is_free: Set(price.is_zero()),
            total_sales: Set(0),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to seed course")
    }

    pub async fn seed_content(
        db: &DatabaseConnection,
        course_id: i32,
        title: &str,
        order: i32,
    ) -> content::Model {
        content::ActiveModel {
            title: Set(title.to_string()),
            description: Set(format!("Section {title}")),
            sort_order: Set(order),
            course_id: Set(course_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to seed content")
    }

    pub async fn seed_lecture(
        db: &DatabaseConnection,
        content_id: i32,
        title: &str,
        order: i32,
    ) -> lecture::Model {
        lecture::ActiveModel {
            title: Set(title.to_string()),
            description: Set(format!("Lecture {title}")),
            sort_order: Set(order),
            video_url: Set("https://videos.example.com/1.mp4".to_string()),
            duration: Set("10:00".to_string()),
            is_preview: Set(false),
            content_id: Set(content_id),
            resources: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to seed lecture")
    }

    /// Mint a session token for a seeded user without going through the
    /// login endpoint.
    pub fn token_for(state: &AppState, user: &user::Model) -> String {
        auth::sign_token(&state.config.jwt_secret, &Claims::for_user(user))
            .expect("Failed to sign token")
    }

    pub fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {token}")).expect("Invalid header value")
    }
}
