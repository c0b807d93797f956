#[cfg(test)]
mod integration_tests {
    use crate::auth::{self, PURPOSE_VERIFY_EMAIL};
    use crate::handlers::auth::{LoginRequest, SignupRequest, TokenResponse};
    use crate::handlers::courses::{CourseListResponse, CourseResponse};
    use crate::handlers::notifications::NotificationResponse;
    use crate::handlers::orders::OrderResponse;
    use crate::handlers::reviews::ReviewResponse;
    use crate::schemas::ApiResponse;
    use crate::test_utils::test_utils::{
        bearer, seed_content, seed_course, seed_lecture, seed_user, setup_test_app, token_for,
        TEST_PASSWORD,
    };
    use axum::http::{header, StatusCode};
    use common::RollUp;
    use model::entities::order::OrderStatus;
    use model::entities::prelude::{
        Content, Course, CourseStudent, Lecture, Notification, Order, Progress, ProgressContent,
        ProgressLecture, User, UserCourse,
    };
    use model::entities::user::Role;
    use model::entities::{course_student, progress, user_course};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_health_check() {
        let (server, _state) = setup_test_app().await;

        let response = server.get("/health").await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signup_login_roundtrip() {
        let (server, state) = setup_test_app().await;

        let signup = SignupRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        };
        let response = server.post("/api/v1/auth/signup").json(&signup).await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.status_code, 201);
        assert_eq!(body.message, "User Signup Successfully.");

        // New accounts start out as plain unverified users with an avatar.
        let user = User::find()
            .one(&state.db)
            .await
            .unwrap()
            .expect("user row missing");
        assert_eq!(user.role, Role::User);
        assert!(!user.is_verified);
        assert!(user.avatar.as_deref().unwrap_or("").contains("ui-avatars"));
        assert_ne!(user.password_hash, TEST_PASSWORD);

        // Duplicate email is rejected.
        let response = server.post("/api/v1/auth/signup").json(&signup).await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.status_code, 409);
        assert_eq!(body.message, "User Already Exists.");

        let response = server
            .post("/api/v1/auth/login")
            .json(&LoginRequest {
                email: "alice@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<TokenResponse> = response.json();
        let token = body.data.expect("token missing").token;
        let claims = auth::verify_token(&state.config.jwt_secret, &token).unwrap();
        assert_eq!(claims.email, "alice@example.com");

        let response = server
            .post("/api/v1/auth/login")
            .json(&LoginRequest {
                email: "alice@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verify_email_flow() {
        let (server, state) = setup_test_app().await;

        server
            .post("/api/v1/auth/signup")
            .json(&SignupRequest {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .assert_status(StatusCode::CREATED);

        let token = auth::sign_action_token(
            &state.config.jwt_secret,
            "bob@example.com",
            PURPOSE_VERIFY_EMAIL,
        )
        .unwrap();

        let response = server
            .get(&format!("/api/v1/auth/verify-email/{token}"))
            .await;
        response.assert_status(StatusCode::OK);
        let user = User::find().one(&state.db).await.unwrap().unwrap();
        assert!(user.is_verified);

        // The same link is a conflict the second time around.
        let response = server
            .get(&format!("/api/v1/auth/verify-email/{token}"))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        // Garbage tokens never pass verification.
        let response = server.get("/api/v1/auth/verify-email/not-a-token").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_profile_requires_auth() {
        let (server, state) = setup_test_app().await;
        let user = seed_user(&state.db, "carol", "carol@example.com", Role::User).await;

        let response = server.get("/api/v1/users/profile").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let token = token_for(&state, &user);
        let response = server
            .get("/api/v1/users/profile")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let data = body.data.unwrap();
        assert_eq!(data["username"], "carol");
        // The hash must never appear in any serialized shape.
        assert!(data.get("passwordHash").is_none());
        assert!(data.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_profile_and_avatar_update() {
        let (server, state) = setup_test_app().await;
        let user = seed_user(&state.db, "erin", "erin@example.com", Role::User).await;
        let taken = seed_user(&state.db, "frank", "frank@example.com", Role::User).await;
        let token = token_for(&state, &user);

        let response = server
            .put("/api/v1/users/update")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "username": "erin2" }))
            .await;
        response.assert_status(StatusCode::OK);
        let row = User::find_by_id(user.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.username, "erin2");

        // Taking another account's email is a conflict.
        let response = server
            .put("/api/v1/users/update")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "email": taken.email }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let response = server
            .put("/api/v1/users/update-avatar")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "avatar": "https://cdn.example.com/erin.png" }))
            .await;
        response.assert_status(StatusCode::OK);
        let row = User::find_by_id(user.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.avatar.as_deref(), Some("https://cdn.example.com/erin.png"));
    }

    #[tokio::test]
    async fn test_refresh_token_issues_new_token() {
        let (server, state) = setup_test_app().await;
        let user = seed_user(&state.db, "dave", "dave@example.com", Role::User).await;
        let token = token_for(&state, &user);

        let response = server
            .get("/api/v1/auth/refresh-token")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<TokenResponse> = response.json();
        let fresh = body.data.unwrap().token;
        let claims = auth::verify_token(&state.config.jwt_secret, &fresh).unwrap();
        assert_eq!(claims.user_id, user.id);
    }

    #[tokio::test]
    async fn test_course_creation_requires_instructor_role() {
        let (server, state) = setup_test_app().await;
        let student = seed_user(&state.db, "student", "s@example.com", Role::User).await;
        let token = token_for(&state, &student);

        let response = server
            .post("/api/v1/courses")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "title": "Sneaky Course",
                "description": "Should not exist",
                "price": "10.00",
                "duration": 60
            }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(Course::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_course_crud() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "teach", "t@example.com", Role::Instructor).await;
        let token = token_for(&state, &instructor);

        let response = server
            .post("/api/v1/courses")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "title": "Rust 101",
                "description": "Ownership and borrowing",
                "price": "49.99",
                "duration": 300,
                "category": "programming",
                "tags": ["rust", "beginner"],
                "isPublished": true
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<CourseResponse> = response.json();
        let created = body.data.unwrap();
        assert_eq!(created.instructor_id, instructor.id);
        assert!(!created.is_free);
        assert_eq!(created.tags, vec!["rust", "beginner"]);

        // Titles are unique across the catalog.
        let response = server
            .post("/api/v1/courses")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "title": "Rust 101",
                "description": "Duplicate",
                "price": "0",
                "duration": 10
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let response = server
            .get(&format!("/api/v1/courses/{}", created.id))
            .await;
        response.assert_status(StatusCode::OK);

        let response = server
            .put(&format!("/api/v1/courses/{}", created.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "price": "0" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<CourseResponse> = response.json();
        assert!(body.data.unwrap().is_free);

        // Detail cache was invalidated by the update.
        let response = server
            .get(&format!("/api/v1/courses/{}", created.id))
            .await;
        let body: ApiResponse<CourseResponse> = response.json();
        assert!(body.data.unwrap().is_free);

        let response = server
            .delete(&format!("/api/v1/courses/{}", created.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let response = server
            .get(&format!("/api/v1/courses/{}", created.id))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_instructors_cannot_touch_foreign_courses() {
        let (server, state) = setup_test_app().await;
        let owner = seed_user(&state.db, "owner", "o@example.com", Role::Instructor).await;
        let other = seed_user(&state.db, "other", "x@example.com", Role::Instructor).await;
        let course = seed_course(&state.db, owner.id, "Owned Course", Decimal::ZERO).await;

        let token = token_for(&state, &other);
        let response = server
            .put(&format!("/api/v1/courses/{}", course.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "title": "Hijacked" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_course_listing_filters_and_pagination() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "lister", "l@example.com", Role::Instructor).await;
        seed_course(&state.db, instructor.id, "Rust Basics", Decimal::new(1000, 2)).await;
        seed_course(&state.db, instructor.id, "Rust Advanced", Decimal::new(2000, 2)).await;
        seed_course(&state.db, instructor.id, "Go Basics", Decimal::new(3000, 2)).await;

        let response = server
            .post("/api/v1/courses/list")
            .json(&json!({ "search": "Rust" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<CourseListResponse> = response.json();
        let data = body.data.unwrap();
        assert_eq!(data.total_courses, 2);
        assert!(data.courses.iter().all(|c| c.title.contains("Rust")));

        let response = server
            .post("/api/v1/courses/list")
            .json(&json!({ "limit": 2, "page": 2, "sort": "price", "order": "asc" }))
            .await;
        let body: ApiResponse<CourseListResponse> = response.json();
        let data = body.data.unwrap();
        assert_eq!(data.total_courses, 3);
        assert_eq!(data.total_pages, 2);
        assert_eq!(data.courses.len(), 1);
        assert_eq!(data.courses[0].title, "Go Basics");

        // Unknown sort fields are rejected rather than silently ignored.
        let response = server
            .post("/api/v1/courses/list")
            .json(&json!({ "sort": "password" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enroll_creates_snapshot_and_notifies_instructor() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "prof", "p@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "learner", "n@example.com", Role::User).await;
        let course = seed_course(&state.db, instructor.id, "Deep Rust", Decimal::ZERO).await;
        let section_a = seed_content(&state.db, course.id, "Intro", 1).await;
        let section_b = seed_content(&state.db, course.id, "Lifetimes", 2).await;
        seed_lecture(&state.db, section_a.id, "Welcome", 1).await;
        seed_lecture(&state.db, section_a.id, "Setup", 2).await;
        seed_lecture(&state.db, section_b.id, "Borrowck", 1).await;

        let token = token_for(&state, &student);
        let response = server
            .post(&format!("/api/v1/courses/{}/enroll", course.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);

        // Both membership rows exist.
        assert!(CourseStudent::find_by_id((course.id, student.id))
            .one(&state.db)
            .await
            .unwrap()
            .is_some());
        assert!(UserCourse::find_by_id((student.id, course.id))
            .one(&state.db)
            .await
            .unwrap()
            .is_some());

        // The snapshot mirrors the outline, all flags off.
        let snapshot = Progress::find().one(&state.db).await.unwrap().unwrap();
        assert!(!snapshot.course_completed);
        assert_eq!(
            ProgressContent::find().count(&state.db).await.unwrap(),
            2
        );
        let lectures = ProgressLecture::find().all(&state.db).await.unwrap();
        assert_eq!(lectures.len(), 3);
        assert!(lectures.iter().all(|row| !row.completed));

        // Instructor got notified.
        let notifications = Notification::find().all(&state.db).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].user_id, instructor.id);
        assert!(!notifications[0].is_read);

        // Enrolling again is a conflict and adds nothing.
        let response = server
            .post(&format!("/api/v1/courses/{}/enroll", course.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(Progress::find().count(&state.db).await.unwrap(), 1);
        assert_eq!(Notification::find().count(&state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_enroll_repairs_partial_membership() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "prof2", "p2@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "half", "h@example.com", Role::User).await;
        let course = seed_course(&state.db, instructor.id, "Half Course", Decimal::ZERO).await;

        // Only one side of the membership exists.
        user_course::ActiveModel {
            user_id: Set(student.id),
            course_id: Set(course.id),
        }
        .insert(&state.db)
        .await
        .unwrap();

        let token = token_for(&state, &student);
        let response = server
            .post(&format!("/api/v1/courses/{}/enroll", course.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);

        assert!(CourseStudent::find_by_id((course.id, student.id))
            .one(&state.db)
            .await
            .unwrap()
            .is_some());
        assert_eq!(UserCourse::find().count(&state.db).await.unwrap(), 1);
        assert_eq!(Progress::find().count(&state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_enroll_repairs_roster_only_membership() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "prof3", "p3@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "other_half", "oh@example.com", Role::User).await;
        let course = seed_course(&state.db, instructor.id, "Roster Course", Decimal::ZERO).await;

        // The mirror image: on the course roster but not on the user's list.
        course_student::ActiveModel {
            course_id: Set(course.id),
            user_id: Set(student.id),
        }
        .insert(&state.db)
        .await
        .unwrap();

        let token = token_for(&state, &student);
        let response = server
            .post(&format!("/api/v1/courses/{}/enroll", course.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);

        assert!(UserCourse::find_by_id((student.id, course.id))
            .one(&state.db)
            .await
            .unwrap()
            .is_some());
        assert_eq!(CourseStudent::find().count(&state.db).await.unwrap(), 1);
        assert_eq!(Progress::find().count(&state.db).await.unwrap(), 1);
    }

    async fn enroll_for_progress(
        server: &axum_test::TestServer,
        state: &crate::schemas::AppState,
    ) -> (String, i32, i32, i32, i32, i32) {
        let instructor = seed_user(&state.db, "prog", "pr@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "walker", "w@example.com", Role::User).await;
        let course = seed_course(&state.db, instructor.id, "Progress Course", Decimal::ZERO).await;
        let section = seed_content(&state.db, course.id, "Only Section", 1).await;
        let lecture_a = seed_lecture(&state.db, section.id, "First", 1).await;
        let lecture_b = seed_lecture(&state.db, section.id, "Second", 2).await;

        let token = token_for(state, &student);
        server
            .post(&format!("/api/v1/courses/{}/enroll", course.id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await
            .assert_status(StatusCode::OK);

        (
            token,
            student.id,
            course.id,
            section.id,
            lecture_a.id,
            lecture_b.id,
        )
    }

    #[tokio::test]
    async fn test_progress_roll_up() {
        let (server, state) = setup_test_app().await;
        let (token, _student_id, course_id, section_id, lecture_a, lecture_b) =
            enroll_for_progress(&server, &state).await;

        // First lecture done: section and course still open.
        let response = server
            .post("/api/v1/progress/mark-lecture-complete")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "courseId": course_id,
                "contentId": section_id,
                "lectureId": lecture_a
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<RollUp> = response.json();
        let roll_up = body.data.unwrap();
        assert!(!roll_up.content_completed);
        assert!(!roll_up.course_completed);

        // Marking the same lecture again is idempotent.
        let response = server
            .post("/api/v1/progress/mark-lecture-complete")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "courseId": course_id,
                "contentId": section_id,
                "lectureId": lecture_a
            }))
            .await;
        response.assert_status(StatusCode::OK);

        // Last lecture closes the section and the course.
        let response = server
            .post("/api/v1/progress/mark-lecture-complete")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "courseId": course_id,
                "contentId": section_id,
                "lectureId": lecture_b
            }))
            .await;
        let body: ApiResponse<RollUp> = response.json();
        let roll_up = body.data.unwrap();
        assert!(roll_up.content_completed);
        assert!(roll_up.course_completed);

        let snapshot = Progress::find()
            .filter(progress::Column::CourseId.eq(course_id))
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert!(snapshot.course_completed);
    }

    #[tokio::test]
    async fn test_progress_unknown_ids_leave_snapshot_untouched() {
        let (server, state) = setup_test_app().await;
        let (token, _student_id, course_id, section_id, _lecture_a, _lecture_b) =
            enroll_for_progress(&server, &state).await;

        let response = server
            .post("/api/v1/progress/mark-lecture-complete")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "courseId": course_id,
                "contentId": section_id,
                "lectureId": 99999
            }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let flags = ProgressLecture::find().all(&state.db).await.unwrap();
        assert!(flags.iter().all(|row| !row.completed));

        // No snapshot at all is also a 404.
        let stranger = seed_user(&state.db, "stray", "st@example.com", Role::User).await;
        let stranger_token = token_for(&state, &stranger);
        let response = server
            .post("/api/v1/progress/mark-lecture-complete")
            .add_header(header::AUTHORIZATION, bearer(&stranger_token))
            .json(&json!({
                "courseId": course_id,
                "contentId": section_id,
                "lectureId": 1
            }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_content_delete_keeps_snapshot_rows() {
        let (server, state) = setup_test_app().await;
        let (_token, _student_id, _course_id, section_id, _lecture_a, _lecture_b) =
            enroll_for_progress(&server, &state).await;

        let instructor = User::find()
            .filter(model::entities::user::Column::Username.eq("prog"))
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        let token = token_for(&state, &instructor);

        let response = server
            .delete(&format!("/api/v1/contents/{section_id}"))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);

        // Catalog rows are gone, the student's snapshot is not.
        assert_eq!(Content::find().count(&state.db).await.unwrap(), 0);
        assert_eq!(Lecture::find().count(&state.db).await.unwrap(), 0);
        assert_eq!(
            ProgressLecture::find().count(&state.db).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_delete_missing_content_is_not_found_without_side_effects() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "gone", "g@example.com", Role::Instructor).await;
        let course = seed_course(&state.db, instructor.id, "Stable Course", Decimal::ZERO).await;
        let section = seed_content(&state.db, course.id, "Kept Section", 1).await;
        seed_lecture(&state.db, section.id, "Kept Lecture", 1).await;

        let token = token_for(&state, &instructor);
        let response = server
            .delete("/api/v1/contents/4242")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        assert_eq!(Content::find().count(&state.db).await.unwrap(), 1);
        assert_eq!(Lecture::find().count(&state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_free_order_completes_immediately() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "seller", "se@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "buyer", "b@example.com", Role::User).await;
        let course = seed_course(&state.db, instructor.id, "Free Course", Decimal::ZERO).await;

        let token = token_for(&state, &student);
        let response = server
            .post("/api/v1/orders")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "courseId": course.id }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<String> = response.json();
        assert_eq!(body.data.unwrap(), "free");

        let order = Order::find().one(&state.db).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.transaction_id, "free");

        // A completed order blocks a second purchase.
        let response = server
            .post("/api/v1/orders")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "courseId": course.id }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        // The buyer sees the order in their history; the seller does not.
        let response = server
            .get("/api/v1/orders")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<OrderResponse>> = response.json();
        let orders = body.data.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].course_id, course.id);
        assert_eq!(orders[0].status, "completed");
        assert_eq!(orders[0].transaction_id, "free");

        let seller_token = token_for(&state, &instructor);
        let response = server
            .get("/api/v1/orders")
            .add_header(header::AUTHORIZATION, bearer(&seller_token))
            .await;
        let body: ApiResponse<Vec<OrderResponse>> = response.json();
        assert!(body.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paid_order_webhook_settles_once() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "seller2", "s2@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "buyer2", "b2@example.com", Role::User).await;
        let course =
            seed_course(&state.db, instructor.id, "Paid Course", Decimal::new(4999, 2)).await;

        let token = token_for(&state, &student);
        let response = server
            .post("/api/v1/orders")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "courseId": course.id }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<String> = response.json();
        let checkout_url = body.data.expect("checkout url missing");
        let session_id = checkout_url.rsplit('/').next().unwrap().to_string();
        assert!(session_id.starts_with("cs_"));

        let order = Order::find().one(&state.db).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let event = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "id": session_id } }
        });
        let response = server.post("/api/v1/orders/webhook").json(&event).await;
        response.assert_status(StatusCode::OK);

        let order = Order::find().one(&state.db).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        let course_row = Course::find_by_id(course.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(course_row.total_sales, 1);

        // Replaying the event finds no pending order and changes nothing.
        let response = server.post("/api/v1/orders/webhook").json(&event).await;
        response.assert_status(StatusCode::OK);
        let course_row = Course::find_by_id(course.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(course_row.total_sales, 1);

        // Unknown sessions are acknowledged without side effects.
        let response = server
            .post("/api/v1/orders/webhook")
            .json(&json!({
                "type": "checkout.session.completed",
                "data": { "object": { "id": "cs_unknown" } }
            }))
            .await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_pending_orders_settle_only_once() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "seller4", "s4@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "buyer4", "b4@example.com", Role::User).await;
        let course =
            seed_course(&state.db, instructor.id, "Twice Course", Decimal::new(1999, 2)).await;

        // Only completed orders block a purchase, so a second checkout for
        // the same course leaves two pending orders behind.
        let token = token_for(&state, &student);
        let mut session_ids = Vec::new();
        for _ in 0..2 {
            let response = server
                .post("/api/v1/orders")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .json(&json!({ "courseId": course.id }))
                .await;
            response.assert_status(StatusCode::CREATED);
            let body: ApiResponse<String> = response.json();
            session_ids.push(body.data.unwrap().rsplit('/').next().unwrap().to_string());
        }

        for session_id in &session_ids {
            let response = server
                .post("/api/v1/orders/webhook")
                .json(&json!({
                    "type": "checkout.session.completed",
                    "data": { "object": { "id": session_id } }
                }))
                .await;
            response.assert_status(StatusCode::OK);
        }

        // One sale, not two; the duplicate order is settled as failed.
        let orders = Order::find().all(&state.db).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(
            orders
                .iter()
                .filter(|o| o.status == OrderStatus::Completed)
                .count(),
            1
        );
        assert_eq!(
            orders
                .iter()
                .filter(|o| o.status == OrderStatus::Failed)
                .count(),
            1
        );
        let course_row = Course::find_by_id(course.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(course_row.total_sales, 1);
    }

    #[tokio::test]
    async fn test_failed_payment_marks_order_failed() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "seller3", "s3@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "buyer3", "b3@example.com", Role::User).await;
        let course =
            seed_course(&state.db, instructor.id, "Flaky Course", Decimal::new(999, 2)).await;

        let token = token_for(&state, &student);
        let response = server
            .post("/api/v1/orders")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "courseId": course.id }))
            .await;
        let body: ApiResponse<String> = response.json();
        let session_id = body
            .data
            .unwrap()
            .rsplit('/')
            .next()
            .unwrap()
            .to_string();

        let response = server
            .post("/api/v1/orders/webhook")
            .json(&json!({
                "type": "checkout.session.async_payment_failed",
                "data": { "object": { "id": session_id } }
            }))
            .await;
        response.assert_status(StatusCode::OK);

        let order = Order::find().one(&state.db).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        let course_row = Course::find_by_id(course.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(course_row.total_sales, 0);
    }

    #[tokio::test]
    async fn test_reviews_lifecycle() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "rated", "r@example.com", Role::Instructor).await;
        let reviewer = seed_user(&state.db, "fan", "f@example.com", Role::User).await;
        let outsider = seed_user(&state.db, "out", "ou@example.com", Role::User).await;
        let course = seed_course(&state.db, instructor.id, "Rated Course", Decimal::ZERO).await;

        let reviewer_token = token_for(&state, &reviewer);
        let outsider_token = token_for(&state, &outsider);

        // Reviewing without enrolling is forbidden.
        let response = server
            .post("/api/v1/reviews")
            .add_header(header::AUTHORIZATION, bearer(&outsider_token))
            .json(&json!({ "courseId": course.id, "rating": 5, "review": "great" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        server
            .post(&format!("/api/v1/courses/{}/enroll", course.id))
            .add_header(header::AUTHORIZATION, bearer(&reviewer_token))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .post("/api/v1/reviews")
            .add_header(header::AUTHORIZATION, bearer(&reviewer_token))
            .json(&json!({ "courseId": course.id, "rating": 4, "review": "solid" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<ReviewResponse> = response.json();
        let review = body.data.unwrap();

        // Course rating reflects the review.
        let course_row = Course::find_by_id(course.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(course_row.ratings, Decimal::from(4));

        // One review per user per course.
        let response = server
            .post("/api/v1/reviews")
            .add_header(header::AUTHORIZATION, bearer(&reviewer_token))
            .json(&json!({ "courseId": course.id, "rating": 5, "review": "again" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        // Someone else cannot edit the review.
        let response = server
            .patch(&format!("/api/v1/reviews/{}", review.id))
            .add_header(header::AUTHORIZATION, bearer(&outsider_token))
            .json(&json!({ "rating": 1 }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        // The author can, and the average follows.
        let response = server
            .patch(&format!("/api/v1/reviews/{}", review.id))
            .add_header(header::AUTHORIZATION, bearer(&reviewer_token))
            .json(&json!({ "rating": 2 }))
            .await;
        response.assert_status(StatusCode::OK);
        let course_row = Course::find_by_id(course.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(course_row.ratings, Decimal::from(2));

        // The course instructor replies; another instructor may not.
        let foreign = seed_user(&state.db, "foreign", "fo@example.com", Role::Instructor).await;
        let foreign_token = token_for(&state, &foreign);
        let response = server
            .post(&format!("/api/v1/reviews/reply/{}", review.id))
            .add_header(header::AUTHORIZATION, bearer(&foreign_token))
            .json(&json!({ "reply": "not mine" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let instructor_token = token_for(&state, &instructor);
        let response = server
            .post(&format!("/api/v1/reviews/reply/{}", review.id))
            .add_header(header::AUTHORIZATION, bearer(&instructor_token))
            .json(&json!({ "reply": "thanks!" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<ReviewResponse> = response.json();
        let replied = body.data.unwrap();
        assert_eq!(replied.reply.as_deref(), Some("thanks!"));
        assert_eq!(replied.replied_by, Some(instructor.id));

        // Listing reflects the latest state; omitting the course is a miss.
        let response = server
            .get(&format!("/api/v1/reviews?course={}", course.id))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<ReviewResponse>> = response.json();
        let reviews = body.data.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 2);

        let response = server.get("/api/v1/reviews").await;
        response.assert_status(StatusCode::NOT_FOUND);

        // A malformed course value still renders the envelope.
        let response = server.get("/api/v1/reviews?course=abc").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ApiResponse<Vec<ReviewResponse>> = response.json();
        assert_eq!(body.status_code, 400);
        assert!(body.data.is_none());

        // Single review lookup is public.
        let response = server.get(&format!("/api/v1/reviews/{}", review.id)).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<ReviewResponse> = response.json();
        assert_eq!(body.data.unwrap().reply.as_deref(), Some("thanks!"));

        let response = server.get("/api/v1/reviews/9999").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_mark_as_read() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "noti", "no@example.com", Role::Instructor).await;
        let student = seed_user(&state.db, "pupil", "pu@example.com", Role::User).await;
        let course = seed_course(&state.db, instructor.id, "Notify Course", Decimal::ZERO).await;

        let student_token = token_for(&state, &student);
        server
            .post(&format!("/api/v1/courses/{}/enroll", course.id))
            .add_header(header::AUTHORIZATION, bearer(&student_token))
            .await
            .assert_status(StatusCode::OK);

        let instructor_token = token_for(&state, &instructor);
        let response = server
            .get("/api/v1/notifications")
            .add_header(header::AUTHORIZATION, bearer(&instructor_token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<NotificationResponse>> = response.json();
        let notifications = body.data.unwrap();
        assert_eq!(notifications.len(), 1);
        assert!(!notifications[0].is_read);

        let response = server
            .put("/api/v1/notifications/mark-as-read")
            .add_header(header::AUTHORIZATION, bearer(&instructor_token))
            .await;
        response.assert_status(StatusCode::OK);

        let response = server
            .get("/api/v1/notifications")
            .add_header(header::AUTHORIZATION, bearer(&instructor_token))
            .await;
        let body: ApiResponse<Vec<NotificationResponse>> = response.json();
        let notifications = body.data.unwrap();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].is_read);
    }

    #[tokio::test]
    async fn test_lecture_crud_through_api() {
        let (server, state) = setup_test_app().await;
        let instructor = seed_user(&state.db, "builder", "bu@example.com", Role::Instructor).await;
        let course = seed_course(&state.db, instructor.id, "Built Course", Decimal::ZERO).await;
        let token = token_for(&state, &instructor);

        let response = server
            .post("/api/v1/contents")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "title": "Module One",
                "description": "Basics",
                "order": 1,
                "courseId": course.id
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        let content_id = body.data.unwrap()["id"].as_i64().unwrap();

        let response = server
            .post("/api/v1/lectures")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "title": "Hello World",
                "description": "First lecture",
                "order": 1,
                "videoUrl": "https://videos.example.com/hello.mp4",
                "duration": "05:00",
                "contentId": content_id,
                "resources": ["https://example.com/slides.pdf"]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        let lecture = body.data.unwrap();
        let lecture_id = lecture["id"].as_i64().unwrap();
        assert_eq!(lecture["resources"][0], "https://example.com/slides.pdf");

        let response = server
            .patch(&format!("/api/v1/lectures/{lecture_id}"))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "isPreview": true }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data.unwrap()["isPreview"], true);

        let response = server
            .delete(&format!("/api/v1/lectures/{lecture_id}"))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        assert_eq!(Lecture::find().count(&state.db).await.unwrap(), 0);

        // Editing catalog rows is off-limits for plain users.
        let student = seed_user(&state.db, "plain", "pl@example.com", Role::User).await;
        let student_token = token_for(&state, &student);
        let response = server
            .delete(&format!("/api/v1/contents/{content_id}"))
            .add_header(header::AUTHORIZATION, bearer(&student_token))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }
}
