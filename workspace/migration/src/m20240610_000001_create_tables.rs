use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string_null(Users::Avatar))
                    .col(string_len(Users::Role, 20).default("user"))
                    .col(boolean(Users::IsVerified).default(false))
                    .col(string_null(Users::ResetPasswordToken))
                    .to_owned(),
            )
            .await?;

        // Create courses table
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(pk_auto(Courses::Id))
                    .col(string(Courses::Title).unique_key())
                    .col(string(Courses::Description))
                    .col(decimal(Courses::Price))
                    .col(decimal_null(Courses::EstimatedPrice))
                    .col(integer(Courses::Duration))
                    .col(string_null(Courses::Thumbnail))
                    .col(integer(Courses::InstructorId))
                    .col(string_null(Courses::Category))
                    .col(string(Courses::Language).default("English"))
                    .col(string_null(Courses::Tags))
                    .col(decimal(Courses::Ratings).default(0))
                    .col(boolean(Courses::IsPublished).default(false))
                    .col(boolean(Courses::IsFree).default(true))
                    .col(integer(Courses::TotalSales).default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_instructor")
                            .from(Courses::Table, Courses::InstructorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create course_students table (course-side membership list)
        manager
            .create_table(
                Table::create()
                    .table(CourseStudents::Table)
                    .if_not_exists()
                    .col(integer(CourseStudents::CourseId))
                    .col(integer(CourseStudents::UserId))
                    .primary_key(
                        Index::create()
                            .name("pk_course_students")
                            .col(CourseStudents::CourseId)
                            .col(CourseStudents::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_students_course")
                            .from(CourseStudents::Table, CourseStudents::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_students_user")
                            .from(CourseStudents::Table, CourseStudents::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create user_courses table (user-side membership list)
        manager
            .create_table(
                Table::create()
                    .table(UserCourses::Table)
                    .if_not_exists()
                    .col(integer(UserCourses::UserId))
                    .col(integer(UserCourses::CourseId))
                    .primary_key(
                        Index::create()
                            .name("pk_user_courses")
                            .col(UserCourses::UserId)
                            .col(UserCourses::CourseId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_courses_user")
                            .from(UserCourses::Table, UserCourses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_courses_course")
                            .from(UserCourses::Table, UserCourses::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create contents table
        manager
            .create_table(
                Table::create()
                    .table(Contents::Table)
                    .if_not_exists()
                    .col(pk_auto(Contents::Id))
                    .col(string(Contents::Title).unique_key())
                    .col(string(Contents::Description))
                    .col(integer(Contents::SortOrder))
                    .col(integer(Contents::CourseId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_content_course")
                            .from(Contents::Table, Contents::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create lectures table
        manager
            .create_table(
                Table::create()
                    .table(Lectures::Table)
                    .if_not_exists()
                    .col(pk_auto(Lectures::Id))
                    .col(string(Lectures::Title).unique_key())
                    .col(string(Lectures::Description))
                    .col(integer(Lectures::SortOrder))
                    .col(string(Lectures::VideoUrl))
                    .col(string(Lectures::Duration))
                    .col(boolean(Lectures::IsPreview).default(false))
                    .col(integer(Lectures::ContentId))
                    .col(string_null(Lectures::Resources))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lecture_content")
                            .from(Lectures::Table, Lectures::ContentId)
                            .to(Contents::Table, Contents::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create progress table. The nested snapshot tables reference the
        // catalog by plain ids on purpose: snapshots must survive catalog
        // edits untouched.
        manager
            .create_table(
                Table::create()
                    .table(Progress::Table)
                    .if_not_exists()
                    .col(pk_auto(Progress::Id))
                    .col(integer(Progress::UserId))
                    .col(integer(Progress::CourseId))
                    .col(boolean(Progress::CourseCompleted).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_progress_user")
                            .from(Progress::Table, Progress::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_progress_course")
                            .from(Progress::Table, Progress::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_progress_user_course")
                    .table(Progress::Table)
                    .col(Progress::UserId)
                    .col(Progress::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProgressContents::Table)
                    .if_not_exists()
                    .col(pk_auto(ProgressContents::Id))
                    .col(integer(ProgressContents::ProgressId))
                    .col(integer(ProgressContents::ContentId))
                    .col(boolean(ProgressContents::Completed).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_progress_contents_progress")
                            .from(ProgressContents::Table, ProgressContents::ProgressId)
                            .to(Progress::Table, Progress::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProgressLectures::Table)
                    .if_not_exists()
                    .col(pk_auto(ProgressLectures::Id))
                    .col(integer(ProgressLectures::ProgressContentId))
                    .col(integer(ProgressLectures::LectureId))
                    .col(boolean(ProgressLectures::Completed).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_progress_lectures_progress_content")
                            .from(ProgressLectures::Table, ProgressLectures::ProgressContentId)
                            .to(ProgressContents::Table, ProgressContents::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create notifications table
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(pk_auto(Notifications::Id))
                    .col(integer(Notifications::UserId))
                    .col(string(Notifications::Title))
                    .col(string(Notifications::Description))
                    .col(string(Notifications::Kind))
                    .col(boolean(Notifications::IsRead).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_user")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create orders table
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_auto(Orders::Id))
                    .col(integer(Orders::UserId))
                    .col(integer(Orders::CourseId))
                    .col(decimal(Orders::Amount))
                    .col(string_len(Orders::Status, 20).default("pending"))
                    .col(string(Orders::TransactionId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_user")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_course")
                            .from(Orders::Table, Orders::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create reviews table
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(integer(Reviews::UserId))
                    .col(integer(Reviews::CourseId))
                    .col(integer(Reviews::Rating))
                    .col(string(Reviews::Review))
                    .col(string_null(Reviews::Reply))
                    .col(integer_null(Reviews::RepliedBy))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_user")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_course")
                            .from(Reviews::Table, Reviews::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_user_course")
                    .table(Reviews::Table)
                    .col(Reviews::UserId)
                    .col(Reviews::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProgressLectures::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProgressContents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Progress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lectures::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserCourses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CourseStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Avatar,
    Role,
    IsVerified,
    ResetPasswordToken,
}

#[derive(DeriveIden)]
pub enum Courses {
    Table,
    Id,
    Title,
    Description,
    Price,
    EstimatedPrice,
    Duration,
    Thumbnail,
    InstructorId,
    Category,
    Language,
    Tags,
    Ratings,
    IsPublished,
    IsFree,
    TotalSales,
}

#[derive(DeriveIden)]
pub enum CourseStudents {
    Table,
    CourseId,
    UserId,
}

#[derive(DeriveIden)]
pub enum UserCourses {
    Table,
    UserId,
    CourseId,
}

#[derive(DeriveIden)]
pub enum Contents {
    Table,
    Id,
    Title,
    Description,
    SortOrder,
    CourseId,
}

#[derive(DeriveIden)]
pub enum Lectures {
    Table,
    Id,
    Title,
    Description,
    SortOrder,
    VideoUrl,
    Duration,
    IsPreview,
    ContentId,
    Resources,
}

#[derive(DeriveIden)]
pub enum Progress {
    Table,
    Id,
    UserId,
    CourseId,
    CourseCompleted,
}

#[derive(DeriveIden)]
pub enum ProgressContents {
    Table,
    Id,
    ProgressId,
    ContentId,
    Completed,
}

#[derive(DeriveIden)]
pub enum ProgressLectures {
    Table,
    Id,
    ProgressContentId,
    LectureId,
    Completed,
}

#[derive(DeriveIden)]
pub enum Notifications {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Kind,
    IsRead,
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    CourseId,
    Amount,
    Status,
    TransactionId,
}

#[derive(DeriveIden)]
pub enum Reviews {
    Table,
    Id,
    UserId,
    CourseId,
    Rating,
    Review,
    Reply,
    RepliedBy,
}
