use sea_orm::entity::prelude::*;

/// Role carried in the auth token and checked by route allow-lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "instructor")]
    Instructor,
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// A platform account. Enrolled courses live in the `user_courses` link
/// table; the password is stored hashed and never leaves the service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub role: Role,
    #[sea_orm(default_value = "false")]
    pub is_verified: bool,
    pub reset_password_token: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Courses this user teaches.
    #[sea_orm(has_many = "super::course::Entity")]
    Course,
    #[sea_orm(has_many = "super::user_course::Entity")]
    UserCourse,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notification,
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
    #[sea_orm(has_many = "super::progress::Entity")]
    Progress,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_course::Relation::Course.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::user_course::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
