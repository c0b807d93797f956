use sea_orm::entity::prelude::*;

/// A catalog course. Contents hang off it as ordered children; students are
/// linked through `course_students`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub estimated_price: Option<Decimal>,
    /// Course length in hours.
    pub duration: i32,
    pub thumbnail: Option<String>,
    pub instructor_id: i32,
    pub category: Option<String>,
    #[sea_orm(default_value = "English")]
    pub language: String,
    /// JSON array of search tags.
    pub tags: Option<String>,
    pub ratings: Decimal,
    #[sea_orm(default_value = "false")]
    pub is_published: bool,
    #[sea_orm(default_value = "true")]
    pub is_free: bool,
    /// Incremented when a checkout completes.
    #[sea_orm(default_value = "0")]
    pub total_sales: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InstructorId",
        to = "super::user::Column::Id"
    )]
    Instructor,
    #[sea_orm(has_many = "super::content::Entity")]
    Content,
    #[sea_orm(has_many = "super::course_student::Entity")]
    CourseStudent,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
    #[sea_orm(has_many = "super::progress::Entity")]
    Progress,
}

impl Related<super::content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Content.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::course_student::Relation::User.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::course_student::Relation::Course.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
