use sea_orm::entity::prelude::*;

/// Snapshot of one lecture's completion flag. `lecture_id` has no foreign
/// key for the same reason as `progress_contents.content_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "progress_lectures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub progress_content_id: i32,
    pub lecture_id: i32,
    #[sea_orm(default_value = "false")]
    pub completed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::progress_content::Entity",
        from = "Column::ProgressContentId",
        to = "super::progress_content::Column::Id"
    )]
    ProgressContent,
}

impl Related<super::progress_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgressContent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
