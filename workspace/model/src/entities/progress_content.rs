use sea_orm::entity::prelude::*;

/// Snapshot of one content section for a progress document. `content_id`
/// deliberately carries no foreign key: the snapshot outlives catalog edits.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "progress_contents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub progress_id: i32,
    pub content_id: i32,
    #[sea_orm(default_value = "false")]
    pub completed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::progress::Entity",
        from = "Column::ProgressId",
        to = "super::progress::Column::Id"
    )]
    Progress,
    #[sea_orm(has_many = "super::progress_lecture::Entity")]
    ProgressLecture,
}

impl Related<super::progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Progress.def()
    }
}

impl Related<super::progress_lecture::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgressLecture.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
