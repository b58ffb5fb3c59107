//! SeaORM Entity for attachment meta key/value pairs

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bp_attachment_meta")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub attachment_id: i32,
    pub meta_key: String,
    #[sea_orm(column_type = "Text")]
    pub meta_value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attachments::Entity",
        from = "Column::AttachmentId",
        to = "super::attachments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Attachment,
}

impl Related<super::attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
