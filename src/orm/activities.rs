//! SeaORM Entity for activity stream entries

use crate::constants::ACTIVITY_COMMENT_TYPE;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bp_activity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub component: String,
    #[sea_orm(column_name = "type")]
    pub activity_type: String,

    // For comments `item_id` is the root activity and `secondary_item_id` the
    // direct parent (root or another comment).
    pub item_id: i32,
    pub secondary_item_id: i32,

    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub date_recorded: DateTime,
}

impl Model {
    /// Whether this entry is a reply to another activity rather than a top-level post.
    pub fn is_comment(&self) -> bool {
        self.activity_type == ACTIVITY_COMMENT_TYPE
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::activity_meta::Entity")]
    Meta,
}

impl Related<super::activity_meta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meta.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
