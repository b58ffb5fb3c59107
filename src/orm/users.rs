//! SeaORM Entity for site users

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bp_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_login: String,
    /// URL-safe slug, also used to resolve search terms to a user.
    pub user_nicename: String,
    pub user_email: String,
    pub display_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
