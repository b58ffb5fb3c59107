use crate::orm::users;
use async_trait::async_trait;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use serde::Serialize;
use std::collections::HashMap;

/// User fields merged onto hydrated videos.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub user_email: String,
    pub user_nicename: String,
    pub user_login: String,
    pub display_name: String,
}

impl From<users::Model> for UserSummary {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            user_email: user.user_email,
            user_nicename: user.user_nicename,
            user_login: user.user_login,
            display_name: user.display_name,
        }
    }
}

/// User lookups the video repository depends on.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch every user in `ids` with a single lookup, keyed by id.
    async fn get_users(&self, ids: &[i32]) -> Result<HashMap<i32, UserSummary>, DbErr>;

    /// Resolve a user by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<UserSummary>, DbErr>;
}

/// User directory backed by the users table.
pub struct SqlUserDirectory {
    db: DatabaseConnection,
}

impl SqlUserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for SqlUserDirectory {
    async fn get_users(&self, ids: &[i32]) -> Result<HashMap<i32, UserSummary>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<UserSummary>, DbErr> {
        Ok(users::Entity::find()
            .filter(users::Column::UserNicename.eq(slug))
            .one(&self.db)
            .await?
            .map(UserSummary::from))
    }
}
