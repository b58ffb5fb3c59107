//! Activity stream entries that videos are posted with.

use crate::constants::ACTIVITY_COMMENT_TYPE;
use crate::orm::{activities, activity_meta};
use async_trait::async_trait;
use sea_orm::{entity::*, query::*, Condition, DatabaseConnection, DbErr, Set};

pub use crate::orm::activities::Model as Activity;

/// Activity stream operations the video repository depends on.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    async fn get_activity(&self, activity_id: i32) -> Result<Option<Activity>, DbErr>;

    async fn get_meta(&self, activity_id: i32, key: &str) -> Result<Option<String>, DbErr>;

    async fn update_meta(&self, activity_id: i32, key: &str, value: &str) -> Result<(), DbErr>;

    /// Delete a top-level activity owned by `user_id`, with its comments and meta.
    async fn delete_activity(&self, activity_id: i32, user_id: i32) -> Result<bool, DbErr>;

    /// Delete a comment on the activity `root_id`, with the replies below it.
    async fn delete_comment(&self, root_id: i32, comment_id: i32) -> Result<bool, DbErr>;
}

/// Remove `deleted` from a comma-joined id list.
/// Entries that are not ids are kept as they are. Returns `None` when nothing is left.
pub fn remove_ids(list: &str, deleted: &[i32]) -> Option<String> {
    let remaining: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| match token.parse::<i32>() {
            Ok(id) => !deleted.contains(&id),
            Err(_) => true,
        })
        .collect();

    if remaining.is_empty() {
        None
    } else {
        Some(remaining.join(","))
    }
}

/// Activity feed backed by the activity tables.
pub struct SqlActivityFeed {
    db: DatabaseConnection,
}

impl SqlActivityFeed {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ids of `parent_id` and every reply below it.
    async fn comment_tree(&self, root_id: i32, parent_id: i32) -> Result<Vec<i32>, DbErr> {
        let mut tree = vec![parent_id];
        let mut frontier = vec![parent_id];

        while !frontier.is_empty() {
            let children: Vec<i32> = activities::Entity::find()
                .filter(activities::Column::ActivityType.eq(ACTIVITY_COMMENT_TYPE))
                .filter(activities::Column::ItemId.eq(root_id))
                .filter(activities::Column::SecondaryItemId.is_in(frontier.clone()))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|a| a.id)
                .filter(|id| !tree.contains(id))
                .collect();

            tree.extend(children.iter().copied());
            frontier = children;
        }

        Ok(tree)
    }

    async fn delete_rows(&self, ids: Vec<i32>) -> Result<u64, DbErr> {
        activity_meta::Entity::delete_many()
            .filter(activity_meta::Column::ActivityId.is_in(ids.clone()))
            .exec(&self.db)
            .await?;

        let res = activities::Entity::delete_many()
            .filter(activities::Column::Id.is_in(ids))
            .exec(&self.db)
            .await?;

        Ok(res.rows_affected)
    }
}

#[async_trait]
impl ActivityFeed for SqlActivityFeed {
    async fn get_activity(&self, activity_id: i32) -> Result<Option<Activity>, DbErr> {
        activities::Entity::find_by_id(activity_id).one(&self.db).await
    }

    async fn get_meta(&self, activity_id: i32, key: &str) -> Result<Option<String>, DbErr> {
        let meta = activity_meta::Entity::find()
            .filter(activity_meta::Column::ActivityId.eq(activity_id))
            .filter(activity_meta::Column::MetaKey.eq(key))
            .one(&self.db)
            .await?;

        Ok(meta.map(|m| m.meta_value))
    }

    async fn update_meta(&self, activity_id: i32, key: &str, value: &str) -> Result<(), DbErr> {
        let existing = activity_meta::Entity::find()
            .filter(activity_meta::Column::ActivityId.eq(activity_id))
            .filter(activity_meta::Column::MetaKey.eq(key))
            .one(&self.db)
            .await?;

        match existing {
            Some(meta) => {
                let mut meta: activity_meta::ActiveModel = meta.into();
                meta.meta_value = Set(value.to_string());
                meta.update(&self.db).await?;
            }
            None => {
                activity_meta::ActiveModel {
                    activity_id: Set(activity_id),
                    meta_key: Set(key.to_string()),
                    meta_value: Set(value.to_string()),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?;
            }
        }

        Ok(())
    }

    async fn delete_activity(&self, activity_id: i32, user_id: i32) -> Result<bool, DbErr> {
        let activity = activities::Entity::find()
            .filter(
                Condition::all()
                    .add(activities::Column::Id.eq(activity_id))
                    .add(activities::Column::UserId.eq(user_id)),
            )
            .one(&self.db)
            .await?;

        if activity.is_none() {
            return Ok(false);
        }

        let comment_ids: Vec<i32> = activities::Entity::find()
            .filter(activities::Column::ActivityType.eq(ACTIVITY_COMMENT_TYPE))
            .filter(activities::Column::ItemId.eq(activity_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let mut ids = vec![activity_id];
        ids.extend(comment_ids);

        let deleted = self.delete_rows(ids).await?;
        log::info!(
            "Deleted activity {} and {} comments",
            activity_id,
            deleted.saturating_sub(1)
        );
        Ok(deleted > 0)
    }

    async fn delete_comment(&self, root_id: i32, comment_id: i32) -> Result<bool, DbErr> {
        let ids = self.comment_tree(root_id, comment_id).await?;
        let deleted = self.delete_rows(ids).await?;

        log::info!(
            "Deleted comment {} on activity {} ({} rows)",
            comment_id,
            root_id,
            deleted
        );
        Ok(deleted > 0)
    }
}
