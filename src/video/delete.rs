//! Bulk delete with cascades to attachments and parent activity entries.

use super::error::VideoError;
use super::VideoRepository;
use crate::activities::remove_ids;
use crate::constants::{ACTIVITY_VIDEO_IDS_META, VIDEO_MEDIA_TYPE};
use crate::orm::videos;
use crate::permission::Caller;
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, Condition};
use std::fmt::Display;

/// Equality filters selecting the videos to delete.
/// Zero ids and empty strings do not filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteFilter {
    pub id: Option<i32>,
    pub blog_id: Option<i32>,
    pub attachment_id: Option<i32>,
    pub user_id: Option<i32>,
    pub title: Option<String>,
    pub album_id: Option<i32>,
    pub activity_id: Option<i32>,
    pub group_id: Option<i32>,
    pub privacy: Option<String>,
    pub date_created: Option<NaiveDateTime>,
}

impl DeleteFilter {
    pub fn by_id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_attachment(attachment_id: i32) -> Self {
        Self {
            attachment_id: Some(attachment_id),
            ..Default::default()
        }
    }

    pub fn by_activity(activity_id: i32) -> Self {
        Self {
            activity_id: Some(activity_id),
            ..Default::default()
        }
    }

    /// Condition matching the filter, or `None` when no filter is set.
    pub fn condition(&self) -> Option<Condition> {
        let mut condition = Condition::all();
        let mut filtered = false;

        let ints = [
            (videos::Column::Id, self.id),
            (videos::Column::BlogId, self.blog_id),
            (videos::Column::AttachmentId, self.attachment_id),
            (videos::Column::UserId, self.user_id),
            (videos::Column::AlbumId, self.album_id),
            (videos::Column::ActivityId, self.activity_id),
            (videos::Column::GroupId, self.group_id),
        ];
        for (column, value) in ints {
            if let Some(value) = value.filter(|v| *v != 0) {
                condition = condition.add(column.eq(value));
                filtered = true;
            }
        }

        let texts = [
            (videos::Column::Title, &self.title),
            (videos::Column::Privacy, &self.privacy),
        ];
        for (column, value) in texts {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                condition = condition.add(column.eq(value));
                filtered = true;
            }
        }

        if let Some(date_created) = self.date_created {
            condition = condition.add(videos::Column::DateCreated.eq(date_created));
            filtered = true;
        }

        if filtered {
            Some(condition)
        } else {
            None
        }
    }
}

/// Where a delete was triggered from. Used to keep cascades from looping back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOrigin {
    /// Deleting the activity entry the videos were posted with.
    Activity,
    /// Deleting the attachment the videos wrap.
    Attachment,
}

fn distinct_nonzero(values: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut out = Vec::new();
    for value in values.filter(|v| *v != 0) {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn logged<T, E: Display>(result: Result<T, E>, what: &str, id: i32) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Failed to {} {} while deleting videos: {}", what, id, e);
            None
        }
    }
}

impl VideoRepository {
    /// Delete every video matching `filter`.
    ///
    /// Returns the deleted ids, or `None` when the filter is empty or nothing
    /// matched. Cascade failures are logged and do not affect the result.
    pub async fn delete(
        &self,
        filter: &DeleteFilter,
        origin: Option<DeleteOrigin>,
        caller: &Caller,
    ) -> Result<Option<Vec<i32>>, VideoError> {
        let condition = match filter.condition() {
            Some(condition) => condition.add(videos::Column::MediaType.eq(VIDEO_MEDIA_TYPE)),
            None => {
                log::warn!("Refusing to delete videos without a filter");
                return Ok(None);
            }
        };

        let deleting = videos::Entity::find()
            .filter(condition.clone())
            .all(&self.db)
            .await?;

        self.hooks.before_delete(&deleting, filter);

        let res = videos::Entity::delete_many()
            .filter(condition)
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Ok(None);
        }

        let video_ids = distinct_nonzero(deleting.iter().map(|v| v.id));
        self.invalidate(&video_ids);

        self.hooks.after_delete(&deleting, filter);

        let mut activity_ids = distinct_nonzero(deleting.iter().map(|v| v.activity_id));
        let attachment_ids = distinct_nonzero(deleting.iter().map(|v| v.attachment_id));

        for attachment_id in attachment_ids {
            self.cascade_attachment(attachment_id, &video_ids, origin, &mut activity_ids)
                .await;
        }

        for activity_id in activity_ids {
            self.cascade_activity(activity_id, origin, caller).await;
        }

        log::info!("Deleted videos {:?}", video_ids);
        Ok(Some(video_ids))
    }

    async fn cascade_attachment(
        &self,
        attachment_id: i32,
        video_ids: &[i32],
        origin: Option<DeleteOrigin>,
        activity_ids: &mut Vec<i32>,
    ) {
        let parent_id = logged(
            self.attachments.parent_activity_id(attachment_id).await,
            "read parent activity of attachment",
            attachment_id,
        )
        .flatten();

        if let Some(parent_id) = parent_id {
            let listed = logged(
                self.activities
                    .get_meta(parent_id, ACTIVITY_VIDEO_IDS_META)
                    .await,
                "read video ids of activity",
                parent_id,
            )
            .flatten()
            .filter(|list| !list.trim().is_empty());

            if let Some(listed) = listed {
                match remove_ids(&listed, video_ids) {
                    Some(remaining) => {
                        logged(
                            self.activities
                                .update_meta(parent_id, ACTIVITY_VIDEO_IDS_META, &remaining)
                                .await,
                            "update video ids of activity",
                            parent_id,
                        );
                    }
                    None => {
                        if !activity_ids.contains(&parent_id) {
                            activity_ids.push(parent_id);
                        }
                    }
                }
            }
        }

        let thumbnails = logged(
            self.attachments.generated_thumbnail_ids(attachment_id).await,
            "read generated thumbnails of attachment",
            attachment_id,
        )
        .unwrap_or_default();
        for thumbnail_id in thumbnails {
            logged(
                self.attachments.delete(thumbnail_id).await,
                "delete thumbnail",
                thumbnail_id,
            );
        }

        let poster_id = logged(
            self.attachments.poster_id(attachment_id).await,
            "read poster of attachment",
            attachment_id,
        )
        .flatten();
        if let Some(poster_id) = poster_id {
            let is_image = logged(
                self.attachments.is_image(poster_id).await,
                "inspect poster",
                poster_id,
            )
            .unwrap_or(false);
            if is_image {
                logged(
                    self.attachments.delete(poster_id).await,
                    "delete poster",
                    poster_id,
                );
            }
        }

        if origin != Some(DeleteOrigin::Attachment) {
            logged(
                self.attachments.delete(attachment_id).await,
                "delete attachment",
                attachment_id,
            );
        }
    }

    async fn cascade_activity(&self, activity_id: i32, origin: Option<DeleteOrigin>, caller: &Caller) {
        let activity = match logged(
            self.activities.get_activity(activity_id).await,
            "load activity",
            activity_id,
        )
        .flatten()
        {
            Some(activity) => activity,
            None => return,
        };

        if !self.authorizer.can_delete(&activity, caller) {
            log::debug!(
                "User {} may not delete activity {}, leaving it in place",
                caller.user_id,
                activity.id
            );
            return;
        }

        self.hooks.before_activity_delete(&activity);

        let deleted = if activity.is_comment() {
            logged(
                self.activities
                    .delete_comment(activity.item_id, activity.id)
                    .await,
                "delete activity comment",
                activity.id,
            )
        } else if origin == Some(DeleteOrigin::Activity) {
            // The activity is already being deleted by whoever called us
            None
        } else {
            logged(
                self.activities
                    .delete_activity(activity.id, activity.user_id)
                    .await,
                "delete activity",
                activity.id,
            )
        };

        if deleted == Some(true) {
            self.hooks.after_activity_delete(activity.id, activity.user_id);
        }
    }
}
