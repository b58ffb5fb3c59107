//! Video records stored in the shared media table.
//!
//! [`VideoRepository`] saves, lists and deletes videos. Listing goes through a
//! keyed WHERE clause that hooks and named scopes can extend, with id lists and
//! totals cached per query text and rows cached per id.

pub mod delete;
pub mod error;
pub mod hooks;
pub mod query;
pub mod scope;
pub mod sql;

pub use delete::{DeleteFilter, DeleteOrigin};
pub use error::{ErrorCode, ErrorMode, SaveErrors, VideoError};
pub use hooks::Hooks;
pub use query::{AttachmentData, Fields, Video, VideoItems, VideoPage, VideoQueryArgs};
pub use scope::{Compare, QueryOverrides, QueryValue, ScopeArgs, ScopeQuery, VideoQuery};
pub use sql::{AlbumFilter, Sort, SqlFragment, WhereClause};

use crate::activities::{ActivityFeed, SqlActivityFeed};
use crate::app_config::AppConfig;
use crate::attachment::{AttachmentStore, SqlAttachmentStore};
use crate::cache::{CachedValue, ObjectCache};
use crate::constants::VIDEO_MEDIA_TYPE;
use crate::orm::videos;
use crate::permission::{DeleteAuthorizer, OwnerOrModerator};
use crate::storage::StorageBackend;
use crate::user::{SqlUserDirectory, UserDirectory};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    entity::*,
    query::*,
    ActiveValue::{NotSet, Set, Unchanged},
    ConnectionTrait, DatabaseConnection,
};
use std::sync::Arc;

/// A video about to be saved. `id: None` inserts a new row.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoDraft {
    pub id: Option<i32>,
    pub blog_id: i32,
    pub attachment_id: i32,
    pub user_id: i32,
    pub title: String,
    pub album_id: i32,
    pub activity_id: i32,
    pub group_id: i32,
    pub privacy: String,
    pub menu_order: i32,
    pub date_created: NaiveDateTime,
    pub error_mode: ErrorMode,
}

impl Default for VideoDraft {
    fn default() -> Self {
        Self {
            id: None,
            blog_id: 1,
            attachment_id: 0,
            user_id: 0,
            title: String::new(),
            album_id: 0,
            activity_id: 0,
            group_id: 0,
            privacy: videos::Privacy::Public.to_string(),
            menu_order: 0,
            date_created: Utc::now().naive_utc(),
            error_mode: ErrorMode::Bool,
        }
    }
}

impl From<videos::Model> for VideoDraft {
    fn from(video: videos::Model) -> Self {
        Self {
            id: Some(video.id),
            blog_id: video.blog_id,
            attachment_id: video.attachment_id,
            user_id: video.user_id,
            title: video.title,
            album_id: video.album_id,
            activity_id: video.activity_id,
            group_id: video.group_id,
            privacy: video.privacy,
            menu_order: video.menu_order,
            date_created: video.date_created,
            error_mode: ErrorMode::Bool,
        }
    }
}

impl VideoDraft {
    fn into_active_model(self) -> videos::ActiveModel {
        videos::ActiveModel {
            id: match self.id {
                Some(id) => Unchanged(id),
                None => NotSet,
            },
            blog_id: Set(self.blog_id),
            attachment_id: Set(self.attachment_id),
            user_id: Set(self.user_id),
            title: Set(self.title),
            album_id: Set(self.album_id),
            activity_id: Set(self.activity_id),
            group_id: Set(self.group_id),
            privacy: Set(self.privacy),
            menu_order: Set(self.menu_order),
            date_created: Set(self.date_created),
            media_type: Set(VIDEO_MEDIA_TYPE.to_string()),
        }
    }
}

/// Persistence, listing and deletion of videos.
pub struct VideoRepository {
    pub(crate) db: DatabaseConnection,
    pub(crate) cache: ObjectCache,
    pub(crate) hooks: Hooks,
    pub(crate) attachments: Arc<dyn AttachmentStore>,
    pub(crate) activities: Arc<dyn ActivityFeed>,
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) authorizer: Arc<dyn DeleteAuthorizer>,
    pub(crate) video_group: String,
    pub(crate) count_group: String,
    pub(crate) require_activity_id: bool,
    pub(crate) placeholder_url: String,
}

impl VideoRepository {
    /// Repository backed by the SQL collaborators on the same connection.
    pub fn new(db: DatabaseConnection, config: &AppConfig, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            cache: ObjectCache::new(&config.cache),
            hooks: Hooks::new(config.video.include_user_search),
            attachments: Arc::new(SqlAttachmentStore::new(db.clone(), storage)),
            activities: Arc::new(SqlActivityFeed::new(db.clone())),
            users: Arc::new(SqlUserDirectory::new(db.clone())),
            authorizer: Arc::new(OwnerOrModerator),
            video_group: config.cache.video_group.clone(),
            count_group: config.cache.count_group.clone(),
            require_activity_id: config.video.require_activity_id,
            placeholder_url: config.site.placeholder_url(),
            db,
        }
    }

    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_activities(mut self, activities: Arc<dyn ActivityFeed>) -> Self {
        self.activities = activities;
        self
    }

    pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = users;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn DeleteAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Register hooks before the repository is shared.
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Insert or update a video and return its id.
    pub async fn save(&self, draft: VideoDraft) -> Result<i32, VideoError> {
        let mut draft = draft;
        let mut errors = SaveErrors::new();
        self.hooks.before_save(&mut draft, &mut errors);

        if draft.error_mode == ErrorMode::Structured && !errors.is_empty() {
            return Err(VideoError::Invalid(errors));
        }

        let mut invalid = SaveErrors::new();
        if draft.attachment_id == 0 {
            invalid.add(
                ErrorCode::MissingAttachment,
                "A video needs an attachment to be saved",
            );
        }
        if self.require_activity_id && draft.activity_id == 0 {
            invalid.add(
                ErrorCode::MissingActivity,
                "A video needs an activity to be saved",
            );
        }
        if !invalid.is_empty() {
            log::debug!("Rejected video draft: {}", invalid);
            return Err(match draft.error_mode {
                ErrorMode::Bool => VideoError::Rejected,
                ErrorMode::Structured => VideoError::Invalid(invalid),
            });
        }

        let updating = draft.id.is_some();
        let model = draft.into_active_model();
        let saved = if updating {
            model.update(&self.db).await?
        } else {
            model.insert(&self.db).await?
        };

        self.invalidate(&[saved.id]);
        self.hooks.after_save(&saved);

        log::debug!(
            "{} video {} for attachment {}",
            if updating { "Updated" } else { "Inserted" },
            saved.id,
            saved.attachment_id
        );
        Ok(saved.id)
    }

    /// Load a single video, from the row cache when possible.
    pub async fn find(&self, id: i32) -> Result<Option<videos::Model>, VideoError> {
        let key = id.to_string();
        if let Some(CachedValue::Video(video)) = self.cache.get(&key, &self.video_group) {
            return Ok(Some(video));
        }

        let video = videos::Entity::find_by_id(id)
            .filter(videos::Column::MediaType.eq(VIDEO_MEDIA_TYPE))
            .one(&self.db)
            .await?;

        if let Some(video) = &video {
            self.cache
                .set(&key, &self.video_group, CachedValue::Video(video.clone()));
        }
        Ok(video)
    }

    /// Compile the predicate and overrides of the given scopes.
    pub fn scope_query_sql(&self, scopes: &[String], args: &VideoQueryArgs) -> Option<ScopeQuery> {
        scope::scope_query_sql(&self.hooks, scopes, args)
    }

    /// `field IN ( ... )` with the items bound as values.
    pub fn in_operator_sql<S: AsRef<str>>(&self, field: &str, items: &[S]) -> Option<SqlFragment> {
        sql::in_operator_sql(field, items)
    }

    /// Drop cached rows of `ids` and retire every cached query.
    pub(crate) fn invalidate(&self, ids: &[i32]) {
        for id in ids {
            self.cache.delete(&id.to_string(), &self.video_group);
        }
        self.cache.invalidate_group(&self.video_group);
        if self.count_group != self.video_group {
            self.cache.invalidate_group(&self.count_group);
        }
    }
}
