//! Listing videos: argument parsing, the id query, hydration and lookups.

use super::error::VideoError;
use super::scope::scope_query_sql;
use super::sql::{
    esc_like, join_ids, order_column, placeholders, AlbumFilter, Sort, SqlFragment, WhereClause,
};
use super::VideoRepository;
use crate::attachment::ImageSize;
use crate::cache::CachedValue;
use crate::constants::{DEFAULT_PER_PAGE, VIDEO_MEDIA_TYPE};
use crate::orm::videos::{self, Privacy};
use sea_orm::{entity::*, query::*, ConnectionTrait, EntityName, IdenStatic, Value};
use serde::Serialize;
use std::collections::HashMap;

/// Which shape `get` returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fields {
    #[default]
    All,
    Ids,
}

/// Arguments of [`VideoRepository::get`].
#[derive(Clone, Debug, PartialEq)]
pub struct VideoQueryArgs {
    /// Scope names. Entries may hold several comma separated names.
    pub scope: Vec<String>,
    /// 1-based page. Pagination needs both `page` and `per_page`.
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Upper bound for the reported total.
    pub max: Option<i64>,
    pub fields: Fields,
    /// `ASC` or `DESC`; anything else sorts descending.
    pub sort: String,
    /// Column name; unknown columns order by `date_created`.
    pub order_by: String,
    pub exclude: Vec<i32>,
    /// Restrict to these ids. Disables pagination.
    pub include: Vec<i32>,
    pub search_terms: Option<String>,
    pub album_id: Option<AlbumFilter>,
    pub user_id: Option<i32>,
    pub group_id: Option<i32>,
    pub privacy: Vec<Privacy>,
    pub activity_id: Option<i32>,
    /// Run a second query for the total number of matches.
    pub count_total: bool,
}

impl Default for VideoQueryArgs {
    fn default() -> Self {
        Self {
            scope: Vec::new(),
            page: Some(1),
            per_page: Some(DEFAULT_PER_PAGE),
            max: None,
            fields: Fields::All,
            sort: "DESC".to_string(),
            order_by: "date_created".to_string(),
            exclude: Vec::new(),
            include: Vec::new(),
            search_terms: None,
            album_id: None,
            user_id: None,
            group_id: None,
            privacy: Vec::new(),
            activity_id: None,
            count_total: false,
        }
    }
}

/// Thumbnail renditions shown for a video.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AttachmentData {
    pub full: String,
    pub thumb: String,
    pub activity_thumb: String,
    pub thumb_meta: Option<serde_json::Value>,
    pub mime_type: Option<String>,
}

/// A video row with the data derived from its attachment and author.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Video {
    #[serde(flatten)]
    pub record: videos::Model,
    pub attachment_data: AttachmentData,
    /// Direct link to the video file.
    pub video_link: Option<String>,
    pub user_email: Option<String>,
    pub user_nicename: Option<String>,
    pub user_login: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VideoItems {
    Ids(Vec<i32>),
    Full(Vec<Video>),
}

impl VideoItems {
    pub fn len(&self) -> usize {
        match self {
            Self::Ids(ids) => ids.len(),
            Self::Full(videos) => videos.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<i32> {
        match self {
            Self::Ids(ids) => ids.clone(),
            Self::Full(videos) => videos.iter().map(|v| v.record.id).collect(),
        }
    }
}

/// One page of [`VideoRepository::get`].
#[derive(Clone, Debug, PartialEq)]
pub struct VideoPage {
    pub videos: VideoItems,
    /// Only present when `count_total` was requested.
    pub total: Option<i64>,
    pub has_more_items: bool,
}

fn positive_ids(ids: &[i32]) -> Vec<i32> {
    let mut out: Vec<i32> = Vec::with_capacity(ids.len());
    for id in ids.iter().copied().filter(|id| *id > 0) {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

impl VideoRepository {
    /// Query videos.
    pub async fn get(&self, args: VideoQueryArgs) -> Result<VideoPage, VideoError> {
        let mut r = args;

        let scope_query = scope_query_sql(&self.hooks, &r.scope, &r);
        if let Some(scope_query) = &scope_query {
            scope_query.overrides.apply(&mut r);
        }

        let mut where_conditions = WhereClause::new();

        if let Some(terms) = r.search_terms.as_deref().filter(|t| !t.is_empty()) {
            let mut search_sql = SqlFragment::bound(
                "m.title LIKE ? ESCAPE '!'",
                vec![Value::from(format!("%{}%", esc_like(terms)))],
            );

            if self.hooks.include_user_search(&r) {
                if let Some(user) = self.users.find_by_slug(terms).await? {
                    search_sql =
                        search_sql.map_sql(|sql| format!("({} OR m.user_id = {})", sql, user.id));
                }
            }
            where_conditions.set("search_sql", search_sql);
        }

        let sort = Sort::parse(&r.sort);
        let order_column = order_column(&r.order_by);
        let order_by = format!("m.{}", order_column.as_str());

        let exclude = positive_ids(&r.exclude);
        if !exclude.is_empty() {
            where_conditions.set("exclude", format!("m.id NOT IN ({})", join_ids(&exclude)));
        }

        if !r.include.is_empty() {
            let include = positive_ids(&r.include);
            if include.is_empty() {
                // No video has a non-positive id
                where_conditions.set("in", "1 = 0");
            } else {
                where_conditions.set("in", format!("m.id IN ({})", join_ids(&include)));
            }
            r.page = None;
            r.per_page = None;
        }

        if let Some(activity_id) = r.activity_id.filter(|id| *id != 0) {
            where_conditions.set("activity", format!("m.activity_id = {}", activity_id));
        }

        if let Some(album) = r.album_id {
            where_conditions.set("album", album.sql());
        }

        if let Some(user_id) = r.user_id.filter(|id| *id != 0) {
            where_conditions.set("user", format!("m.user_id = {}", user_id));
        }

        if let Some(group_id) = r.group_id.filter(|id| *id != 0) {
            where_conditions.set("group", format!("m.group_id = {}", group_id));
        }

        if !r.privacy.is_empty() {
            let privacy: Vec<Value> = r
                .privacy
                .iter()
                .map(|p| Value::from(p.as_str().to_string()))
                .collect();
            where_conditions.set(
                "privacy",
                SqlFragment::bound(
                    format!("m.privacy IN ({})", placeholders(privacy.len())),
                    privacy,
                ),
            );
        }

        self.hooks.where_conditions(&mut where_conditions, &r);
        where_conditions.set(
            "type",
            SqlFragment::bound("m.type = ?", vec![Value::from(VIDEO_MEDIA_TYPE)]),
        );

        let where_sql = match scope_query.and_then(|q| q.sql) {
            Some(scope_sql) => SqlFragment::join([where_conditions.join(), scope_sql], " ) AND ( ")
                .map_sql(|sql| format!("WHERE ( {} )", sql)),
            None => where_conditions.join().map_sql(|sql| format!("WHERE {}", sql)),
        };

        let join_sql = self.hooks.join_sql(String::new(), &r, &where_sql.sql);

        // DISTINCT needs the sort column in the select list on some backends
        let select_sql = match order_column {
            videos::Column::Id => "SELECT DISTINCT m.id".to_string(),
            column => format!("SELECT DISTINCT m.id, m.{}", column.as_str()),
        };
        let from_sql = format!("FROM {} m", videos::Entity.table_name());

        let mut ids_sql = format!(
            "{} {} {} {} ORDER BY {} {}, m.id {}",
            select_sql, from_sql, join_sql, where_sql.sql, order_by, sort, sort
        );

        let page = u64::from(r.page.unwrap_or(0));
        let per_page = u64::from(r.per_page.unwrap_or(0));
        let paginated = page > 0 && per_page > 0;
        if paginated {
            // One extra row tells whether another page exists
            ids_sql.push_str(&format!(
                " LIMIT {} OFFSET {}",
                per_page + 1,
                (page - 1) * per_page
            ));
        }

        let ids_query = SqlFragment::bound(
            self.hooks.paged_sql(ids_sql, &r),
            where_sql.values.clone(),
        );

        let mut video_ids = self.cached_ids(ids_query).await?;

        let has_more_items = paginated && video_ids.len() as u64 > per_page;
        if has_more_items {
            video_ids.truncate(per_page as usize);
        }

        let videos = match r.fields {
            Fields::Ids => VideoItems::Ids(video_ids),
            Fields::All => {
                let mut videos = self.video_data(&video_ids).await?;
                self.hooks.prefetch(&mut videos);
                VideoItems::Full(videos)
            }
        };

        let total = if r.count_total {
            let total_sql = self.hooks.total_sql(
                format!(
                    "SELECT COUNT(DISTINCT m.id) AS total {} {} {}",
                    from_sql, join_sql, where_sql.sql
                ),
                &where_sql.sql,
                sort,
            );
            let total_query = SqlFragment::bound(total_sql, where_sql.values);
            let cache_key = total_query.cache_key();

            let mut total = match self.cache.get_incremented(&cache_key, &self.count_group) {
                Some(CachedValue::Count(total)) => total,
                _ => {
                    let total = self.query_count(total_query).await?;
                    self.cache.set_incremented(
                        &cache_key,
                        &self.count_group,
                        CachedValue::Count(total),
                    );
                    total
                }
            };

            if let Some(max) = r.max.filter(|max| *max > 0) {
                total = total.min(max);
            }
            Some(total)
        } else {
            None
        };

        Ok(VideoPage {
            videos,
            total,
            has_more_items,
        })
    }

    /// Run an id query through the incremented cache of the video group.
    async fn cached_ids(&self, query: SqlFragment) -> Result<Vec<i32>, VideoError> {
        let cache_key = query.cache_key();
        if let Some(CachedValue::Ids(ids)) = self.cache.get_incremented(&cache_key, &self.video_group)
        {
            return Ok(ids);
        }

        let ids = self.query_ids(query).await?;
        self.cache
            .set_incremented(&cache_key, &self.video_group, CachedValue::Ids(ids.clone()));
        Ok(ids)
    }

    async fn query_ids(&self, query: SqlFragment) -> Result<Vec<i32>, VideoError> {
        let backend = self.db.get_database_backend();
        let rows = self.db.query_all(query.into_statement(backend)).await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<i32>("", "id")?);
        }
        Ok(ids)
    }

    async fn query_count(&self, query: SqlFragment) -> Result<i64, VideoError> {
        let backend = self.db.get_database_backend();
        let row = self.db.query_one(query.into_statement(backend)).await?;

        match row {
            Some(row) => Ok(row.try_get::<i64>("", "total")?),
            None => Ok(0),
        }
    }

    /// Hydrate ids into full videos, keeping their order.
    async fn video_data(&self, video_ids: &[i32]) -> Result<Vec<Video>, VideoError> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut fetched: HashMap<i32, videos::Model> = HashMap::new();
        let uncached = self.cache.non_cached_ids(video_ids, &self.video_group);
        if !uncached.is_empty() {
            let rows = videos::Entity::find()
                .filter(videos::Column::Id.is_in(uncached))
                .all(&self.db)
                .await?;

            for row in rows {
                self.cache.set(
                    &row.id.to_string(),
                    &self.video_group,
                    CachedValue::Video(row.clone()),
                );
                fetched.insert(row.id, row);
            }
        }

        let mut videos = Vec::with_capacity(video_ids.len());
        for id in video_ids {
            let record = match self.cache.get(&id.to_string(), &self.video_group) {
                Some(CachedValue::Video(record)) => record,
                _ => match fetched.remove(id) {
                    Some(record) => record,
                    None => {
                        log::debug!("Video {} disappeared before it could be hydrated", id);
                        continue;
                    }
                },
            };

            let attachment_data = self.attachment_data(record.attachment_id).await?;
            let video_link = self.attachments.url(record.attachment_id).await?;

            videos.push(Video {
                record,
                attachment_data,
                video_link,
                user_email: None,
                user_nicename: None,
                user_login: None,
                display_name: None,
            });
        }

        let mut user_ids: Vec<i32> = videos.iter().map(|v| v.record.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let users = self.users.get_users(&user_ids).await?;
        for video in videos.iter_mut() {
            if let Some(user) = users.get(&video.record.user_id) {
                video.user_email = Some(user.user_email.clone());
                video.user_nicename = Some(user.user_nicename.clone());
                video.user_login = Some(user.user_login.clone());
                video.display_name = Some(user.display_name.clone());
            }
        }

        Ok(videos)
    }

    /// Poster first, then the first generated thumbnail, then the placeholder.
    async fn attachment_data(&self, attachment_id: i32) -> Result<AttachmentData, VideoError> {
        let mime_type = self.attachments.mime_type(attachment_id).await?;

        let thumb_id = match self.attachments.poster_id(attachment_id).await? {
            Some(poster_id) => Some(poster_id),
            None => self
                .attachments
                .generated_thumbnail_ids(attachment_id)
                .await?
                .into_iter()
                .next(),
        };

        let thumb_id = match thumb_id {
            Some(thumb_id) => thumb_id,
            None => {
                return Ok(AttachmentData {
                    full: self.placeholder_url.clone(),
                    thumb: self.placeholder_url.clone(),
                    activity_thumb: self.placeholder_url.clone(),
                    thumb_meta: None,
                    mime_type,
                })
            }
        };

        Ok(AttachmentData {
            full: self
                .attachments
                .image_url(thumb_id, ImageSize::Full)
                .await?
                .unwrap_or_default(),
            thumb: self
                .attachments
                .image_url(thumb_id, ImageSize::VideoThumbnail)
                .await?
                .unwrap_or_default(),
            activity_thumb: self
                .attachments
                .image_url(thumb_id, ImageSize::ActivityThumbnail)
                .await?
                .unwrap_or_default(),
            thumb_meta: self.attachments.image_metadata(thumb_id).await?,
            mime_type,
        })
    }

    /// Number of videos a user has within the given privacy levels.
    pub async fn total_video_count(
        &self,
        user_id: i32,
        privacy: &[Privacy],
    ) -> Result<u64, VideoError> {
        if privacy.is_empty() {
            return Ok(0);
        }

        let privacy: Vec<String> = privacy.iter().map(|p| p.as_str().to_string()).collect();
        let count = videos::Entity::find()
            .filter(videos::Column::UserId.eq(user_id))
            .filter(videos::Column::MediaType.eq(VIDEO_MEDIA_TYPE))
            .filter(videos::Column::Privacy.is_in(privacy))
            .count(&self.db)
            .await?;

        Ok(count as u64)
    }

    pub async fn total_group_video_count(&self, group_id: i32) -> Result<u64, VideoError> {
        let count = videos::Entity::find()
            .filter(videos::Column::GroupId.eq(group_id))
            .filter(videos::Column::MediaType.eq(VIDEO_MEDIA_TYPE))
            .count(&self.db)
            .await?;

        Ok(count as u64)
    }

    /// Ids of every video in an album.
    pub async fn album_video_ids(&self, album_id: i32) -> Result<Vec<i32>, VideoError> {
        if album_id == 0 {
            return Ok(Vec::new());
        }

        let query = SqlFragment::bound(
            format!(
                "SELECT DISTINCT m.id FROM {} m WHERE m.album_id = ? AND m.type = ?",
                videos::Entity.table_name()
            ),
            vec![Value::from(album_id), Value::from(VIDEO_MEDIA_TYPE)],
        );

        self.cached_ids(query).await
    }

    /// Video posted with an activity entry.
    pub async fn activity_video_id(&self, activity_id: i32) -> Result<Option<i32>, VideoError> {
        Ok(self.activity_video(activity_id).await?.map(|v| v.id))
    }

    /// Attachment of the video posted with an activity entry.
    pub async fn activity_attachment_id(
        &self,
        activity_id: i32,
    ) -> Result<Option<i32>, VideoError> {
        Ok(self
            .activity_video(activity_id)
            .await?
            .map(|v| v.attachment_id))
    }

    async fn activity_video(&self, activity_id: i32) -> Result<Option<videos::Model>, VideoError> {
        if activity_id == 0 {
            return Ok(None);
        }

        Ok(videos::Entity::find()
            .filter(videos::Column::ActivityId.eq(activity_id))
            .filter(videos::Column::MediaType.eq(VIDEO_MEDIA_TYPE))
            .order_by_asc(videos::Column::Id)
            .one(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = VideoQueryArgs::default();
        assert_eq!(args.page, Some(1));
        assert_eq!(args.per_page, Some(20));
        assert_eq!(args.fields, Fields::All);
        assert_eq!(args.sort, "DESC");
        assert_eq!(args.order_by, "date_created");
        assert!(!args.count_total);
    }

    #[test]
    fn test_positive_ids_drops_invalid_and_duplicates() {
        assert_eq!(positive_ids(&[3, 0, -1, 3, 8]), vec![3, 8]);
    }

    #[test]
    fn test_video_items_ids() {
        let items = VideoItems::Ids(vec![4, 2]);
        assert_eq!(items.len(), 2);
        assert_eq!(items.ids(), vec![4, 2]);
        assert!(VideoItems::Full(Vec::new()).is_empty());
    }
}
