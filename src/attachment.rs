//! Attachments wrapped by video records.
//!
//! A video row only references its upload by `attachment_id`. The poster image,
//! generated preview thumbnails and the link back to the posting activity are
//! kept as attachment meta.

use crate::constants::{
    ATTACHMENT_METADATA_META, VIDEO_PARENT_ACTIVITY_META, VIDEO_POSTER_META,
    VIDEO_PREVIEW_THUMBNAILS_META,
};
use crate::orm::{attachment_meta, attachments};
use crate::storage::{StorageBackend, StorageError};
use crate::video::sql::parse_id_list;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, Set};
use std::sync::Arc;

/// Image renditions generated for uploaded images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSize {
    Full,
    VideoThumbnail,
    ActivityThumbnail,
}

impl ImageSize {
    /// Key of the rendition inside the attachment metadata `sizes` map.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::VideoThumbnail => "bp-video-thumbnail",
            Self::ActivityThumbnail => "bp-activity-video-thumbnail",
        }
    }
}

/// Access to the attachments behind video records.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn mime_type(&self, attachment_id: i32) -> Result<Option<String>, StorageError>;

    /// Poster image explicitly chosen for a video.
    async fn poster_id(&self, attachment_id: i32) -> Result<Option<i32>, StorageError>;

    /// Thumbnails generated from the video, in preference order.
    async fn generated_thumbnail_ids(&self, attachment_id: i32)
        -> Result<Vec<i32>, StorageError>;

    /// URL of an image rendition. `None` when the attachment is not an image.
    async fn image_url(
        &self,
        attachment_id: i32,
        size: ImageSize,
    ) -> Result<Option<String>, StorageError>;

    async fn image_metadata(
        &self,
        attachment_id: i32,
    ) -> Result<Option<serde_json::Value>, StorageError>;

    /// Direct link to the uploaded file.
    async fn url(&self, attachment_id: i32) -> Result<Option<String>, StorageError>;

    async fn is_image(&self, attachment_id: i32) -> Result<bool, StorageError>;

    /// Activity the video was originally posted with.
    async fn parent_activity_id(&self, attachment_id: i32) -> Result<Option<i32>, StorageError>;

    /// Delete the attachment, its meta and every stored file.
    /// Returns `false` when the attachment did not exist.
    async fn delete(&self, attachment_id: i32) -> Result<bool, StorageError>;
}

/// Attachment store backed by the attachment tables and a [`StorageBackend`].
pub struct SqlAttachmentStore {
    db: DatabaseConnection,
    storage: Arc<dyn StorageBackend>,
}

impl SqlAttachmentStore {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageBackend>) -> Self {
        Self { db, storage }
    }

    /// Store an upload and register it as an attachment.
    pub async fn create(
        &self,
        user_id: i32,
        filename: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<attachments::Model, StorageError> {
        self.storage.put_object(data, filename).await?;

        let attachment = attachments::ActiveModel {
            user_id: Set(user_id),
            filename: Set(filename.to_string()),
            mime_type: Set(mime_type.to_string()),
            date_created: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        Ok(attachment.insert(&self.db).await?)
    }

    pub async fn get_meta(
        &self,
        attachment_id: i32,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        let meta = attachment_meta::Entity::find()
            .filter(attachment_meta::Column::AttachmentId.eq(attachment_id))
            .filter(attachment_meta::Column::MetaKey.eq(key))
            .one(&self.db)
            .await?;

        Ok(meta.map(|m| m.meta_value))
    }

    /// Insert or replace a meta value.
    pub async fn update_meta(
        &self,
        attachment_id: i32,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        let existing = attachment_meta::Entity::find()
            .filter(attachment_meta::Column::AttachmentId.eq(attachment_id))
            .filter(attachment_meta::Column::MetaKey.eq(key))
            .one(&self.db)
            .await?;

        match existing {
            Some(meta) => {
                let mut meta: attachment_meta::ActiveModel = meta.into();
                meta.meta_value = Set(value.to_string());
                meta.update(&self.db).await?;
            }
            None => {
                attachment_meta::ActiveModel {
                    attachment_id: Set(attachment_id),
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

    async fn find(&self, attachment_id: i32) -> Result<Option<attachments::Model>, StorageError> {
        Ok(attachments::Entity::find_by_id(attachment_id)
            .one(&self.db)
            .await?)
    }

    async fn meta_id(&self, attachment_id: i32, key: &str) -> Result<Option<i32>, StorageError> {
        Ok(self
            .get_meta(attachment_id, key)
            .await?
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|id| *id > 0))
    }
}

/// Stored file for a rendition, falling back to the original upload.
fn rendition_file(
    attachment: &attachments::Model,
    metadata: Option<&serde_json::Value>,
    size: ImageSize,
) -> String {
    metadata
        .and_then(|m| m.get("sizes"))
        .and_then(|sizes| sizes.get(size.name()))
        .and_then(|rendition| rendition.get("file"))
        .and_then(|file| file.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| attachment.filename.clone())
}

/// Every file stored for an attachment: the original plus its renditions.
fn stored_files(
    attachment: &attachments::Model,
    metadata: Option<&serde_json::Value>,
) -> Vec<String> {
    let mut files = vec![attachment.filename.clone()];
    if let Some(sizes) = metadata
        .and_then(|m| m.get("sizes"))
        .and_then(|s| s.as_object())
    {
        for rendition in sizes.values() {
            if let Some(file) = rendition.get("file").and_then(|f| f.as_str()) {
                if !files.iter().any(|f| f == file) {
                    files.push(file.to_string());
                }
            }
        }
    }
    files
}

#[async_trait]
impl AttachmentStore for SqlAttachmentStore {
    async fn mime_type(&self, attachment_id: i32) -> Result<Option<String>, StorageError> {
        Ok(self.find(attachment_id).await?.map(|a| a.mime_type))
    }

    async fn poster_id(&self, attachment_id: i32) -> Result<Option<i32>, StorageError> {
        self.meta_id(attachment_id, VIDEO_POSTER_META).await
    }

    async fn generated_thumbnail_ids(
        &self,
        attachment_id: i32,
    ) -> Result<Vec<i32>, StorageError> {
        Ok(self
            .get_meta(attachment_id, VIDEO_PREVIEW_THUMBNAILS_META)
            .await?
            .map(|ids| parse_id_list(&ids))
            .unwrap_or_default())
    }

    async fn image_url(
        &self,
        attachment_id: i32,
        size: ImageSize,
    ) -> Result<Option<String>, StorageError> {
        let attachment = match self.find(attachment_id).await? {
            Some(a) if a.is_image() => a,
            _ => return Ok(None),
        };
        let metadata = self.image_metadata(attachment_id).await?;
        let file = rendition_file(&attachment, metadata.as_ref(), size);

        Ok(Some(self.storage.public_url(&file)?))
    }

    async fn image_metadata(
        &self,
        attachment_id: i32,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        let raw = self.get_meta(attachment_id, ATTACHMENT_METADATA_META).await?;
        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(
                    "Attachment {} has unreadable metadata: {}",
                    attachment_id,
                    e
                );
                None
            }
        }))
    }

    async fn url(&self, attachment_id: i32) -> Result<Option<String>, StorageError> {
        match self.find(attachment_id).await? {
            Some(a) => Ok(Some(self.storage.public_url(&a.filename)?)),
            None => Ok(None),
        }
    }

    async fn is_image(&self, attachment_id: i32) -> Result<bool, StorageError> {
        Ok(self
            .find(attachment_id)
            .await?
            .map(|a| a.is_image())
            .unwrap_or(false))
    }

    async fn parent_activity_id(&self, attachment_id: i32) -> Result<Option<i32>, StorageError> {
        self.meta_id(attachment_id, VIDEO_PARENT_ACTIVITY_META).await
    }

    async fn delete(&self, attachment_id: i32) -> Result<bool, StorageError> {
        let attachment = match self.find(attachment_id).await? {
            Some(a) => a,
            None => return Ok(false),
        };
        let metadata = self.image_metadata(attachment_id).await?;

        for file in stored_files(&attachment, metadata.as_ref()) {
            if !self.storage.delete_object(&file).await? {
                log::debug!("Attachment {} file {} was already gone", attachment_id, file);
            }
        }

        attachment_meta::Entity::delete_many()
            .filter(attachment_meta::Column::AttachmentId.eq(attachment_id))
            .exec(&self.db)
            .await?;
        attachments::Entity::delete_many()
            .filter(attachments::Column::Id.eq(attachment_id))
            .exec(&self.db)
            .await?;

        log::info!("Deleted attachment {}", attachment_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn attachment(filename: &str) -> attachments::Model {
        attachments::Model {
            id: 1,
            user_id: 1,
            filename: filename.to_string(),
            mime_type: "image/jpeg".to_string(),
            date_created: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_rendition_file_prefers_named_size() {
        let metadata = serde_json::json!({
            "sizes": {
                "bp-video-thumbnail": { "file": "poster-400x300.jpg" }
            }
        });
        let a = attachment("poster.jpg");

        assert_eq!(
            rendition_file(&a, Some(&metadata), ImageSize::VideoThumbnail),
            "poster-400x300.jpg"
        );
        assert_eq!(
            rendition_file(&a, Some(&metadata), ImageSize::ActivityThumbnail),
            "poster.jpg"
        );
        assert_eq!(rendition_file(&a, None, ImageSize::Full), "poster.jpg");
    }

    #[test]
    fn test_stored_files_lists_original_and_renditions_once() {
        let metadata = serde_json::json!({
            "sizes": {
                "bp-video-thumbnail": { "file": "poster-400x300.jpg" },
                "bp-activity-video-thumbnail": { "file": "poster-400x300.jpg" },
                "full": { "file": "poster.jpg" }
            }
        });

        assert_eq!(
            stored_files(&attachment("poster.jpg"), Some(&metadata)),
            vec!["poster.jpg".to_string(), "poster-400x300.jpg".to_string()]
        );
    }
}
