//! Test fixtures for creating test data
#![allow(dead_code)]
#![allow(clippy::needless_update)]

use super::database::setup_test_database;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use social_video::activities::SqlActivityFeed;
use social_video::app_config::AppConfig;
use social_video::attachment::SqlAttachmentStore;
use social_video::orm::{activities, users};
use social_video::storage::local::LocalStorage;
use social_video::storage::StorageBackend;
use social_video::{VideoDraft, VideoRepository};
use std::sync::Arc;
use tempfile::TempDir;

/// Repository wired to SQL collaborators and a temporary upload directory
pub struct TestEnv {
    pub db: DatabaseConnection,
    pub repo: VideoRepository,
    pub storage: Arc<LocalStorage>,
    pub attachments: Arc<SqlAttachmentStore>,
    pub feed: Arc<SqlActivityFeed>,
    _uploads: TempDir,
}

pub async fn setup_env() -> TestEnv {
    setup_env_with(AppConfig::default()).await
}

pub async fn setup_env_with(mut config: AppConfig) -> TestEnv {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    config.storage.local_path = uploads.path().to_string_lossy().into_owned();

    let storage = Arc::new(
        LocalStorage::from_config(&config.storage).expect("Failed to create local storage"),
    );
    let attachments = Arc::new(SqlAttachmentStore::new(db.clone(), storage.clone()));
    let feed = Arc::new(SqlActivityFeed::new(db.clone()));

    let repo = VideoRepository::new(db.clone(), &config, storage.clone())
        .with_attachments(attachments.clone())
        .with_activities(feed.clone());

    TestEnv {
        db,
        repo,
        storage,
        attachments,
        feed,
        _uploads: uploads,
    }
}

impl TestEnv {
    /// Upload a file and register it as an attachment
    pub async fn attachment(&self, user_id: i32, filename: &str, mime_type: &str) -> i32 {
        self.attachments
            .create(user_id, filename, mime_type, filename.as_bytes().to_vec())
            .await
            .expect("Failed to create attachment")
            .id
    }

    pub async fn video_attachment(&self, user_id: i32, filename: &str) -> i32 {
        self.attachment(user_id, filename, "video/mp4").await
    }

    pub async fn file_exists(&self, filename: &str) -> bool {
        self.storage
            .exists(filename)
            .await
            .expect("Failed to check storage")
    }

    /// Save a video wrapping a fresh attachment
    pub async fn video(&self, draft: VideoDraft, filename: &str) -> i32 {
        let attachment_id = self.video_attachment(draft.user_id, filename).await;
        self.repo
            .save(VideoDraft {
                attachment_id,
                ..draft
            })
            .await
            .expect("Failed to save video")
    }
}

pub fn base_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Draft for `user_id`, created `minutes` after the base date
pub fn draft(user_id: i32, title: &str, minutes: i64) -> VideoDraft {
    VideoDraft {
        user_id,
        title: title.to_string(),
        date_created: base_date() + Duration::minutes(minutes),
        ..Default::default()
    }
}

pub async fn create_test_user(
    db: &DatabaseConnection,
    login: &str,
    display_name: &str,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        user_login: Set(login.to_string()),
        user_nicename: Set(login.to_lowercase()),
        user_email: Set(format!("{}@test.com", login.to_lowercase())),
        display_name: Set(display_name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_activity(
    db: &DatabaseConnection,
    user_id: i32,
    activity_type: &str,
    item_id: i32,
    secondary_item_id: i32,
) -> Result<activities::Model, DbErr> {
    activities::ActiveModel {
        user_id: Set(user_id),
        component: Set("activity".to_string()),
        activity_type: Set(activity_type.to_string()),
        item_id: Set(item_id),
        secondary_item_id: Set(secondary_item_id),
        content: Set(String::new()),
        date_recorded: Set(base_date()),
        ..Default::default()
    }
    .insert(db)
    .await
}
