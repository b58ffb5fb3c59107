//! Test database setup
#![allow(dead_code)]

use sea_orm::{DatabaseConnection, DbErr};
use social_video::app_config::DatabaseConfig;
use std::env;
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Route `log` output through the test harness
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Get a fresh test database with the schema installed.
///
/// Defaults to an in-memory SQLite database. The pool is pinned to a single
/// connection because every SQLite memory connection is its own database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    init_logger();

    let config = DatabaseConfig {
        url: env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string()),
        max_connections: 1,
        min_connections: 1,
        sqlx_logging: false,
    };

    let db = social_video::db::connect(&config).await?;
    social_video::db::install_schema(&db).await?;
    Ok(db)
}

/// Number of rows in the media table, videos or not
pub async fn count_media_rows(db: &DatabaseConnection) -> Result<usize, DbErr> {
    use sea_orm::{EntityTrait, PaginatorTrait};
    use social_video::orm::videos;

    videos::Entity::find().count(db).await
}
