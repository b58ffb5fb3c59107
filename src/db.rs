//! Database connection and schema bootstrap.

use crate::app_config::DatabaseConfig;
use crate::orm::{activities, activity_meta, attachment_meta, attachments, users, videos};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};

/// Open a connection pool for the configured database.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(config.sqlx_logging);

    let db = Database::connect(opt).await?;
    log::info!(
        "Connected to {:?} database",
        db.get_database_backend()
    );
    Ok(db)
}

/// Create every table this crate reads or writes, skipping existing ones.
pub async fn install_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, activities::Entity).await?;
    create_table(db, activity_meta::Entity).await?;
    create_table(db, attachments::Entity).await?;
    create_table(db, attachment_meta::Entity).await?;
    create_table(db, videos::Entity).await?;
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();

    log::debug!("Creating table {}", entity.table_name());
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
