use std::fs::{self, File, OpenOptions};
use std::path::Path;

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use url::Url;

use crate::entities::{
    daily_goal, monthly_plan, study_group, study_resource, study_session, syllabus_topic,
};
use crate::error::AppError;

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let invalid = || AppError::InvalidInput(format!("invalid sqlite path: {}", path.display()));
    let mut url = Url::from_file_path(&absolute).map_err(|_| invalid())?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    create_table(db, daily_goal::Entity).await?;
    create_table(db, monthly_plan::Entity).await?;
    create_table(db, study_session::Entity).await?;
    create_table(db, syllabus_topic::Entity).await?;
    create_table(db, study_resource::Entity).await?;
    create_table(db, study_group::Entity).await?;

    create_index(
        db,
        Index::create()
            .name("idx_daily_goals_user_date")
            .table(daily_goal::Entity)
            .col(daily_goal::Column::UserId)
            .col(daily_goal::Column::Date)
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_monthly_plans_user_deadline")
            .table(monthly_plan::Entity)
            .col(monthly_plan::Column::UserId)
            .col(monthly_plan::Column::Deadline)
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_study_sessions_user_date")
            .table(study_session::Entity)
            .col(study_session::Column::UserId)
            .col(study_session::Column::Date)
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_syllabus_topics_user_subject")
            .table(syllabus_topic::Entity)
            .col(syllabus_topic::Column::UserId)
            .col(syllabus_topic::Column::Subject)
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_study_resources_user")
            .table(study_resource::Entity)
            .col(study_resource::Column::UserId)
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_study_groups_user")
            .table(study_group::Entity)
            .col(study_group::Column::UserId)
            .to_owned(),
    )
    .await?;

    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}

async fn create_index(
    db: &DatabaseConnection,
    mut stmt: IndexCreateStatement,
) -> Result<(), AppError> {
    stmt.if_not_exists();
    let builder = db.get_database_backend();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}
