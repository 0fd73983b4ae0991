//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL. Schema
//! migrations are handled outside this crate.

use crate::entities::{
    AttendancePolicy, Branch, Candidate, Counter, Department, Designation, DocumentType, Employee,
    EmployeeDocument, JobPosting, Offer, OfferTemplate, Principal, Role, Session, Shift, Source,
    lifecycle,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/staffdesk.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// File path of a `sqlite://` URL, if it names a file.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty() && !path.starts_with(":memory:")).then(|| Path::new(path))
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set. The
/// file's directory is created when missing.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(parent) = sqlite_file_path(&database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables from the entity definitions. Existing tables are left untouched.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    // Reference data
    create_table(db, &schema, Role).await?;
    create_table(db, &schema, Branch).await?;
    create_table(db, &schema, Department).await?;
    create_table(db, &schema, Designation).await?;
    create_table(db, &schema, Shift).await?;
    create_table(db, &schema, AttendancePolicy).await?;
    create_table(db, &schema, Source).await?;
    create_table(db, &schema, DocumentType).await?;
    create_table(db, &schema, JobPosting).await?;
    create_table(db, &schema, OfferTemplate).await?;
    create_table(db, &schema, Counter).await?;

    // Identity and people
    create_table(db, &schema, Principal).await?;
    create_table(db, &schema, Session).await?;
    create_table(db, &schema, Employee).await?;
    create_table(db, &schema, EmployeeDocument).await?;
    create_table(db, &schema, Candidate).await?;
    create_table(db, &schema, Offer).await?;

    // Lifecycle records
    create_table(db, &schema, lifecycle::award::Entity).await?;
    create_table(db, &schema, lifecycle::promotion::Entity).await?;
    create_table(db, &schema, lifecycle::transfer::Entity).await?;
    create_table(db, &schema, lifecycle::warning::Entity).await?;
    create_table(db, &schema, lifecycle::complaint::Entity).await?;
    create_table(db, &schema, lifecycle::resignation::Entity).await?;
    create_table(db, &schema, lifecycle::termination::Entity).await?;
    create_table(db, &schema, lifecycle::asset::Entity).await?;
    create_table(db, &schema, lifecycle::asset_assignment::Entity).await?;
    create_table(db, &schema, lifecycle::training_program::Entity).await?;
    create_table(db, &schema, lifecycle::training::Entity).await?;

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::lifecycle::training;
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _ = Candidate::find().limit(1).all(&db).await?;
        let _ = Employee::find().limit(1).all(&db).await?;
        let _ = EmployeeDocument::find().limit(1).all(&db).await?;
        let _ = Offer::find().limit(1).all(&db).await?;
        let _ = training::Entity::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite://data/staffdesk.sqlite?mode=rwc"),
            Some(Path::new("data/staffdesk.sqlite"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/db"), None);
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        let _ = Counter::find().limit(1).all(&db).await?;
        Ok(())
    }
}
