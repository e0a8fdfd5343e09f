//! Storage layer: SQLite connection management and schema migrations

pub mod database;
pub mod migrations;

pub use database::{Database, DatabaseConfig, default_database_path, project_database_path};
pub use migrations::{MigrationStatus, migration_status, needs_migration, run_migrations};
