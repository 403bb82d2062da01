//! Metadata store: PostgreSQL records for projects, permissions, source
//! documents, and per-user annotation documents.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod registry;
pub mod repositories;

pub use registry::DbUserRegistry;

pub type DbPool = sqlx::PgPool;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Whether `err` is a unique constraint violation on a `uq_`-prefixed
/// constraint, i.e. a lost create race rather than a real failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err
                    .constraint()
                    .is_some_and(|constraint| constraint.starts_with("uq_"))
        }
        _ => false,
    }
}
