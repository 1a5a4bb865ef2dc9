/// Event store
///
/// Append-only login attempts plus the latest observed status per link,
/// persisted in a local libsql (SQLite) database. The store owns no policy;
/// the guard and the monitor decide, the store only records and filters by time.

pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{EventStore, LibsqlEventStore};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}

/// Temporary on-disk store with the schema applied
#[cfg(test)]
pub(crate) async fn temp_store() -> Result<(tempfile::TempDir, std::sync::Arc<LibsqlEventStore>)> {
    let dir = tempfile::tempdir()?;
    let pool = crate::pool::open_pool(dir.path().join("test.db"), 4).await?;

    let conn = pool.get().await.map_err(|e| anyhow::anyhow!("{e}"))?;
    initialize_database(&conn).await?;
    drop(conn);

    Ok((dir, std::sync::Arc::new(LibsqlEventStore::new_from_pool(pool))))
}
