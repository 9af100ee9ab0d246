use std::path::Path;
use std::time::Duration;

use r2d2::{CustomizeConnection, Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use super::migrations;
use crate::error::{ErrorCodeString, Result};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

const POOL_MAX_SIZE: u32 = 8;

#[derive(Debug)]
struct ConnectionPragmas;

impl CustomizeConnection<Connection, rusqlite::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    }
}

/// Opens a pooled, file-backed database and brings its schema up to date.
pub fn open_pool(db_path: &Path) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path);
    let pool = Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .connection_customizer(Box::new(ConnectionPragmas))
        .build(manager)
        .map_err(|err| {
            log::error!("[DB][open_pool] {}: {err}", db_path.display());
            ErrorCodeString::new("DB_OPEN_FAILED")
        })?;

    let conn = pool.get()?;
    migrations::migrate_to_latest(&conn)?;

    Ok(pool)
}

pub fn with_connection<T>(pool: &DbPool, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
    let mut conn: DbConnection = pool.get()?;
    f(&mut conn)
}
