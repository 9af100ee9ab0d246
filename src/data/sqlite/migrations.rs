use rusqlite::Connection;

use crate::error::{ErrorCodeString, Result};

const CURRENT_SCHEMA_VERSION: i32 = 1;

pub fn migrate_to_latest(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;

    let version: i32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;

    match version {
        0 => {
            conn.execute_batch(include_str!("schema.sql"))
                .map_err(|_| ErrorCodeString::new("DB_MIGRATION_FAILED"))?;
            conn.execute_batch("PRAGMA user_version = 1;")
                .map_err(|_| ErrorCodeString::new("DB_MIGRATION_FAILED"))?;
            log::info!("[DB][migrate] schema created at version {CURRENT_SCHEMA_VERSION}");
            Ok(())
        }
        CURRENT_SCHEMA_VERSION => Ok(()),
        other => {
            log::error!("[DB][migrate] unsupported schema version {other}");
            Err(ErrorCodeString::new("DB_MIGRATION_FAILED"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_to_latest(&conn).unwrap();
        migrate_to_latest(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 7;").unwrap();

        assert!(migrate_to_latest(&conn).unwrap_err().is("DB_MIGRATION_FAILED"));
    }
}
