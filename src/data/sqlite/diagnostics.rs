use rusqlite::Error;

use crate::error::ErrorCodeString;

pub fn log_sqlite_err(op: &str, sql: &str, err: &Error) {
    log::error!("[DB][{op}] rusqlite error: {err:?}");
    log::error!("[DB][{op}] sql: {sql}");
}

/// Logs the failing statement and collapses the error into `DB_QUERY_FAILED`.
pub fn query_failed(op: &'static str, sql: &'static str) -> impl Fn(Error) -> ErrorCodeString {
    move |err| {
        log_sqlite_err(op, sql, &err);
        ErrorCodeString::new("DB_QUERY_FAILED")
    }
}
