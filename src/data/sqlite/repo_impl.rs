use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};

use super::diagnostics::{log_sqlite_err, query_failed};
use crate::error::{ErrorCodeString, Result};
use crate::types::{AccountHistoryItem, AccountHistoryRow, EventLogEntry, ItemSearchData, QueryResult};

const HISTORY_ITEM_SELECT: &str = r#"
SELECT
  h.id,
  h.account_id,
  h.name,
  h.client_id,
  COALESCE(c.name, '') AS client_name,
  h.category_id,
  COALESCE(g.name, '') AS category_name,
  h.login,
  h.url,
  h.notes,
  h.pass,
  h.pass_key,
  h.user_id,
  h.user_group_id,
  h.user_edit_id,
  h.is_private,
  h.is_private_group,
  h.pass_date,
  h.pass_date_change,
  h.date_add,
  h.date_edit,
  h.is_modify,
  h.is_deleted
FROM account_history h
LEFT JOIN clients c ON c.id = h.client_id
LEFT JOIN categories g ON g.id = h.category_id
WHERE h.id = ?1
"#;

const HISTORY_SEARCH_FILTER: &str = r#"
FROM account_history h
LEFT JOIN clients c ON c.id = h.client_id
WHERE ?1 = ''
   OR h.name LIKE ?2 ESCAPE '\'
   OR c.name LIKE ?2 ESCAPE '\'
   OR h.login LIKE ?2 ESCAPE '\'
"#;

fn map_account_history_item(row: &rusqlite::Row) -> rusqlite::Result<AccountHistoryItem> {
    Ok(AccountHistoryItem {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        name: row.get("name")?,
        client_id: row.get("client_id")?,
        client_name: row.get("client_name")?,
        category_id: row.get("category_id")?,
        category_name: row.get("category_name")?,
        login: row.get("login")?,
        url: row.get("url")?,
        notes: row.get("notes")?,
        pass: row.get("pass")?,
        pass_key: row.get("pass_key")?,
        user_id: row.get("user_id")?,
        user_group_id: row.get("user_group_id")?,
        user_edit_id: row.get("user_edit_id")?,
        is_private: row.get("is_private")?,
        is_private_group: row.get("is_private_group")?,
        pass_date: row.get("pass_date")?,
        pass_date_change: row.get("pass_date_change")?,
        date_add: row.get("date_add")?,
        date_edit: row.get("date_edit")?,
        is_modify: row.get("is_modify")?,
        is_deleted: row.get("is_deleted")?,
    })
}

fn map_account_history_row(row: &rusqlite::Row) -> rusqlite::Result<AccountHistoryRow> {
    Ok(AccountHistoryRow {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        name: row.get("name")?,
        client_name: row.get("client_name")?,
        login: row.get("login")?,
        date: row.get("date")?,
        is_modify: row.get("is_modify")?,
        is_deleted: row.get("is_deleted")?,
    })
}

fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

pub fn search_account_history(
    conn: &Connection,
    search: &ItemSearchData,
) -> Result<QueryResult<AccountHistoryRow>> {
    let needle = search.search_string.trim();
    let pattern = like_pattern(needle);

    let count_sql = format!("SELECT COUNT(*) {HISTORY_SEARCH_FILTER}");
    let total: i64 = conn
        .query_row(&count_sql, params![needle, pattern], |row| row.get(0))
        .map_err(|err| {
            log_sqlite_err("search_account_history", &count_sql, &err);
            ErrorCodeString::new("DB_QUERY_FAILED")
        })?;

    let select_sql = format!(
        r#"
SELECT
  h.id,
  h.account_id,
  h.name,
  COALESCE(c.name, '') AS client_name,
  h.login,
  COALESCE(h.date_edit, h.date_add) AS date,
  h.is_modify,
  h.is_deleted
{HISTORY_SEARCH_FILTER}
ORDER BY date DESC, h.id DESC
LIMIT ?3 OFFSET ?4
"#
    );

    let mut stmt = conn.prepare(&select_sql).map_err(|err| {
        log_sqlite_err("search_account_history", &select_sql, &err);
        ErrorCodeString::new("DB_QUERY_FAILED")
    })?;

    let rows = stmt
        .query_map(
            params![needle, pattern, search.limit_count, search.limit_start],
            map_account_history_row,
        )
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;

    Ok(QueryResult::new(rows, total.max(0) as u64))
}

pub fn get_account_history(conn: &Connection, id: i64) -> Result<AccountHistoryItem> {
    conn.query_row(HISTORY_ITEM_SELECT, params![id], map_account_history_item)
        .optional()
        .map_err(query_failed("get_account_history", HISTORY_ITEM_SELECT))?
        .ok_or_else(|| ErrorCodeString::new("ACCOUNT_HISTORY_NOT_FOUND"))
}

pub fn delete_account_history(conn: &Connection, id: i64) -> Result<()> {
    let rows = conn
        .execute("DELETE FROM account_history WHERE id = ?1", params![id])
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;
    if rows == 0 {
        return Err(ErrorCodeString::new("ACCOUNT_HISTORY_NOT_FOUND"));
    }
    Ok(())
}

/// Deletes every id in one transaction. Rolls back unless all of them existed.
pub fn delete_account_history_batch(conn: &mut Connection, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM account_history WHERE id IN ({placeholders})");

    let tx = conn
        .transaction()
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;
    let deleted = tx.execute(&sql, params_from_iter(ids.iter())).map_err(|err| {
        log_sqlite_err("delete_account_history_batch", &sql, &err);
        ErrorCodeString::new("DB_QUERY_FAILED")
    })?;

    if deleted != ids.len() {
        log::warn!(
            "[DB][delete_account_history_batch] expected {} rows, matched {deleted}; rolling back",
            ids.len()
        );
        return Err(ErrorCodeString::new("ACCOUNT_HISTORY_BATCH_MISMATCH"));
    }

    tx.commit()
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;
    Ok(deleted)
}

pub fn account_exists(conn: &Connection, account_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM accounts WHERE id = ?1",
        params![account_id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))
}

/// Copies the live account into `account_history` and returns the new history id.
pub fn snapshot_account(
    conn: &Connection,
    account_id: i64,
    is_modify: bool,
    is_deleted: bool,
) -> Result<i64> {
    const SQL: &str = r#"
INSERT INTO account_history (
  account_id, client_id, category_id, name, login, url, notes, pass, pass_key,
  user_id, user_group_id, user_edit_id, is_private, is_private_group,
  pass_date, pass_date_change, date_add, date_edit, is_modify, is_deleted
)
SELECT
  id, client_id, category_id, name, login, url, notes, pass, pass_key,
  user_id, user_group_id, user_edit_id, is_private, is_private_group,
  pass_date, pass_date_change, date_add, date_edit, ?2, ?3
FROM accounts
WHERE id = ?1
"#;
    let rows = conn
        .execute(SQL, params![account_id, is_modify, is_deleted])
        .map_err(query_failed("snapshot_account", SQL))?;
    if rows == 0 {
        return Err(ErrorCodeString::new("ACCOUNT_NOT_FOUND"));
    }
    Ok(conn.last_insert_rowid())
}

pub fn insert_account(conn: &Connection, item: &AccountHistoryItem) -> Result<i64> {
    const SQL: &str = r#"
INSERT INTO accounts (
  client_id, category_id, name, login, url, notes, pass, pass_key,
  user_id, user_group_id, user_edit_id, is_private, is_private_group,
  pass_date, pass_date_change, date_add, date_edit
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, NULL)
"#;
    conn.execute(
        SQL,
        params![
            item.client_id,
            item.category_id,
            item.name,
            item.login,
            item.url,
            item.notes,
            item.pass,
            item.pass_key,
            item.user_id,
            item.user_group_id,
            item.user_edit_id,
            item.is_private,
            item.is_private_group,
            item.pass_date,
            item.pass_date_change,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(query_failed("insert_account", SQL))?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites the live account with the snapshot's fields, keeping a "modify"
/// snapshot of what it replaces.
pub fn restore_account_from_history(
    conn: &mut Connection,
    history_id: i64,
    account_id: i64,
) -> Result<()> {
    const SQL: &str = r#"
UPDATE accounts SET
  client_id = ?1,
  category_id = ?2,
  name = ?3,
  login = ?4,
  url = ?5,
  notes = ?6,
  pass = ?7,
  pass_key = ?8,
  user_id = ?9,
  user_group_id = ?10,
  user_edit_id = ?11,
  is_private = ?12,
  is_private_group = ?13,
  pass_date = ?14,
  pass_date_change = ?15,
  date_edit = ?16
WHERE id = ?17
"#;

    let tx = conn
        .transaction()
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;

    let item = get_account_history(&tx, history_id)?;
    if item.account_id != account_id {
        return Err(ErrorCodeString::new("ACCOUNT_HISTORY_MISMATCH"));
    }
    if !account_exists(&tx, account_id)? {
        return Err(ErrorCodeString::new("ACCOUNT_NOT_FOUND"));
    }

    snapshot_account(&tx, account_id, true, false)?;
    apply_history(&tx, SQL, &item, account_id)?;

    tx.commit()
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))
}

fn apply_history(
    tx: &Transaction<'_>,
    sql: &'static str,
    item: &AccountHistoryItem,
    account_id: i64,
) -> Result<()> {
    let rows = tx
        .execute(
            sql,
            params![
                item.client_id,
                item.category_id,
                item.name,
                item.login,
                item.url,
                item.notes,
                item.pass,
                item.pass_key,
                item.user_id,
                item.user_group_id,
                item.user_edit_id,
                item.is_private,
                item.is_private_group,
                item.pass_date,
                item.pass_date_change,
                Utc::now().to_rfc3339(),
                account_id,
            ],
        )
        .map_err(query_failed("restore_account_from_history", sql))?;
    if rows == 0 {
        return Err(ErrorCodeString::new("ACCOUNT_NOT_FOUND"));
    }
    Ok(())
}

pub fn insert_event_log(conn: &Connection, entry: &EventLogEntry) -> Result<i64> {
    const SQL: &str = r#"
INSERT INTO event_log (date, login, user_id, action, description, level)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;
    conn.execute(
        SQL,
        params![
            entry.date,
            entry.login,
            entry.user_id,
            entry.action,
            entry.description,
            entry.level,
        ],
    )
    .map_err(query_failed("insert_event_log", SQL))?;
    Ok(conn.last_insert_rowid())
}

pub fn list_event_log(conn: &Connection, limit: u32) -> Result<Vec<EventLogEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT date, login, user_id, action, description, level FROM event_log ORDER BY id DESC LIMIT ?1",
        )
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(EventLogEntry {
                date: row.get("date")?,
                login: row.get("login")?,
                user_id: row.get("user_id")?,
                action: row.get("action")?,
                description: row.get("description")?,
                level: row.get("level")?,
            })
        })
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|_| ErrorCodeString::new("DB_QUERY_FAILED"))?;

    Ok(rows)
}
