use crate::data::sqlite::pool::{with_connection, DbPool};
use crate::data::sqlite::repo_impl;
use crate::error::Result;
use crate::types::AccountHistoryItem;

/// Live-account operations needed to bring a snapshot back.
pub trait AccountRestorer: Send + Sync {
    /// Overwrites account `account_id` with snapshot `history_id`.
    fn edit_restore(&self, history_id: i64, account_id: i64) -> Result<()>;

    /// Recreates an account from a snapshot, returning the new account id.
    fn create_from_history(&self, item: &AccountHistoryItem) -> Result<i64>;
}

pub struct AccountService {
    pool: DbPool,
}

impl AccountService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AccountRestorer for AccountService {
    fn edit_restore(&self, history_id: i64, account_id: i64) -> Result<()> {
        with_connection(&self.pool, |conn| {
            repo_impl::restore_account_from_history(conn, history_id, account_id)
        })
    }

    fn create_from_history(&self, item: &AccountHistoryItem) -> Result<i64> {
        let id = with_connection(&self.pool, |conn| repo_impl::insert_account(conn, item))?;
        log::debug!("[ACCOUNT] recreated '{}' as account {id}", item.name);
        Ok(id)
    }
}
