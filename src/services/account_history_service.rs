use crate::data::sqlite::pool::{with_connection, DbPool};
use crate::data::sqlite::repo_impl;
use crate::error::Result;
use crate::types::{AccountHistoryItem, AccountHistoryRow, ItemSearchData, QueryResult};

pub trait AccountHistoryStore: Send + Sync {
    fn search(&self, search: &ItemSearchData) -> Result<QueryResult<AccountHistoryRow>>;

    fn get_by_id(&self, id: i64) -> Result<AccountHistoryItem>;

    fn delete(&self, id: i64) -> Result<()>;

    /// Removes every id or none of them. Returns the number of removed
    /// records; callers treat anything other than `ids.len()` as a failure.
    fn delete_by_id_batch(&self, ids: &[i64]) -> Result<usize>;
}

pub struct AccountHistoryService {
    pool: DbPool,
}

impl AccountHistoryService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AccountHistoryStore for AccountHistoryService {
    fn search(&self, search: &ItemSearchData) -> Result<QueryResult<AccountHistoryRow>> {
        with_connection(&self.pool, |conn| repo_impl::search_account_history(conn, search))
    }

    fn get_by_id(&self, id: i64) -> Result<AccountHistoryItem> {
        with_connection(&self.pool, |conn| repo_impl::get_account_history(conn, id))
    }

    fn delete(&self, id: i64) -> Result<()> {
        with_connection(&self.pool, |conn| repo_impl::delete_account_history(conn, id))
    }

    fn delete_by_id_batch(&self, ids: &[i64]) -> Result<usize> {
        with_connection(&self.pool, |conn| {
            repo_impl::delete_account_history_batch(conn, ids)
        })
    }
}
