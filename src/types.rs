use serde::{Deserialize, Serialize};

/// Full snapshot of an account as stored in `account_history`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccountHistoryItem {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub client_id: i64,
    pub client_name: String,
    pub category_id: i64,
    pub category_name: String,
    pub login: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    pub pass: Vec<u8>,
    #[serde(skip_serializing)]
    pub pass_key: Vec<u8>,
    pub user_id: i64,
    pub user_group_id: i64,
    pub user_edit_id: Option<i64>,
    pub is_private: bool,
    pub is_private_group: bool,
    pub pass_date: Option<String>,
    pub pass_date_change: Option<String>,
    pub date_add: String,
    pub date_edit: Option<String>,
    pub is_modify: bool,
    pub is_deleted: bool,
}

impl AccountHistoryItem {
    pub fn display_date(&self) -> &str {
        self.date_edit.as_deref().unwrap_or(&self.date_add)
    }
}

/// Row shown in the history grid.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccountHistoryRow {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub client_name: String,
    pub login: Option<String>,
    pub date: String,
    pub is_modify: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ItemSearchData {
    pub search_string: String,
    pub limit_start: u32,
    pub limit_count: u32,
}

impl ItemSearchData {
    pub fn is_filtered(&self) -> bool {
        !self.search_string.trim().is_empty()
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub data: Vec<T>,
    pub total_num_rows: u64,
}

impl<T> QueryResult<T> {
    pub fn new(data: Vec<T>, total_num_rows: u64) -> Self {
        Self {
            data,
            total_num_rows,
        }
    }
}

/// Permission flags attached to a user's profile.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ProfileData {
    #[serde(default)]
    pub mgm_accounts: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserData {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub is_admin_app: bool,
    #[serde(default)]
    pub is_admin_acc: bool,
    #[serde(default)]
    pub profile: ProfileData,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EventLogEntry {
    pub date: String,
    pub login: Option<String>,
    pub user_id: Option<i64>,
    pub action: String,
    pub description: String,
    pub level: String,
}
