use std::sync::Arc;

use crate::commands::account_history::AccountHistoryManager;
use crate::data::settings::config::{load_config, ConfigData};
use crate::data::sqlite::pool::{open_pool, DbPool};
use crate::data::storage_paths::StoragePaths;
use crate::error::Result;
use crate::services::account_history_service::AccountHistoryService;
use crate::services::account_service::AccountService;
use crate::services::acl_service::Acl;
use crate::services::event_service::{EventDispatcher, EventLogReceiver, LogEventReceiver};
use crate::services::security_service::SessionStore;

pub struct AppState {
    pub storage_paths: StoragePaths,
    pub config: ConfigData,
    pub pool: DbPool,
    pub sessions: SessionStore,
    pub account_history: AccountHistoryManager,
}

impl AppState {
    /// Loads the config, opens and migrates the database and wires the
    /// account history manager to its SQLite-backed collaborators.
    pub fn initialize(storage_paths: StoragePaths) -> Result<Self> {
        let config = load_config(&storage_paths)?;
        let pool = open_pool(&storage_paths.database_path(&config.database_file))?;

        let mut dispatcher = EventDispatcher::new().attach(Arc::new(LogEventReceiver));
        if config.event_log_enabled {
            dispatcher = dispatcher.attach(Arc::new(EventLogReceiver::new(pool.clone())));
        }

        let account_history = AccountHistoryManager::new(
            Arc::new(AccountHistoryService::new(pool.clone())),
            Arc::new(AccountService::new(pool.clone())),
            Arc::new(Acl),
            Arc::new(dispatcher),
            config.clone(),
        );

        Ok(Self {
            storage_paths,
            config,
            pool,
            sessions: SessionStore::new(),
            account_history,
        })
    }
}
