pub mod app_state;
pub mod commands {
    pub mod account_history;
    pub mod grid;
    pub mod json_response;
    pub mod request;
}
pub mod data {
    pub mod fs {
        pub mod atomic_write;
    }
    pub mod settings {
        pub mod config;
    }
    pub mod sqlite {
        pub mod diagnostics;
        pub mod migrations;
        pub mod pool;
        pub mod repo_impl;
    }
    pub mod storage_paths;
}
pub mod error;
pub mod i18n;
pub mod ipc {
    pub mod server;
}
pub mod services {
    pub mod account_history_service;
    pub mod account_service;
    pub mod acl_service;
    pub mod event_service;
    pub mod security_service;
}
pub mod types;
