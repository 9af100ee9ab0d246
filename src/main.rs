use std::sync::Arc;

use account_history_manager::app_state::AppState;
use account_history_manager::data::storage_paths::StoragePaths;
use account_history_manager::ipc::server::start_native_bridge;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let storage_paths = match StoragePaths::initialize() {
        Ok(paths) => paths,
        Err(err) => {
            log::error!("[STARTUP] {}", err.message());
            std::process::exit(1);
        }
    };

    let state = match AppState::initialize(storage_paths) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            log::error!("[STARTUP] initialization failed: {}", err.code);
            std::process::exit(1);
        }
    };

    match start_native_bridge(state) {
        Ok(handle) => log::info!("[STARTUP] bridge listening on 127.0.0.1:{}", handle.port),
        Err(err) => {
            log::error!("[STARTUP] bridge failed to start: {}", err.code);
            std::process::exit(1);
        }
    }

    loop {
        std::thread::park();
    }
}
