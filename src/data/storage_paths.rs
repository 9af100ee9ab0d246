use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "AHM_DATA_DIR";

#[derive(Debug, Clone)]
pub struct StoragePaths {
    data_root: PathBuf,
}

impl StoragePaths {
    /// Resolves the data directory from `AHM_DATA_DIR`, falling back to `Data/`
    /// next to the executable.
    pub fn initialize() -> Result<Self, StoragePathsError> {
        let data_root = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let exe_path =
                    std::env::current_exe().map_err(|_| StoragePathsError::ExecutablePath)?;
                exe_path
                    .parent()
                    .ok_or(StoragePathsError::ExecutablePath)?
                    .join("Data")
            }
        };

        Self::with_data_root(data_root)
    }

    pub fn with_data_root(data_root: PathBuf) -> Result<Self, StoragePathsError> {
        std::fs::create_dir_all(&data_root).map_err(|_| StoragePathsError::CreateDataDir)?;
        Ok(StoragePaths { data_root })
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_root.join("config.json")
    }

    pub fn database_path(&self, file_name: &str) -> PathBuf {
        self.data_root.join(file_name)
    }

    /// Where the running bridge publishes its port and shared token.
    pub fn bridge_info_path(&self) -> PathBuf {
        self.data_root.join("native-host.json")
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StoragePathsError {
    ExecutablePath,
    CreateDataDir,
}

impl StoragePathsError {
    pub fn message(&self) -> &'static str {
        match self {
            StoragePathsError::ExecutablePath => {
                "Unable to determine application directory for the account history bridge."
            }
            StoragePathsError::CreateDataDir => {
                "Cannot create the data directory. Set AHM_DATA_DIR to a writable folder and try again."
            }
        }
    }
}
