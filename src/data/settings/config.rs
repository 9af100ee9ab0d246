use serde::{Deserialize, Serialize};
use std::fs;

use crate::data::fs::atomic_write::write_atomic;
use crate::data::storage_paths::StoragePaths;
use crate::error::{ErrorCodeString, Result};
use crate::i18n::Locale;

const MAX_ACCOUNT_COUNT: u32 = 1000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConfigData {
    /// Page size used by grids when the request does not ask for one.
    pub account_count: u32,
    pub locale: Locale,
    pub database_file: String,
    pub event_log_enabled: bool,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            account_count: 12,
            locale: Locale::En,
            database_file: "syspass.db".to_string(),
            event_log_enabled: true,
        }
    }
}

fn validate_config(config: &ConfigData) -> Result<()> {
    if !(1..=MAX_ACCOUNT_COUNT).contains(&config.account_count) {
        return Err(ErrorCodeString::new("CONFIG_VALIDATION_FAILED"));
    }
    if config.database_file.trim().is_empty() {
        return Err(ErrorCodeString::new("CONFIG_VALIDATION_FAILED"));
    }
    Ok(())
}

pub fn load_config(sp: &StoragePaths) -> Result<ConfigData> {
    let path = sp.config_path();
    if !path.exists() {
        let defaults = ConfigData::default();
        save_config(sp, &defaults)?;
        return Ok(defaults);
    }
    let content = fs::read_to_string(path).map_err(|_| ErrorCodeString::new("CONFIG_READ"))?;
    let config: ConfigData =
        serde_json::from_str(&content).map_err(|_| ErrorCodeString::new("CONFIG_PARSE"))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_config(sp: &StoragePaths, config: &ConfigData) -> Result<()> {
    validate_config(config)?;
    let serialized =
        serde_json::to_string_pretty(config).map_err(|_| ErrorCodeString::new("CONFIG_WRITE"))?;
    write_atomic(&sp.config_path(), serialized.as_bytes())
        .map_err(|_| ErrorCodeString::new("CONFIG_WRITE"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(tmp: &tempfile::TempDir) -> StoragePaths {
        StoragePaths::with_data_root(tmp.path().join("Data")).unwrap()
    }

    #[test]
    fn missing_config_writes_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let sp = paths(&tmp);

        let config = load_config(&sp).unwrap();

        assert_eq!(config, ConfigData::default());
        assert!(sp.config_path().exists());
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let sp = paths(&tmp);
        fs::write(sp.config_path(), r#"{"account_count": 25, "locale": "es"}"#).unwrap();

        let config = load_config(&sp).unwrap();

        assert_eq!(config.account_count, 25);
        assert_eq!(config.locale, Locale::Es);
        assert_eq!(config.database_file, "syspass.db");
    }

    #[test]
    fn rejects_zero_page_size() {
        let tmp = tempfile::tempdir().unwrap();
        let sp = paths(&tmp);
        fs::write(sp.config_path(), r#"{"account_count": 0}"#).unwrap();

        let err = load_config(&sp).unwrap_err();
        assert!(err.is("CONFIG_VALIDATION_FAILED"));
    }
}
