use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
#[error("{code}")]
pub struct ErrorCodeString {
    pub code: String,
}

impl ErrorCodeString {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
        }
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl From<r2d2::Error> for ErrorCodeString {
    fn from(err: r2d2::Error) -> Self {
        log::error!("[DB][pool] connection checkout failed: {err}");
        ErrorCodeString::new("DB_POOL_UNAVAILABLE")
    }
}

pub type Result<T> = std::result::Result<T, ErrorCodeString>;
