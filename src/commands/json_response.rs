use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSON_SUCCESS: u8 = 0;
pub const JSON_ERROR: u8 = 1;

/// Envelope returned by every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: u8,
    pub description: String,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub csrf: String,
}

impl JsonResponse {
    pub fn success(description: &str) -> Self {
        Self {
            status: JSON_SUCCESS,
            description: description.to_string(),
            messages: Vec::new(),
            data: None,
            csrf: String::new(),
        }
    }

    pub fn success_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::success("OK")
        }
    }

    pub fn error(description: &str) -> Self {
        Self {
            status: JSON_ERROR,
            description: description.to_string(),
            messages: Vec::new(),
            data: None,
            csrf: String::new(),
        }
    }

    pub fn with_csrf(mut self, csrf: String) -> Self {
        self.csrf = csrf;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == JSON_SUCCESS
    }
}
