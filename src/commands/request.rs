use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::ItemSearchData;

/// Parameters of one inbound action request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ActionRequest {
    params: Map<String, Value>,
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ActionRequest {
    pub fn new(params: Map<String, Value>) -> Self {
        Self { params }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn analyze_int(&self, name: &str, default: i64) -> i64 {
        self.params
            .get(name)
            .and_then(value_as_i64)
            .unwrap_or(default)
    }

    pub fn analyze_string(&self, name: &str) -> Option<String> {
        match self.params.get(name)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn security_token(&self) -> Option<&str> {
        self.params.get("sk").and_then(Value::as_str)
    }

    /// Ids from `items`, given as an array or a comma-separated string.
    /// Non-integer entries are dropped and duplicates removed, keeping order.
    pub fn items_id(&self) -> Vec<i64> {
        let raw: Vec<Option<i64>> = match self.params.get("items") {
            Some(Value::Array(values)) => values.iter().map(value_as_i64).collect(),
            Some(Value::String(s)) => s.split(',').map(|p| p.trim().parse().ok()).collect(),
            Some(other) => vec![value_as_i64(other)],
            None => Vec::new(),
        };

        let mut ids: Vec<i64> = Vec::new();
        for id in raw.into_iter().flatten() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn search_data(&self, default_count: u32) -> ItemSearchData {
        let start = self.analyze_int("start", 0).max(0);
        let count = match self.analyze_int("count", i64::from(default_count)) {
            c if c <= 0 => i64::from(default_count),
            c => c,
        };
        ItemSearchData {
            search_string: self.analyze_string("search").unwrap_or_default(),
            limit_start: u32::try_from(start).unwrap_or(u32::MAX),
            limit_count: u32::try_from(count).unwrap_or(default_count),
        }
    }
}
