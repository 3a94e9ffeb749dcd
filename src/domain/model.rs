use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 申請表單的原始輸入，欄位名稱對應字串值
pub type FormData = HashMap<String, String>;

pub const NETWORK_FAILURE_MESSAGE: &str = "Validation temporarily unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Network,
}

/// Outcome of validating one field. Remote procedures return the same JSON
/// shape, so anything beyond the known keys lands in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn network_failure() -> Self {
        Self::failure(FailureKind::Network, NETWORK_FAILURE_MESSAGE)
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn is_network_failure(&self) -> bool {
        self.kind == Some(FailureKind::Network)
    }

    pub fn age(&self) -> Option<u64> {
        self.extra.get("age").and_then(|v| v.as_u64())
    }
}

/// Extra inputs a remote check may need besides the field's own value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    pub country: Option<String>,
}

impl ValidationContext {
    pub fn with_country(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
        }
    }

    /// 從表單資料推導：優先使用表單中的 country，否則使用預設國家
    pub fn from_form(data: &FormData, default_country: &str) -> Self {
        let country = data
            .get("country")
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(default_country);
        Self::with_country(country)
    }

    pub fn country_or<'a>(&'a self, default_country: &'a str) -> &'a str {
        self.country.as_deref().unwrap_or(default_country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    /// Fields whose check was overtaken by a newer request for the same field.
    pub superseded: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub valid: bool,
    pub results: HashMap<String, ValidationResult>,
    pub errors: Vec<FieldError>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub cache_size: usize,
    pub pending_timers: usize,
    pub registered_rules: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub remote_calls: u64,
    pub network_failures: u64,
}
