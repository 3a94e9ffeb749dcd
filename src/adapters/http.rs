use crate::domain::model::ValidationResult;
use crate::domain::ports::ValidationApi;
use crate::utils::error::{Result, ValidatorError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// Remote procedure names, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteMethods {
    pub email: String,
    pub postal_code: String,
    pub phone_number: String,
    pub birth_date: String,
}

impl Default for RemoteMethods {
    fn default() -> Self {
        Self {
            email: "validate_email".to_string(),
            postal_code: "validate_postal_code".to_string(),
            phone_number: "validate_phone_number".to_string(),
            birth_date: "validate_birth_date".to_string(),
        }
    }
}

/// Calls the backend's whitelisted methods with `POST {base_url}/{method}`.
pub struct HttpValidationApi {
    client: Client,
    base_url: String,
    headers: HashMap<String, String>,
    methods: RemoteMethods,
    timeout: Option<Duration>,
}

impl HttpValidationApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: HashMap::new(),
            methods: RemoteMethods::default(),
            timeout: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_methods(mut self, methods: RemoteMethods) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<ValidationResult> {
        let endpoint = format!("{}/{}", self.base_url, method);
        tracing::debug!("📡 POST {}", endpoint);

        let mut request = self.client.post(&endpoint).json(&body);

        // 自訂標頭（通常是 API token）
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("📡 {} responded with {}", method, status);

        if !status.is_success() {
            return Err(ValidatorError::RemoteStatusError {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let payload: serde_json::Value = response.json().await?;
        Ok(serde_json::from_value(unwrap_envelope(payload))?)
    }
}

/// The backend wraps return values as `{"message": ...}`; bare results are
/// accepted too.
fn unwrap_envelope(payload: serde_json::Value) -> serde_json::Value {
    match payload {
        serde_json::Value::Object(mut map) if !map.contains_key("valid") => map
            .remove("message")
            .unwrap_or(serde_json::Value::Object(map)),
        other => other,
    }
}

#[async_trait]
impl ValidationApi for HttpValidationApi {
    async fn validate_email(&self, value: &str) -> Result<ValidationResult> {
        self.call(&self.methods.email, json!({ "email": value })).await
    }

    async fn validate_postal_code(&self, value: &str, country: &str) -> Result<ValidationResult> {
        self.call(
            &self.methods.postal_code,
            json!({ "postal_code": value, "country": country }),
        )
        .await
    }

    async fn validate_phone_number(&self, value: &str, country: &str) -> Result<ValidationResult> {
        self.call(
            &self.methods.phone_number,
            json!({ "phone": value, "country": country }),
        )
        .await
    }

    async fn validate_birth_date(&self, value: &str) -> Result<ValidationResult> {
        self.call(&self.methods.birth_date, json!({ "birth_date": value }))
            .await
    }
}
