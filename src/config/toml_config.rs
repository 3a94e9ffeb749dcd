use crate::adapters::http::{HttpValidationApi, RemoteMethods};
use crate::core::rules::{RuleRegistry, StepMap, ValidationRule};
use crate::core::service::{
    ServiceSettings, ValidationService, DEFAULT_CACHE_TTL, DEFAULT_COUNTRY, DEFAULT_DEBOUNCE,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::domain::ports::ValidationApi;
use crate::utils::error::{Result, ValidatorError};
use crate::utils::validation::{
    validate_length_bounds, validate_non_empty_string, validate_positive_number, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    pub steps: Option<HashMap<String, Vec<String>>>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub debounce_ms: u64,
    pub cache_ttl_seconds: u64,
    /// 0 表示不設超時
    pub request_timeout_seconds: u64,
    pub default_country: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            cache_ttl_seconds: DEFAULT_CACHE_TTL.as_secs(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            default_country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub methods: RemoteMethods,
}

/// Adds a field rule or replaces the constraints of an existing one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    pub field: String,
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub pattern_message: Option<String>,
    #[serde(default, rename = "async")]
    pub is_async: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    /// "compact" or "json"
    pub format: Option<String>,
}

impl ValidatorConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ValidatorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MEMBERSHIP_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn service_settings(&self) -> ServiceSettings {
        let timeout = match self.service.request_timeout_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        };

        ServiceSettings {
            debounce: Duration::from_millis(self.service.debounce_ms),
            cache_ttl: Duration::from_secs(self.service.cache_ttl_seconds),
            request_timeout: timeout,
            default_country: self.service.default_country.clone(),
        }
    }

    /// Default membership rules with the `[[rules]]` overrides applied.
    /// An override keeps the remote check and custom validator of the rule
    /// it replaces.
    pub fn build_registry(&self) -> Result<RuleRegistry> {
        let mut registry = RuleRegistry::membership_defaults()?;

        for rule_config in &self.rules {
            let existing = registry.get_rule(&rule_config.field).cloned();
            let label = rule_config
                .label
                .clone()
                .or_else(|| existing.as_ref().map(|r| r.label.clone()))
                .unwrap_or_else(|| rule_config.field.clone());

            let mut rule = ValidationRule::new(&rule_config.field, &label);
            rule.required = rule_config.required;
            rule.min_length = rule_config.min_length;
            rule.max_length = rule_config.max_length;
            rule.is_async = rule_config.is_async;
            if let Some(pattern) = &rule_config.pattern {
                rule.pattern = Some(Regex::new(pattern).map_err(|e| {
                    ValidatorError::InvalidConfigValueError {
                        field: format!("rules.{}.pattern", rule_config.field),
                        value: pattern.clone(),
                        reason: e.to_string(),
                    }
                })?);
                rule.pattern_message = rule_config.pattern_message.clone();
            }
            if let Some(existing) = existing {
                rule.remote = existing.remote;
                rule.custom_validator = existing.custom_validator;
            }

            tracing::debug!("🔧 Rule override for '{}'", rule_config.field);
            registry.register(rule);
        }

        Ok(registry)
    }

    pub fn build_steps(&self) -> Result<StepMap> {
        let Some(steps) = &self.steps else {
            return Ok(StepMap::membership_defaults());
        };

        let mut map = StepMap::default();
        for (step, fields) in steps {
            let number: u32 = step.parse().map_err(|_| ValidatorError::InvalidConfigValueError {
                field: "steps".to_string(),
                value: step.clone(),
                reason: "Step keys must be positive integers".to_string(),
            })?;
            map.set_step(number, fields.as_slice());
        }
        Ok(map)
    }

    pub fn build_api(&self) -> Result<HttpValidationApi> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| ValidatorError::MissingConfigError {
                field: "api.base_url".to_string(),
            })?;

        let mut client = HttpValidationApi::new(api.base_url.clone())
            .with_methods(api.methods.clone())
            .with_headers(api.headers.clone().unwrap_or_default());
        if let Some(seconds) = api.timeout_seconds {
            client = client.with_timeout(Duration::from_secs(seconds));
        }
        Ok(client)
    }

    pub fn build_service(&self, api: Arc<dyn ValidationApi>) -> Result<ValidationService> {
        Ok(ValidationService::new(
            api,
            self.build_registry()?,
            self.build_steps()?,
            self.service_settings(),
        ))
    }

    pub fn verbose_logging(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }

    pub fn json_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .is_some_and(|format| format == "json")
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number("service.debounce_ms", self.service.debounce_ms, 1)?;
        validate_range(
            "service.cache_ttl_seconds",
            self.service.cache_ttl_seconds,
            1,
            86_400,
        )?;
        validate_non_empty_string("service.default_country", &self.service.default_country)?;

        if let Some(api) = &self.api {
            validate_url("api.base_url", &api.base_url)?;
            if let Some(timeout) = api.timeout_seconds {
                validate_positive_number("api.timeout_seconds", timeout, 1)?;
            }
            for (name, method) in [
                ("api.methods.email", &api.methods.email),
                ("api.methods.postal_code", &api.methods.postal_code),
                ("api.methods.phone_number", &api.methods.phone_number),
                ("api.methods.birth_date", &api.methods.birth_date),
            ] {
                validate_non_empty_string(name, method)?;
            }
        }

        for rule in &self.rules {
            validate_non_empty_string("rules.field", &rule.field)?;
            validate_length_bounds(&format!("rules.{}", rule.field), rule.min_length, rule.max_length)?;
        }

        if let Some(logging) = &self.logging {
            if let Some(format) = &logging.format {
                let valid_formats = ["compact", "json"];
                if !valid_formats.contains(&format.as_str()) {
                    return Err(ValidatorError::InvalidConfigValueError {
                        field: "logging.format".to_string(),
                        value: format.clone(),
                        reason: format!(
                            "Unsupported format. Valid formats: {}",
                            valid_formats.join(", ")
                        ),
                    });
                }
            }
        }

        let registry = self.build_registry()?;
        self.build_steps()?.validate_against(&registry)?;

        Ok(())
    }
}

impl Validate for ValidatorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::RemoteCheck;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[service]
debounce_ms = 250
default_country = "BE"

[api]
base_url = "https://members.example.org/api/method"
timeout_seconds = 5

[api.methods]
email = "verenigingen.api.validate_email"
"#;

        let config = ValidatorConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        let settings = config.service_settings();
        assert_eq!(settings.debounce, Duration::from_millis(250));
        assert_eq!(settings.cache_ttl, Duration::from_secs(300));
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(10)));
        assert_eq!(settings.default_country, "BE");

        let methods = &config.api.as_ref().unwrap().methods;
        assert_eq!(methods.email, "verenigingen.api.validate_email");
        assert_eq!(methods.postal_code, "validate_postal_code");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ValidatorConfig::from_toml_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.service_settings().debounce, Duration::from_millis(500));
        assert!(config.build_api().is_err());
        assert!(!config.json_logging());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_MEMBERSHIP_API_URL", "https://test.members.org");

        let toml_content = r#"
[api]
base_url = "${TEST_MEMBERSHIP_API_URL}"
"#;

        let config = ValidatorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api.unwrap().base_url, "https://test.members.org");

        std::env::remove_var("TEST_MEMBERSHIP_API_URL");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = ValidatorConfig::from_toml_str("[api]\nbase_url = \"members\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rule_override_keeps_remote_check() {
        let toml_content = r#"
[[rules]]
field = "email"
required = true
max_length = 100
async = true

[[rules]]
field = "nickname"
label = "Nickname"
max_length = 30
pattern = "^[a-z]+$"
"#;

        let config = ValidatorConfig::from_toml_str(toml_content).unwrap();
        let registry = config.build_registry().unwrap();

        let email = registry.get_rule("email").unwrap();
        assert_eq!(email.max_length, Some(100));
        assert_eq!(email.label, "Email");
        assert_eq!(email.remote, Some(RemoteCheck::Email));

        let nickname = registry.get_rule("nickname").unwrap();
        assert!(!nickname.required);
        assert_eq!(registry.len(), 13);
    }

    #[test]
    fn test_bad_rule_pattern_is_a_config_error() {
        let toml_content = r#"
[[rules]]
field = "nickname"
pattern = "(unclosed"
"#;
        let config = ValidatorConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidatorError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_custom_steps() {
        let toml_content = r#"
[steps]
1 = ["firstName", "lastName"]
2 = ["email"]
"#;
        let config = ValidatorConfig::from_toml_str(toml_content).unwrap();
        let steps = config.build_steps().unwrap();
        assert_eq!(steps.fields_for(2).unwrap(), &["email"]);
        assert!(steps.fields_for(3).is_none());

        let unknown = ValidatorConfig::from_toml_str("[steps]\n1 = [\"shoeSize\"]\n").unwrap();
        assert!(unknown.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[service]\nrequest_timeout_seconds = 0\n\n[logging]\nformat = \"json\"\n")
            .unwrap();

        let config = ValidatorConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.service_settings().request_timeout, None);
        assert!(config.json_logging());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/validator.toml");
        let config = ValidatorConfig::from_file(path).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.build_steps().unwrap().fields_for(1).unwrap().len(), 5);
        assert!(config.build_api().is_ok());
    }
}
