use crate::core::custom::IbanValidator;
use crate::domain::ports::CustomValidator;
use crate::utils::error::{Result, ValidatorError};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Remote procedure a field is checked with once its basic checks pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCheck {
    Email,
    PostalCode,
    PhoneNumber,
    BirthDate,
}

impl RemoteCheck {
    pub fn for_field(field_name: &str) -> Option<Self> {
        match field_name {
            "email" => Some(RemoteCheck::Email),
            "postalCode" => Some(RemoteCheck::PostalCode),
            "phone" => Some(RemoteCheck::PhoneNumber),
            "birthDate" => Some(RemoteCheck::BirthDate),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ValidationRule {
    pub field_name: String,
    pub label: String,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub pattern_message: Option<String>,
    pub is_async: bool,
    pub remote: Option<RemoteCheck>,
    pub custom_validator: Option<Arc<dyn CustomValidator>>,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("field_name", &self.field_name)
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(|p| p.as_str()))
            .field("is_async", &self.is_async)
            .field("remote", &self.remote)
            .field("custom_validator", &self.custom_validator.is_some())
            .finish()
    }
}

impl ValidationRule {
    /// Optional, unbounded rule. The remote check is picked from the field name.
    pub fn new(field_name: &str, label: &str) -> Self {
        Self {
            field_name: field_name.to_string(),
            label: label.to_string(),
            required: false,
            min_length: None,
            max_length: None,
            pattern: None,
            pattern_message: None,
            is_async: false,
            remote: RemoteCheck::for_field(field_name),
            custom_validator: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: &str, message: &str) -> Result<Self> {
        self.pattern = Some(Regex::new(pattern)?);
        self.pattern_message = Some(message.to_string());
        Ok(self)
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn custom(mut self, validator: Arc<dyn CustomValidator>) -> Self {
        self.custom_validator = Some(validator);
        self
    }
}

const NAME_PATTERN: &str = r"^[\p{L}\s'\-\.]+$";
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const BIRTH_DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";
const PHONE_PATTERN: &str = r"^\+?[\d\s\-()]{7,20}$";
const IBAN_PATTERN: &str = r"^[A-Za-z]{2}\d{2}[A-Za-z0-9 ]+$";

/// 欄位規則表，保留註冊順序
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<ValidationRule>,
    index: HashMap<String, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn membership_defaults() -> Result<Self> {
        let mut registry = Self::new();

        registry.register(
            ValidationRule::new("firstName", "First name")
                .required()
                .min_length(2)
                .max_length(50)
                .pattern(NAME_PATTERN, "First name contains invalid characters")?,
        );
        registry.register(
            ValidationRule::new("lastName", "Last name")
                .required()
                .min_length(2)
                .max_length(50)
                .pattern(NAME_PATTERN, "Last name contains invalid characters")?,
        );
        registry.register(
            ValidationRule::new("email", "Email")
                .required()
                .max_length(254)
                .pattern(EMAIL_PATTERN, "Please enter a valid email address")?
                .asynchronous(),
        );
        registry.register(
            ValidationRule::new("birthDate", "Birth date")
                .required()
                .pattern(BIRTH_DATE_PATTERN, "Birth date must be in YYYY-MM-DD format")?
                .asynchronous(),
        );
        registry.register(
            ValidationRule::new("address", "Address")
                .required()
                .min_length(5)
                .max_length(200),
        );
        registry.register(
            ValidationRule::new("postalCode", "Postal code")
                .required()
                .max_length(10)
                .asynchronous(),
        );
        registry.register(
            ValidationRule::new("city", "City")
                .required()
                .min_length(2)
                .max_length(100),
        );
        registry.register(ValidationRule::new("country", "Country").required());
        registry.register(ValidationRule::new("membershipType", "Membership type").required());
        registry.register(
            ValidationRule::new("phone", "Phone number")
                .pattern(PHONE_PATTERN, "Please enter a valid phone number")?
                .asynchronous(),
        );
        registry.register(
            ValidationRule::new("iban", "IBAN")
                .required()
                .min_length(15)
                .max_length(42)
                .pattern(IBAN_PATTERN, "IBAN must start with a country code and check digits")?
                .asynchronous()
                .custom(Arc::new(IbanValidator)),
        );
        registry.register(
            ValidationRule::new("accountHolder", "Account holder")
                .required()
                .min_length(2)
                .max_length(100),
        );

        Ok(registry)
    }

    /// Adds a rule, replacing any rule already registered for the same field.
    pub fn register(&mut self, rule: ValidationRule) {
        match self.index.get(&rule.field_name) {
            Some(&position) => self.rules[position] = rule,
            None => {
                self.index.insert(rule.field_name.clone(), self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    pub fn get_rule(&self, field_name: &str) -> Option<&ValidationRule> {
        self.index.get(field_name).map(|&position| &self.rules[position])
    }

    pub fn field_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.field_name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Wizard step number to the fields validated on that page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    steps: BTreeMap<u32, Vec<String>>,
}

impl StepMap {
    pub fn membership_defaults() -> Self {
        let mut map = Self::default();
        map.set_step(1, &["firstName", "lastName", "email", "birthDate"]);
        map.set_step(2, &["address", "postalCode", "city", "country"]);
        map.set_step(3, &["membershipType", "phone"]);
        map.set_step(4, &["iban", "accountHolder"]);
        map
    }

    pub fn set_step<S: AsRef<str>>(&mut self, step: u32, fields: &[S]) {
        self.steps
            .insert(step, fields.iter().map(|f| f.as_ref().to_string()).collect());
    }

    pub fn fields_for(&self, step: u32) -> Option<&[String]> {
        self.steps.get(&step).map(|fields| fields.as_slice())
    }

    pub fn validate_against(&self, registry: &RuleRegistry) -> Result<()> {
        for (step, fields) in &self.steps {
            for field in fields {
                if registry.get_rule(field).is_none() {
                    return Err(ValidatorError::ConfigValidationError {
                        field: format!("steps.{}", step),
                        message: format!("Unknown field '{}'", field),
                    });
                }
            }
        }
        Ok(())
    }
}
