use crate::core::rules::ValidationRule;
use crate::domain::model::{FailureKind, ValidationResult};

/// Required, length and pattern checks. The first failing check wins.
pub fn check_basic(field_name: &str, raw_value: &str, rule: &ValidationRule) -> ValidationResult {
    let value = raw_value.trim();

    if value.is_empty() {
        if rule.required {
            tracing::debug!("{}: required value missing", field_name);
            return ValidationResult::failure(
                FailureKind::Required,
                format!("{} is required", rule.label),
            );
        }
        return ValidationResult::ok();
    }

    let length = value.chars().count();

    if let Some(min) = rule.min_length {
        if length < min {
            return ValidationResult::failure(
                FailureKind::MinLength,
                format!("{} must be at least {} characters", rule.label, min),
            );
        }
    }

    if let Some(max) = rule.max_length {
        if length > max {
            return ValidationResult::failure(
                FailureKind::MaxLength,
                format!("{} must be no more than {} characters", rule.label, max),
            );
        }
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(value) {
            let message = rule
                .pattern_message
                .clone()
                .unwrap_or_else(|| format!("{} format is invalid", rule.label));
            return ValidationResult::failure(FailureKind::Pattern, message);
        }
    }

    ValidationResult::ok()
}
