use crate::domain::model::{ValidationContext, ValidationResult};
use crate::domain::ports::CustomValidator;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Local IBAN check (ISO 13616 mod-97) for the payment step.
#[derive(Debug, Clone, Copy, Default)]
pub struct IbanValidator;

impl IbanValidator {
    pub fn normalize(value: &str) -> String {
        value
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    /// 每四碼一組，方便顯示
    fn format(normalized: &str) -> String {
        normalized
            .as_bytes()
            .chunks(4)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn checksum_valid(normalized: &str) -> bool {
        if normalized.len() < 15 || normalized.len() > 34 || !normalized.is_ascii() {
            return false;
        }

        let (head, tail) = normalized.split_at(4);
        let mut remainder: u32 = 0;
        for c in tail.chars().chain(head.chars()) {
            let digits = match c {
                '0'..='9' => c as u32 - '0' as u32,
                'A'..='Z' => c as u32 - 'A' as u32 + 10,
                _ => return false,
            };
            remainder = if digits >= 10 {
                (remainder * 100 + digits) % 97
            } else {
                (remainder * 10 + digits) % 97
            };
        }
        remainder == 1
    }
}

#[async_trait]
impl CustomValidator for IbanValidator {
    async fn validate(&self, value: &str, _context: &ValidationContext) -> Result<ValidationResult> {
        let normalized = Self::normalize(value);

        if !Self::checksum_valid(&normalized) {
            return Ok(ValidationResult {
                valid: false,
                message: Some("IBAN checksum is invalid".to_string()),
                ..ValidationResult::default()
            });
        }

        let result = ValidationResult::ok()
            .with_extra("formatted", serde_json::Value::String(Self::format(&normalized)))
            .with_extra(
                "bank_country",
                serde_json::Value::String(normalized[..2].to_string()),
            );
        Ok(result)
    }
}
