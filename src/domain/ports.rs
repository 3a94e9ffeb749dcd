use crate::domain::model::{ValidationContext, ValidationResult};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Remote procedures the backend exposes for checks that need server data.
/// An `Err` is a transport/remote failure; the service turns it into a soft
/// network result.
#[async_trait]
pub trait ValidationApi: Send + Sync {
    async fn validate_email(&self, value: &str) -> Result<ValidationResult>;
    async fn validate_postal_code(&self, value: &str, country: &str) -> Result<ValidationResult>;
    async fn validate_phone_number(&self, value: &str, country: &str) -> Result<ValidationResult>;
    async fn validate_birth_date(&self, value: &str) -> Result<ValidationResult>;
}

/// Field-specific check that replaces the remote call for its rule.
#[async_trait]
pub trait CustomValidator: Send + Sync {
    async fn validate(&self, value: &str, context: &ValidationContext) -> Result<ValidationResult>;
}
