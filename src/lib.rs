pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::http::HttpValidationApi;
pub use config::ValidatorConfig;
pub use crate::core::binder::{FeedbackState, FieldBinding, FieldElement, FieldEvent};
pub use crate::core::rules::{RuleRegistry, StepMap, ValidationRule};
pub use crate::core::service::{ServiceSettings, ValidationService};
pub use domain::model::{BatchReport, FailureKind, FormData, ValidationContext, ValidationResult};
pub use domain::ports::{CustomValidator, ValidationApi};
pub use utils::error::{Result, ValidatorError};
