pub mod basic;
pub mod binder;
pub mod cache;
pub mod custom;
pub mod debounce;
pub mod rules;
pub mod service;

pub use crate::domain::model::{
    BatchReport, FailureKind, FormData, ValidationContext, ValidationResult, ValidationStats,
};
pub use crate::domain::ports::{CustomValidator, ValidationApi};
pub use crate::utils::error::Result;
