use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Remote procedure '{method}' returned HTTP {status}")]
    RemoteStatusError { method: String, status: u16 },

    #[error("Remote validation of '{field}' timed out after {after_ms} ms")]
    TimeoutError { field: String, after_ms: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Form data error: {message}")]
    FormDataError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ValidatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ValidatorError::ApiError(_)
            | ValidatorError::RemoteStatusError { .. }
            | ValidatorError::TimeoutError { .. } => ErrorCategory::Network,
            ValidatorError::ConfigValidationError { .. }
            | ValidatorError::InvalidConfigValueError { .. }
            | ValidatorError::MissingConfigError { .. }
            | ValidatorError::PatternError(_) => ErrorCategory::Configuration,
            ValidatorError::SerializationError(_) | ValidatorError::FormDataError { .. } => {
                ErrorCategory::Data
            }
            ValidatorError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ValidatorError::ApiError(_) => "Check network connectivity and the API base URL",
            ValidatorError::RemoteStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check the API credentials in the [api.headers] section"
            }
            ValidatorError::RemoteStatusError { .. } => {
                "The validation backend rejected the call; retry later"
            }
            ValidatorError::TimeoutError { .. } => {
                "The validation backend is slow; raise service.request_timeout_seconds or retry"
            }
            ValidatorError::PatternError(_) => "Fix the regular expression in the [[rules]] section",
            ValidatorError::ConfigValidationError { .. }
            | ValidatorError::InvalidConfigValueError { .. }
            | ValidatorError::MissingConfigError { .. } => {
                "Review the configuration file against validator.toml"
            }
            ValidatorError::SerializationError(_) | ValidatorError::FormDataError { .. } => {
                "Make sure the applicant data file is a flat JSON or TOML object"
            }
            ValidatorError::IoError(_) => "Check that the file exists and is readable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the validation service: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not read applicant data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
