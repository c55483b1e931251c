use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Template rendering failed: {0}")]
    TemplateError(#[from] askama::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{service} API error: {message}")]
    SourceError { service: String, message: String },

    #[error("{service} rate limit still exceeded after {attempts} attempts")]
    RateLimitError { service: String, attempts: u32 },

    #[error("Calendar parsing error in {file}: {message}")]
    CalendarError { file: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
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

impl ErrorSeverity {
    /// Process exit status for a run that failed with this severity.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl ReviewError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReviewError::ApiError(_)
            | ReviewError::SourceError { .. }
            | ReviewError::RateLimitError { .. } => ErrorCategory::Network,
            ReviewError::ConfigValidationError { .. }
            | ReviewError::MissingConfigError { .. }
            | ReviewError::InvalidConfigValueError { .. }
            | ReviewError::TomlError(_)
            | ReviewError::UrlError(_) => ErrorCategory::Configuration,
            ReviewError::SerializationError(_)
            | ReviewError::CalendarError { .. }
            | ReviewError::ZipError(_)
            | ReviewError::ProcessingError { .. } => ErrorCategory::Data,
            ReviewError::IoError(_) | ReviewError::TemplateError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReviewError::RateLimitError { .. } | ReviewError::ApiError(_) => ErrorSeverity::Medium,
            ReviewError::SourceError { .. }
            | ReviewError::CalendarError { .. }
            | ReviewError::ProcessingError { .. }
            | ReviewError::SerializationError(_)
            | ReviewError::ZipError(_) => ErrorSeverity::High,
            ReviewError::ConfigValidationError { .. }
            | ReviewError::MissingConfigError { .. }
            | ReviewError::InvalidConfigValueError { .. }
            | ReviewError::TomlError(_)
            | ReviewError::UrlError(_) => ErrorSeverity::High,
            ReviewError::IoError(_) | ReviewError::TemplateError(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether the failure is confined to one data source of one member.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            ReviewError::ApiError(_)
                | ReviewError::SourceError { .. }
                | ReviewError::RateLimitError { .. }
                | ReviewError::CalendarError { .. }
                | ReviewError::ZipError(_)
        )
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ReviewError::ApiError(_) => {
                "Check network connectivity and the configured API base URLs".to_string()
            }
            ReviewError::SourceError { service, .. } => {
                format!("Verify the {} token and its scopes", service)
            }
            ReviewError::RateLimitError { .. } => {
                "Wait for the rate limit window to reset, or raise max_retries".to_string()
            }
            ReviewError::ConfigValidationError { field, .. }
            | ReviewError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' entry in the team config file", field)
            }
            ReviewError::UrlError(_) => {
                "Check github_api_url, slack_api_url and member logins".to_string()
            }
            ReviewError::MissingConfigError { field } => {
                format!("Add '{}' to the team config file", field)
            }
            ReviewError::TomlError(_) | ReviewError::SerializationError(_) => {
                "Check the file for syntax errors; delete stale cache files to recollect".to_string()
            }
            ReviewError::CalendarError { .. } | ReviewError::ZipError(_) => {
                "Re-export the calendar as .ics or .zip".to_string()
            }
            ReviewError::IoError(_) => {
                "Check that the data and output directories are writable".to_string()
            }
            ReviewError::TemplateError(_) => "Check the page templates".to_string(),
            ReviewError::ProcessingError { .. } => "Run again with --verbose".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch activity data: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not process activity data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_retryable_network_error() {
        let err = ReviewError::RateLimitError {
            service: "GitHub".to_string(),
            attempts: 3,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.is_source_failure());
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_config_errors_abort_the_run() {
        let err = ReviewError::MissingConfigError {
            field: "team_name".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_source_failure());
        assert!(err.recovery_suggestion().contains("team_name"));
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = ReviewError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_every_severity_exits_non_zero() {
        let rate_limited = ReviewError::RateLimitError {
            service: "Slack".to_string(),
            attempts: 1,
        };
        let bad_config = ReviewError::MissingConfigError {
            field: "members".to_string(),
        };
        let io = ReviewError::from(std::io::Error::other("disk full"));

        assert_eq!(rate_limited.severity().exit_code(), 2);
        assert_eq!(bad_config.severity().exit_code(), 1);
        assert_eq!(io.severity().exit_code(), 3);
    }
}
