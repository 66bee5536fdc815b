use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Source '{source_name}' failed: {message}")]
    SourceError {
        source_name: String,
        message: String,
    },

    #[error("Alert sink '{sink_name}' failed: {message}")]
    SinkError { sink_name: String, message: String },

    #[error("Model {name} already registered")]
    DuplicateModel { name: String },

    #[error("Model {name} not found")]
    ModelNotFound { name: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Data,
    Configuration,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DetectionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DetectionError::HttpError(_)
            | DetectionError::SourceError { .. }
            | DetectionError::SinkError { .. } => ErrorCategory::Network,
            DetectionError::IoError(_) | DetectionError::ZipError(_) => ErrorCategory::Io,
            DetectionError::CsvError(_)
            | DetectionError::SerializationError(_)
            | DetectionError::ProcessingError { .. }
            | DetectionError::ValidationError { .. } => ErrorCategory::Data,
            DetectionError::ConfigError { .. }
            | DetectionError::ConfigValidationError { .. }
            | DetectionError::InvalidConfigValueError { .. }
            | DetectionError::MissingConfigError { .. } => ErrorCategory::Configuration,
            DetectionError::DuplicateModel { .. } | DetectionError::ModelNotFound { .. } => {
                ErrorCategory::Model
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常可以重試
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Model => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Network)
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DetectionError::HttpError(_) => {
                "Check network connectivity and that the source endpoint is reachable".to_string()
            }
            DetectionError::SourceError { source_name, .. } => format!(
                "Verify the settings of source '{}' (path, endpoint, format)",
                source_name
            ),
            DetectionError::SinkError { sink_name, .. } => format!(
                "Check that alert sink '{}' is reachable and accepts JSON",
                sink_name
            ),
            DetectionError::IoError(_) => {
                "Check file permissions and available disk space".to_string()
            }
            DetectionError::ZipError(_) => {
                "Set output.compress = false to write plain report files".to_string()
            }
            DetectionError::CsvError(_) => {
                "Ensure the CSV header matches the expected columns and timestamps are RFC 3339"
                    .to_string()
            }
            DetectionError::SerializationError(_) => {
                "Ensure the JSON payload matches the expected trade or resolution shape".to_string()
            }
            DetectionError::ConfigError { .. }
            | DetectionError::ConfigValidationError { .. }
            | DetectionError::InvalidConfigValueError { .. } => {
                "Review the TOML configuration file".to_string()
            }
            DetectionError::MissingConfigError { field } => {
                format!("Add the '{}' setting to the configuration", field)
            }
            DetectionError::DuplicateModel { .. } => {
                "Give every [[models]] entry a unique name".to_string()
            }
            DetectionError::ModelNotFound { .. } => {
                "Check model names referenced in [ensemble.weights]".to_string()
            }
            DetectionError::ProcessingError { .. } | DetectionError::ValidationError { .. } => {
                "Inspect the input data for malformed records".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        if let DetectionError::SinkError { .. } = self {
            return format!("Could not deliver alerts: {}", self);
        }
        match self.category() {
            ErrorCategory::Network => format!("Could not read trade data: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Data => format!("Input data problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Model => format!("Model registry problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = DetectionError::SourceError {
            source_name: "trades".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.is_retryable());
        assert!(err.recovery_suggestion().contains("trades"));

        let err = DetectionError::DuplicateModel {
            name: "logit".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Model);
        assert_eq!(err.to_string(), "Model logit already registered");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_sink_errors_mention_delivery() {
        let err = DetectionError::SinkError {
            sink_name: "webhook".to_string(),
            message: "503".to_string(),
        };
        assert_eq!(err.to_string(), "Alert sink 'webhook' failed: 503");
        assert!(err.user_friendly_message().starts_with("Could not deliver alerts"));
        assert!(err.recovery_suggestion().contains("webhook"));
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err: DetectionError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("File system problem"));
    }
}
