use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Trip not found: {id}")]
    TripNotFound { id: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Remote store returned {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("All storage backends failed: {}", attempts.join("; "))]
    AllBackendsFailed { attempts: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::RemoteStatus { .. } | Self::Unauthorized { .. } => {
                ErrorCategory::Network
            }
            Self::IoError(_) | Self::AllBackendsFailed { .. } => ErrorCategory::Storage,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ValidationError { .. }
            | Self::TripNotFound { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ApiError(_) | Self::RemoteStatus { .. } => ErrorSeverity::Medium,
            Self::AllBackendsFailed { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(_) | Self::RemoteStatus { .. } => {
                format!("Could not reach the remote trip store ({})", self)
            }
            Self::Unauthorized { .. } => "The admin password was rejected".to_string(),
            Self::TripNotFound { id } => format!("No trip with id '{}'", id),
            Self::AllBackendsFailed { .. } => {
                "No storage backend is available; nothing was saved".to_string()
            }
            Self::ValidationError { message } => format!("Invalid trip: {}", message),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check the remote endpoint and network connection, or run with --no-remote"
            }
            ErrorCategory::Storage => "Check that the data directory exists and is writable",
            ErrorCategory::Configuration => "Review the configuration file and CLI flags",
            ErrorCategory::Input => "Check the trip dates (YYYY-MM-DD), traveler and country",
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
