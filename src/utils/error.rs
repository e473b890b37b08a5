use thiserror::Error;

#[derive(Error, Debug)]
pub enum GardenError {
    #[error("Invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Garden store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Refused to fetch {url}: {reason}")]
    UnsafeUrl { url: String, reason: String },

    #[error("Outbound fetch failed: {message}")]
    FetchFailed { message: String },

    #[error("Payload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for `{field}`: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value `{value}` for `{field}`: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration `{field}`")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Security,
    Network,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GardenError {
    pub fn invalid_argument(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument { .. } | Self::SerializationError(_) => ErrorCategory::Input,
            Self::UnsafeUrl { .. } | Self::PayloadTooLarge { .. } => ErrorCategory::Security,
            Self::FetchFailed { .. } | Self::ApiError(_) => ErrorCategory::Network,
            Self::StoreUnavailable { .. } | Self::IoError(_) => ErrorCategory::Storage,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        if let Self::IoError(_) = self {
            return ErrorSeverity::Critical;
        }
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Security => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
        }
    }

    /// Status code the HTTP layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument { .. }
            | Self::UnsafeUrl { .. }
            | Self::PayloadTooLarge { .. }
            | Self::SerializationError(_) => 400,
            Self::FetchFailed { .. } | Self::ApiError(_) => 502,
            Self::StoreUnavailable { .. } => 503,
            _ => 500,
        }
    }

    /// Message that is safe to show to an end user. Internal causes are never included.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InvalidArgument { field, reason } => format!("Invalid {}: {}", field, reason),
            Self::StoreUnavailable { .. } => "Garden search is temporarily unavailable".to_string(),
            Self::UnsafeUrl { .. } => "Invalid or unsafe image URL".to_string(),
            Self::FetchFailed { .. } | Self::ApiError(_) => {
                "Failed to fetch image from URL".to_string()
            }
            Self::PayloadTooLarge { limit } => {
                format!("Image too large (max {})", human_size(*limit))
            }
            Self::SerializationError(_) => "Malformed data".to_string(),
            Self::IoError(_) => "Internal storage error".to_string(),
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the query parameters and try again",
            ErrorCategory::Security => "Use a publicly reachable http(s) URL",
            ErrorCategory::Network => "Retry later; the remote host may be down",
            ErrorCategory::Storage => "Check the garden store connection and retry",
            ErrorCategory::Configuration => "Fix the configuration file and restart",
        }
    }
}

fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    match bytes {
        b if b >= MIB && b % MIB == 0 => format!("{}MB", b / MIB),
        b if b >= MIB => format!("{:.1}MB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{}KB", b / KIB),
        b => format!("{} bytes", b),
    }
}

pub type Result<T> = std::result::Result<T, GardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GardenError::invalid_argument("latitude", "out of range").status_code(), 400);
        let unsafe_url = GardenError::UnsafeUrl {
            url: "http://10.0.0.1".to_string(),
            reason: "private address".to_string(),
        };
        assert_eq!(unsafe_url.status_code(), 400);
        let store = GardenError::StoreUnavailable {
            message: "connection refused".to_string(),
        };
        assert_eq!(store.status_code(), 503);
    }

    #[test]
    fn test_user_message_hides_internal_cause() {
        let store = GardenError::StoreUnavailable {
            message: "password authentication failed for user postgres".to_string(),
        };
        assert!(!store.user_friendly_message().contains("postgres"));

        let unsafe_url = GardenError::UnsafeUrl {
            url: "http://169.254.169.254/latest".to_string(),
            reason: "link-local address".to_string(),
        };
        assert!(!unsafe_url.user_friendly_message().contains("169.254"));
    }

    #[test]
    fn test_payload_limit_message_uses_readable_unit() {
        let message = |limit| GardenError::PayloadTooLarge { limit }.user_friendly_message();
        assert_eq!(message(10 * 1024 * 1024), "Image too large (max 10MB)");
        assert_eq!(message(1536 * 1024), "Image too large (max 1.5MB)");
        assert_eq!(message(512 * 1024), "Image too large (max 512KB)");
        assert_eq!(message(16), "Image too large (max 16 bytes)");
    }

    #[test]
    fn test_severity_ordering() {
        let config = GardenError::MissingConfigError {
            field: "store.gardens_file".to_string(),
        };
        assert!(config.severity() > GardenError::invalid_argument("limit", "zero").severity());
    }
}
