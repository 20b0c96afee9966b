//! Error types for fragweb-core
//!
//! Fetch failures are the only hard error class a refresh can hit; a
//! missing region in an otherwise valid response is a per-region no-op and
//! never surfaces here. The worst failure mode of the whole controller is
//! a stale view, never a crash.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Network or server failure during fetch
    FetchFailed,
    /// Selector could not be parsed
    InvalidSelector,
    /// Required element missing from the live document
    ElementNotFound,
    /// Trigger element lacks a required data attribute
    MissingTriggerData,
    /// Duplicate region identifier
    DuplicateRegion,
    /// Controller misconfiguration
    ConfigError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::FetchFailed => write!(f, "FETCH_FAILED"),
            ErrorCode::InvalidSelector => write!(f, "INVALID_SELECTOR"),
            ErrorCode::ElementNotFound => write!(f, "ELEMENT_NOT_FOUND"),
            ErrorCode::MissingTriggerData => write!(f, "MISSING_TRIGGER_DATA"),
            ErrorCode::DuplicateRegion => write!(f, "DUPLICATE_REGION"),
            ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - the view may be stale
    Warning,
    /// Error - the refresh failed
    Error,
    /// Critical - the controller is misconfigured
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Transport-level failure reported by a `FragmentFetcher`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Server returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Main error type for fragweb-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Selector(#[from] fragweb_dom::DomError),

    #[error("Element not found in live document: {selector}")]
    ElementNotFound { selector: String },

    #[error("Trigger is missing required attribute '{attribute}'")]
    MissingTriggerData { attribute: String },

    #[error("Duplicate region id: {id}")]
    DuplicateRegion { id: String },

    #[error("Controller configuration error: {message}")]
    ConfigError { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Fetch(_) => ErrorCode::FetchFailed,
            CoreError::Selector(_) => ErrorCode::InvalidSelector,
            CoreError::ElementNotFound { .. } => ErrorCode::ElementNotFound,
            CoreError::MissingTriggerData { .. } => ErrorCode::MissingTriggerData,
            CoreError::DuplicateRegion { .. } => ErrorCode::DuplicateRegion,
            CoreError::ConfigError { .. } => ErrorCode::ConfigError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // The refresh failed; the previous view stays valid
            CoreError::Fetch(_) => ErrorSeverity::Error,
            CoreError::Selector(_) => ErrorSeverity::Critical,
            CoreError::ElementNotFound { .. } => ErrorSeverity::Info,
            CoreError::MissingTriggerData { .. } => ErrorSeverity::Warning,
            CoreError::DuplicateRegion { .. } => ErrorSeverity::Critical,
            CoreError::ConfigError { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FetchFailed.to_string(), "FETCH_FAILED");
        assert_eq!(ErrorCode::InvalidSelector.to_string(), "INVALID_SELECTOR");
    }

    #[test]
    fn test_fetch_error_maps_to_code_and_severity() {
        let error = CoreError::Fetch(FetchError::Status {
            status: 500,
            url: "/accounts/1".to_string(),
        });
        assert_eq!(error.code(), ErrorCode::FetchFailed);
        assert_eq!(error.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_config_errors_are_critical() {
        let error = CoreError::DuplicateRegion {
            id: "report-table".to_string(),
        };
        assert_eq!(error.severity(), ErrorSeverity::Critical);
    }
}
