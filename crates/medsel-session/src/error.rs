//! # API Error Type
//!
//! Unified error type for session commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in MedSel                                 │
//! │                                                                         │
//! │  Front end                   Rust host                                  │
//! │  ─────────                   ─────────                                  │
//! │                                                                         │
//! │  invoke('choose_pharmacy')                                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<SelectionResponse, ApiError>                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Unknown medicine? ──── ApiError::not_found ───────┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Bad payload? ──── CoreError::Input ──────────── ApiError ─────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  catch (e) { e.code === 'CHECKOUT_BLOCKED' ... }                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation findings are not errors: they travel inside the response.
//! Only `checkout_readiness` turns blocking findings into `CHECKOUT_BLOCKED`.

use serde::Serialize;
use thiserror::Error;

use medsel_core::{CoreError, InputError};

/// API error returned from session commands.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Medicine not found: m7" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown session, medicine or pharmacy offer
    NotFound,

    /// Malformed command input
    ValidationError,

    /// Checkout requested while selections are incomplete
    CheckoutBlocked,

    /// Configuration could not be loaded or is invalid
    ConfigError,

    /// Lock poisoning and other host failures
    Internal,
}

/// Convenience alias for command results.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Lists every blocking reason in one message.
    pub fn checkout_blocked(reasons: &[String]) -> Self {
        let message = if reasons.is_empty() {
            "Cannot proceed to checkout: no medicines selected".to_string()
        } else {
            format!("Cannot proceed to checkout: {}", reasons.join("; "))
        };
        ApiError::new(ErrorCode::CheckoutBlocked, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRules { reason } => {
                tracing::error!(%reason, "Session rules rejected");
                ApiError::new(ErrorCode::ConfigError, format!("Invalid selection rules: {}", reason))
            }
            CoreError::Input(e) => ApiError::from(e),
        }
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!(error = %err, "Configuration error");
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Failures loading, saving or validating [`crate::config::SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available on this platform")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_json_shape() {
        let err = ApiError::not_found("Medicine", "m7");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Medicine not found: m7");
    }

    #[test]
    fn test_checkout_blocked_lists_reasons() {
        let err = ApiError::checkout_blocked(&[
            "Aspirin: please select a pharmacy".to_string(),
            "1 selected medicine(s) still need pharmacy selection".to_string(),
        ]);
        assert_eq!(err.code, ErrorCode::CheckoutBlocked);
        assert!(err.message.contains("Aspirin: please select a pharmacy; 1 selected"));

        let empty = ApiError::checkout_blocked(&[]);
        assert!(empty.message.ends_with("no medicines selected"));
    }

    #[test]
    fn test_core_errors_convert() {
        let err: ApiError = CoreError::from(InputError::MissingIdentifier { index: 2 }).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("prescription line 2"));

        let err: ApiError = CoreError::InvalidRules {
            reason: "blisters_per_box must be at least 1".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
