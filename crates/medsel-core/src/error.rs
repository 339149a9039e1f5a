//! # Error Types
//!
//! Errors raised by medsel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  medsel-core (this file)                                               │
//! │  ├── CoreError   - rule misconfiguration, wrapped input errors         │
//! │  └── InputError  - a prescription line that cannot become a Medicine   │
//! │                                                                         │
//! │  medsel-core (validation.rs)                                           │
//! │  └── ValidationIssue - business-rule findings; reported, never raised  │
//! │                                                                         │
//! │  medsel-session                                                        │
//! │  └── ApiError    - what the front end sees (code + message)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Selection operations themselves never return errors: an unknown medicine
//! id is a no-op and business-rule violations land in the validation report.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Selection rules that would break quantity arithmetic.
    #[error("Invalid selection rules: {reason}")]
    InvalidRules { reason: String },

    /// Input normalisation failure.
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),
}

/// Failures turning loader output into typed medicines and offers.
#[derive(Debug, Error)]
pub enum InputError {
    /// The line carried neither `id` nor `medicineId` (or only whitespace).
    #[error("prescription line {index} has no medicine identifier")]
    MissingIdentifier { index: usize },

    /// A nested stock entry carried no pharmacy/provider identifier.
    #[error("stock entry {index} for medicine {medicine_id} has no pharmacy identifier")]
    MissingPharmacyIdentifier { medicine_id: String, index: usize },

    /// The payload was not the expected JSON shape at all.
    #[error("malformed prescription payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
