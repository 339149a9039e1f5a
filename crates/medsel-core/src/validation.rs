//! # Validation Module
//!
//! Business-rule checks for individual selections and for the order as a
//! whole. Findings are values, not failures: they are stored on the state and
//! it is up to the caller to block checkout on errors.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per selection                                                          │
//! │  ├── ERROR    no pharmacy bound                                         │
//! │  ├── ERROR    quantity ≤ 0                                              │
//! │  ├── ERROR    quantity > pharmacy stock                                 │
//! │  ├── WARNING  pharmacy closed                                           │
//! │  ├── WARNING  pharmacy marks the medicine unavailable                   │
//! │  ├── WARNING  quantity deviates from prescription (rules.rs)            │
//! │  └── WARNING  alternative in place of the prescribed medicine           │
//! │                                                                         │
//! │  Whole order (selected records only)                                    │
//! │  ├── all per-selection findings, deduplicated by value                  │
//! │  ├── ERROR    something is selected but nothing is completed            │
//! │  └── WARNING  n selected medicine(s) still need pharmacy selection      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::rules::SelectionRules;
use crate::selection::MedicineSelection;

// =============================================================================
// Issue Types
// =============================================================================

/// How much an issue matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks validity.
    Error,
    /// Advisory only.
    Warning,
}

/// A single validation finding.
///
/// Equality is by value, so the same finding raised twice collapses to one
/// entry in a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Error, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationIssue {
    #[error("{medicine}: please select a pharmacy")]
    MissingPharmacy { medicine: String },

    #[error("{medicine}: quantity must be greater than zero")]
    NonPositiveQuantity { medicine: String },

    #[error("{medicine}: quantity {requested} exceeds available stock ({available} available)")]
    ExceedsStock {
        medicine: String,
        requested: i64,
        available: i64,
    },

    #[error("{medicine}: {pharmacy} is currently closed")]
    PharmacyClosed { medicine: String, pharmacy: String },

    #[error("{medicine}: {pharmacy} reports this medicine as unavailable")]
    MarkedUnavailable { medicine: String, pharmacy: String },

    #[error("{medicine}: quantity {selected} differs significantly from prescribed amount ({prescribed})")]
    QuantityDeviation {
        medicine: String,
        selected: i64,
        prescribed: i64,
    },

    #[error("{medicine}: alternative {alternative} selected, please consult your pharmacist")]
    AlternativeSelected { medicine: String, alternative: String },

    #[error("No selected medicine has a pharmacy assigned yet")]
    NoCompletedSelections,

    #[error("{count} selected medicine(s) still need pharmacy selection")]
    PendingPharmacySelection { count: usize },
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            ValidationIssue::MissingPharmacy { .. }
            | ValidationIssue::NonPositiveQuantity { .. }
            | ValidationIssue::ExceedsStock { .. }
            | ValidationIssue::NoCompletedSelections => Severity::Error,
            ValidationIssue::PharmacyClosed { .. }
            | ValidationIssue::MarkedUnavailable { .. }
            | ValidationIssue::QuantityDeviation { .. }
            | ValidationIssue::AlternativeSelected { .. }
            | ValidationIssue::PendingPharmacySelection { .. } => Severity::Warning,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

// =============================================================================
// Report
// =============================================================================

/// Errors and warnings, each deduplicated and kept in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub is_valid: bool,
}

impl Default for ValidationReport {
    fn default() -> Self {
        ValidationReport {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }
}

impl ValidationReport {
    /// Builds a report, dropping repeated issues.
    pub fn from_issues<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        let mut seen = HashSet::new();
        let mut report = ValidationReport::default();
        for issue in issues {
            if !seen.insert(issue.clone()) {
                continue;
            }
            match issue.severity() {
                Severity::Error => report.errors.push(issue),
                Severity::Warning => report.warnings.push(issue),
            }
        }
        report.is_valid = report.errors.is_empty();
        report
    }

    /// Rendered messages, errors first.
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .map(ToString::to_string)
            .collect()
    }
}

// =============================================================================
// Per-Selection Validation
// =============================================================================

/// Evaluates the per-selection rules in order: errors first, then warnings.
pub fn validate_selection(selection: &MedicineSelection, rules: &SelectionRules) -> Vec<ValidationIssue> {
    let medicine = selection.selected_medicine.name.clone();
    let mut issues = Vec::new();

    if selection.selected_pharmacy.is_none() {
        issues.push(ValidationIssue::MissingPharmacy {
            medicine: medicine.clone(),
        });
    }

    if selection.selected_quantity <= 0 {
        issues.push(ValidationIssue::NonPositiveQuantity {
            medicine: medicine.clone(),
        });
    }

    if let Some(pharmacy) = &selection.selected_pharmacy {
        let available = pharmacy.stock_info.stock_quantity;
        if selection.selected_quantity > available {
            issues.push(ValidationIssue::ExceedsStock {
                medicine: medicine.clone(),
                requested: selection.selected_quantity,
                available,
            });
        }

        if !pharmacy.is_open {
            issues.push(ValidationIssue::PharmacyClosed {
                medicine: medicine.clone(),
                pharmacy: pharmacy.label().to_string(),
            });
        }

        if !pharmacy.stock_info.is_available {
            issues.push(ValidationIssue::MarkedUnavailable {
                medicine: medicine.clone(),
                pharmacy: pharmacy.label().to_string(),
            });
        }
    }

    if rules.deviates(selection.selected_quantity, selection.prescribed_quantity) {
        issues.push(ValidationIssue::QuantityDeviation {
            medicine: medicine.clone(),
            selected: selection.selected_quantity,
            prescribed: selection.prescribed_quantity,
        });
    }

    if let Some(alternative) = &selection.selected_alternative {
        issues.push(ValidationIssue::AlternativeSelected {
            medicine: selection.original_medicine.name.clone(),
            alternative: alternative.name.clone(),
        });
    }

    issues
}

// =============================================================================
// Whole-Order Validation
// =============================================================================

/// Validates every selected record plus the order-level checks.
///
/// Deselected records are not part of the order and contribute nothing.
pub fn validate_selections(
    selections: &BTreeMap<String, MedicineSelection>,
    rules: &SelectionRules,
) -> ValidationReport {
    let selected: Vec<&MedicineSelection> = selections.values().filter(|s| s.is_selected).collect();
    let completed = selected.iter().filter(|s| s.is_completed()).count();
    let pending = selected.len() - completed;

    let mut issues: Vec<ValidationIssue> = selected
        .iter()
        .flat_map(|s| validate_selection(s, rules))
        .collect();

    if !selected.is_empty() && completed == 0 {
        issues.push(ValidationIssue::NoCompletedSelections);
    }
    if pending > 0 {
        issues.push(ValidationIssue::PendingPharmacySelection { count: pending });
    }

    ValidationReport::from_issues(issues)
}

// =============================================================================
// Unit Tests
// =============================================================================
