//! # Selection Commands
//!
//! Command functions the front end invokes against one session.
//!
//! ## Selection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Selection Lifecycle                                  │
//! │                                                                         │
//! │  ┌──────────┐     ┌────────────┐     ┌────────────┐     ┌──────────┐   │
//! │  │  Loaded  │────►│ Selecting  │────►│  Complete  │────►│ Checkout │   │
//! │  │  lines   │     │            │     │            │     │          │   │
//! │  └──────────┘     └────────────┘     └────────────┘     └──────────┘   │
//! │       │                 │                                    ▲          │
//! │  initialize_       select_medicine                    checkout_         │
//! │  selections        choose_alternative                 readiness         │
//! │                    choose_pharmacy                                      │
//! │                    change_quantity / change_packaging                   │
//! │                    update_notes                                         │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                    clear_selections ─────────► (back to empty)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command returns the full [`SelectionResponse`]. An unknown medicine
//! id leaves the session untouched and comes back as `NOT_FOUND`.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use medsel_core::input::{medicines_from_lines, parse_prescription};
use medsel_core::{Medicine, Packaging, SelectionAggregator, SelectionState};

use crate::config::SessionConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionHandle;

/// Totals pre-formatted with the configured currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedTotals {
    pub total_price: String,
    pub total_delivery_fees: String,
    pub grand_total: String,
}

/// Session snapshot returned by every command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub state: SelectionState,
    pub totals: FormattedTotals,
    pub can_proceed_to_checkout: bool,
}

impl SelectionResponse {
    pub fn from_aggregator(aggregator: &SelectionAggregator, config: &SessionConfig) -> Self {
        let state = aggregator.snapshot();
        SelectionResponse {
            totals: FormattedTotals {
                total_price: config.format_money(state.total_price),
                total_delivery_fees: config.format_money(state.total_delivery_fees),
                grand_total: config.format_money(state.grand_total),
            },
            can_proceed_to_checkout: state.can_proceed_to_checkout(),
            state,
        }
    }
}

/// Runs one per-medicine transition; `false` from the aggregator means the
/// medicine is unknown.
fn on_medicine<F>(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: &str,
    f: F,
) -> ApiResult<SelectionResponse>
where
    F: FnOnce(&mut SelectionAggregator) -> bool,
{
    session.with_session_mut(|agg| {
        if !f(agg) {
            return Err(ApiError::not_found("Medicine", medicine_id));
        }
        Ok(SelectionResponse::from_aggregator(agg, config))
    })?
}

// =============================================================================
// Commands
// =============================================================================

/// Gets the current selections and totals.
pub fn get_selections(session: &SessionHandle, config: &SessionConfig) -> ApiResult<SelectionResponse> {
    debug!(session_id = %session.id(), "get_selections command");
    session.with_session(|agg| SelectionResponse::from_aggregator(agg, config))
}

/// Seeds the session from the prescription loader's JSON payload.
///
/// Lines without an identifier are skipped; a payload that is not a JSON
/// array of lines is rejected with `VALIDATION_ERROR`.
///
/// ## Arguments
/// * `payload` - loader output, e.g. `[{"medicineId": "m1", "pharmacyStock": [...]}]`
/// * `prescribed_quantities` - per-medicine prescribed amounts
pub fn initialize_selections(
    session: &SessionHandle,
    config: &SessionConfig,
    payload: &str,
    prescribed_quantities: HashMap<String, i64>,
) -> ApiResult<SelectionResponse> {
    let lines = parse_prescription(payload)?;
    debug!(session_id = %session.id(), lines = lines.len(), "initialize_selections command");

    let medicines = medicines_from_lines(lines);
    session.with_session_mut(|agg| {
        agg.initialize(medicines, &prescribed_quantities);
        SelectionResponse::from_aggregator(agg, config)
    })
}

/// Includes or excludes a medicine from the order.
pub fn select_medicine(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: &str,
    is_selected: bool,
) -> ApiResult<SelectionResponse> {
    debug!(medicine_id, is_selected, "select_medicine command");
    on_medicine(session, config, medicine_id, |agg| agg.set_selected(medicine_id, is_selected))
}

/// Swaps in an alternative, or restores the prescribed medicine with `None`.
pub fn choose_alternative(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: &str,
    alternative: Option<Medicine>,
) -> ApiResult<SelectionResponse> {
    debug!(
        medicine_id,
        alternative = ?alternative.as_ref().map(|m| &m.id),
        "choose_alternative command"
    );
    on_medicine(session, config, medicine_id, |agg| agg.set_alternative(medicine_id, alternative))
}

/// Binds a pharmacy by id from the medicine's offers, or clears it with `None`.
pub fn choose_pharmacy(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: &str,
    pharmacy_id: Option<&str>,
) -> ApiResult<SelectionResponse> {
    debug!(medicine_id, ?pharmacy_id, "choose_pharmacy command");

    session.with_session_mut(|agg| {
        if !agg.state().contains(medicine_id) {
            return Err(ApiError::not_found("Medicine", medicine_id));
        }
        match pharmacy_id {
            Some(pharmacy_id) => {
                if !agg.set_pharmacy_by_id(medicine_id, pharmacy_id) {
                    return Err(ApiError::not_found(
                        "Pharmacy offer",
                        &format!("{} for {}", pharmacy_id, medicine_id),
                    ));
                }
            }
            None => {
                agg.set_pharmacy(medicine_id, None);
            }
        }
        Ok(SelectionResponse::from_aggregator(agg, config))
    })?
}

/// Sets the dispensed unit count (values below 1 become 1).
pub fn change_quantity(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: &str,
    quantity: i64,
) -> ApiResult<SelectionResponse> {
    debug!(medicine_id, quantity, "change_quantity command");
    on_medicine(session, config, medicine_id, |agg| agg.set_quantity(medicine_id, quantity))
}

/// Chooses box or blister packaging and how many.
///
/// ## Arguments
/// * `packaging` - "box" or "blister" (also "pack", "strip")
/// * `packaging_quantity` - number of packaging units (default: 1)
pub fn change_packaging(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: &str,
    packaging: &str,
    packaging_quantity: Option<i64>,
) -> ApiResult<SelectionResponse> {
    let packaging: Packaging = packaging.parse().map_err(ApiError::validation)?;
    let packaging_quantity = packaging_quantity.unwrap_or(1);
    debug!(medicine_id, %packaging, packaging_quantity, "change_packaging command");

    on_medicine(session, config, medicine_id, |agg| {
        agg.set_packaging(medicine_id, packaging, packaging_quantity)
    })
}

pub fn update_notes(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: &str,
    notes: String,
) -> ApiResult<SelectionResponse> {
    debug!(medicine_id, "update_notes command");
    on_medicine(session, config, medicine_id, |agg| agg.set_notes(medicine_id, notes))
}

/// Re-runs validation for one medicine, or for everything with `None`.
pub fn validate_selections(
    session: &SessionHandle,
    config: &SessionConfig,
    medicine_id: Option<&str>,
) -> ApiResult<SelectionResponse> {
    debug!(?medicine_id, "validate_selections command");
    match medicine_id {
        Some(id) => on_medicine(session, config, id, |agg| agg.validate_one(id)),
        None => session.with_session_mut(|agg| {
            agg.validate_all();
            SelectionResponse::from_aggregator(agg, config)
        }),
    }
}

pub fn clear_selections(session: &SessionHandle, config: &SessionConfig) -> ApiResult<SelectionResponse> {
    debug!(session_id = %session.id(), "clear_selections command");
    session.with_session_mut(|agg| {
        agg.clear();
        SelectionResponse::from_aggregator(agg, config)
    })
}

/// Records that the host has persisted the current selections.
pub fn mark_saved(session: &SessionHandle, config: &SessionConfig) -> ApiResult<SelectionResponse> {
    debug!(session_id = %session.id(), "mark_saved command");
    session.with_session_mut(|agg| {
        agg.mark_saved();
        SelectionResponse::from_aggregator(agg, config)
    })
}

/// Succeeds only when every selected medicine is bound and the order has no
/// error-level findings; otherwise `CHECKOUT_BLOCKED` with those errors.
///
/// Warnings never block.
pub fn checkout_readiness(session: &SessionHandle, config: &SessionConfig) -> ApiResult<SelectionResponse> {
    debug!(session_id = %session.id(), "checkout_readiness command");
    session.with_session(|agg| {
        let response = SelectionResponse::from_aggregator(agg, config);
        if response.can_proceed_to_checkout && response.state.validation.is_valid {
            return Ok(response);
        }
        let reasons: Vec<String> = response
            .state
            .validation
            .errors
            .iter()
            .map(ToString::to_string)
            .collect();
        Err(ApiError::checkout_blocked(&reasons))
    })?
}

// =============================================================================
// Unit Tests
// =============================================================================
