//! # Selection Aggregator
//!
//! Owns one [`MedicineSelection`] per prescribed medicine and keeps every
//! derived figure (totals, delivery fees, completion, validation) consistent
//! with the current choices.
//!
//! ## State Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Selection Session Lifecycle                          │
//! │                                                                         │
//! │  prescription lines ──► initialize() ──► SelectionState                 │
//! │                                               │                         │
//! │        set_selected / set_alternative         │                         │
//! │        set_pharmacy / set_quantity       ◄────┤  each call:             │
//! │        set_packaging / clear                  │   1. mutate one record  │
//! │                                               │   2. stamp lastUpdated  │
//! │                                               │   3. recompute()        │
//! │                                               │   4. notify observers   │
//! │        set_notes  ── (no recompute) ──────────┤                         │
//! │        mark_saved ── (isDirty = false) ───────┤                         │
//! │                                               ▼                         │
//! │                         can_proceed_to_checkout() ──► checkout          │
//! │                                                                         │
//! │  Unknown medicine ids are no-ops: nothing changes, nobody is notified.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recompute
//! ```text
//! for each selected record with a pharmacy (in medicine-id order):
//!     total_price      += packaging price × packaging quantity
//!     first time this pharmacy is seen:
//!         total_delivery_fees += its delivery fee
//!         slowest "X-Y mins" upper bound wins estimated_delivery_time
//! grand_total = total_price + total_delivery_fees
//! completion  = bound / selected × 100   (0 when nothing is selected)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::input::{medicines_from_lines, PrescriptionLine};
use crate::money::Money;
use crate::observer::{SelectionEvent, SelectionObserver};
use crate::rules::SelectionRules;
use crate::types::{Medicine, Packaging, PharmacyOffer};
use crate::validation::{validate_selection, validate_selections, ValidationIssue, ValidationReport};

/// Time source for `lastUpdated` / `lastSaved`.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// =============================================================================
// Medicine Selection
// =============================================================================

/// The choices made for one prescribed medicine.
///
/// ## Invariants
/// - `medicine_id` never changes after initialization
/// - `selected_quantity >= 1`
/// - `is_selected == false` implies `selected_pharmacy == None`
/// - `is_valid` mirrors `validation_errors.is_empty()` as of the last recompute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MedicineSelection {
    pub medicine_id: String,

    /// The medicine as prescribed.
    pub original_medicine: Medicine,

    /// What will actually be dispensed: the original or the alternative.
    pub selected_medicine: Medicine,

    pub selected_alternative: Option<Medicine>,
    pub selected_pharmacy: Option<PharmacyOffer>,

    /// Dispensed unit count.
    pub selected_quantity: i64,

    /// Quantity on the prescription; only drives the deviation warning.
    pub prescribed_quantity: i64,

    pub selected_packaging: Packaging,

    /// Boxes or blisters ordered.
    pub packaging_quantity: i64,

    pub notes: String,
    pub is_selected: bool,

    pub is_valid: bool,
    pub validation_errors: Vec<ValidationIssue>,
    pub validation_warnings: Vec<ValidationIssue>,

    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl MedicineSelection {
    /// A fresh record: selected, one box, quantity as prescribed, no pharmacy.
    pub fn new(medicine: Medicine, prescribed_quantity: i64, now: DateTime<Utc>) -> Self {
        let prescribed_quantity = prescribed_quantity.max(1);
        MedicineSelection {
            medicine_id: medicine.id.clone(),
            selected_medicine: medicine.clone(),
            original_medicine: medicine,
            selected_alternative: None,
            selected_pharmacy: None,
            selected_quantity: prescribed_quantity,
            prescribed_quantity,
            selected_packaging: Packaging::Box,
            packaging_quantity: 1,
            notes: String::new(),
            is_selected: true,
            is_valid: false,
            validation_errors: Vec::new(),
            validation_warnings: Vec::new(),
            last_updated: now,
        }
    }

    /// Selected, pharmacy-bound and with a positive quantity.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.is_selected && self.selected_pharmacy.is_some() && self.selected_quantity > 0
    }

    /// Price of this line at the bound pharmacy; zero when unbound.
    pub fn line_total(&self) -> Money {
        self.selected_pharmacy
            .as_ref()
            .map(|p| p.price_of(self.selected_packaging, self.packaging_quantity))
            .unwrap_or_default()
    }

    fn revalidate(&mut self, rules: &SelectionRules) {
        let (errors, warnings): (Vec<_>, Vec<_>) = validate_selection(self, rules)
            .into_iter()
            .partition(ValidationIssue::is_error);
        self.is_valid = errors.is_empty();
        self.validation_errors = errors;
        self.validation_warnings = warnings;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = self.last_updated.max(now);
    }
}

// =============================================================================
// Aggregate State
// =============================================================================

/// Everything the UI and checkout read: the records plus derived figures.
///
/// Derived fields are only ever written by the aggregator's recompute pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    #[ts(as = "String")]
    pub session_id: Uuid,

    pub selections: BTreeMap<String, MedicineSelection>,

    pub total_price: Money,
    pub total_delivery_fees: Money,
    pub grand_total: Money,

    /// Pharmacies bound to selected records, first-seen order.
    pub pharmacies_involved: Vec<String>,

    /// Slowest estimate among involved pharmacies; empty when none.
    pub estimated_delivery_time: String,

    pub completion_percentage: f64,
    pub is_complete: bool,

    pub validation: ValidationReport,

    pub is_dirty: bool,

    #[ts(as = "Option<String>")]
    pub last_saved: Option<DateTime<Utc>>,
}

impl SelectionState {
    /// Empty state for a brand-new session.
    pub fn new() -> Self {
        Self::for_session(Uuid::new_v4())
    }

    /// Empty state bound to an existing session id.
    pub fn for_session(session_id: Uuid) -> Self {
        SelectionState {
            session_id,
            selections: BTreeMap::new(),
            total_price: Money::zero(),
            total_delivery_fees: Money::zero(),
            grand_total: Money::zero(),
            pharmacies_involved: Vec::new(),
            estimated_delivery_time: String::new(),
            completion_percentage: 0.0,
            is_complete: false,
            validation: ValidationReport::default(),
            is_dirty: false,
            last_saved: None,
        }
    }

    pub fn get(&self, medicine_id: &str) -> Option<&MedicineSelection> {
        self.selections.get(medicine_id)
    }

    pub fn contains(&self, medicine_id: &str) -> bool {
        self.selections.contains_key(medicine_id)
    }

    pub fn selected_count(&self) -> usize {
        self.selections.values().filter(|s| s.is_selected).count()
    }

    pub fn completed_count(&self) -> usize {
        self.selections.values().filter(|s| s.is_completed()).count()
    }

    /// At least one selected record, and every selected record has a pharmacy
    /// and a positive quantity.
    pub fn can_proceed_to_checkout(&self) -> bool {
        let mut selected = self.selections.values().filter(|s| s.is_selected).peekable();
        selected.peek().is_some() && selected.all(MedicineSelection::is_completed)
    }
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// One prescription-fulfillment session.
///
/// Single writer: every method is a complete synchronous transition. Hosts
/// that share an instance across threads wrap the whole aggregator in one
/// lock (see medsel-session).
pub struct SelectionAggregator {
    state: SelectionState,
    rules: SelectionRules,
    clock: Clock,
    observers: Vec<Box<dyn SelectionObserver>>,
}

impl fmt::Debug for SelectionAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionAggregator")
            .field("state", &self.state)
            .field("rules", &self.rules)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for SelectionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionAggregator {
    /// New session with default rules and the system clock.
    pub fn new() -> Self {
        SelectionAggregator {
            state: SelectionState::new(),
            rules: SelectionRules::default(),
            clock: Arc::new(Utc::now),
            observers: Vec::new(),
        }
    }

    /// New session with custom rules.
    pub fn with_rules(rules: SelectionRules) -> CoreResult<Self> {
        rules.validate()?;
        Ok(SelectionAggregator {
            rules,
            ..Self::new()
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Pins the session id (e.g. to the host's registry key).
    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.state.session_id = session_id;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn SelectionObserver>) {
        self.observers.push(observer);
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn snapshot(&self) -> SelectionState {
        self.state.clone()
    }

    pub fn rules(&self) -> &SelectionRules {
        &self.rules
    }

    pub fn session_id(&self) -> Uuid {
        self.state.session_id
    }

    pub fn selection(&self, medicine_id: &str) -> Option<&MedicineSelection> {
        self.state.get(medicine_id)
    }

    pub fn can_proceed_to_checkout(&self) -> bool {
        self.state.can_proceed_to_checkout()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Seeds the session from prescribed medicines, replacing any prior
    /// selections. The session id is kept.
    ///
    /// Prescribed quantity resolves as: `prescribed_quantities[id]`, then the
    /// medicine's own quantity, then 1. Medicines without an identifier are
    /// logged and skipped; a repeated id keeps the last occurrence.
    pub fn initialize<I>(&mut self, medicines: I, prescribed_quantities: &HashMap<String, i64>)
    where
        I: IntoIterator<Item = Medicine>,
    {
        let now = (self.clock)();
        let mut selections = BTreeMap::new();

        for mut medicine in medicines {
            let id = medicine.id.trim().to_string();
            if id.is_empty() {
                warn!(name = %medicine.name, "Skipping medicine without identifier");
                continue;
            }
            medicine.id = id.clone();

            let prescribed = prescribed_quantities
                .get(&id)
                .copied()
                .or(medicine.quantity)
                .unwrap_or(1);

            let selection = MedicineSelection::new(medicine, prescribed, now);
            if selections.insert(id.clone(), selection).is_some() {
                warn!(medicine_id = %id, "Duplicate medicine in prescription, keeping the last one");
            }
        }

        self.state = SelectionState {
            selections,
            ..SelectionState::for_session(self.state.session_id)
        };
        self.recompute();

        let count = self.state.selections.len();
        info!(session_id = %self.state.session_id, count, "Selections initialized");
        self.notify(SelectionEvent::Initialized { count });
    }

    /// [`initialize`](Self::initialize) from raw loader lines.
    pub fn initialize_from_lines(
        &mut self,
        lines: Vec<PrescriptionLine>,
        prescribed_quantities: &HashMap<String, i64>,
    ) {
        self.initialize(medicines_from_lines(lines), prescribed_quantities);
    }

    /// Includes or excludes one medicine. Excluding drops its pharmacy.
    pub fn set_selected(&mut self, medicine_id: &str, is_selected: bool) -> bool {
        let event = SelectionEvent::SelectionToggled {
            medicine_id: medicine_id.to_string(),
            is_selected,
        };
        self.mutate(medicine_id, event, |s, _| {
            s.is_selected = is_selected;
            if !is_selected {
                s.selected_pharmacy = None;
            }
        })
    }

    /// Swaps in an alternative (or back to the original with `None`).
    /// Always drops the pharmacy: prices and packaging differ per medicine.
    pub fn set_alternative(&mut self, medicine_id: &str, alternative: Option<Medicine>) -> bool {
        let event = SelectionEvent::AlternativeChanged {
            medicine_id: medicine_id.to_string(),
            alternative_id: alternative.as_ref().map(|m| m.id.clone()),
        };
        self.mutate(medicine_id, event, |s, _| {
            match alternative {
                Some(alt) => {
                    s.selected_medicine = alt.clone();
                    s.selected_alternative = Some(alt);
                }
                None => {
                    s.selected_medicine = s.original_medicine.clone();
                    s.selected_alternative = None;
                }
            }
            s.selected_pharmacy = None;
        })
    }

    /// Binds or clears the fulfillment pharmacy.
    ///
    /// Binding a pharmacy to a deselected medicine selects it again, so the
    /// "deselected carries no pharmacy" invariant holds.
    pub fn set_pharmacy(&mut self, medicine_id: &str, pharmacy: Option<PharmacyOffer>) -> bool {
        let event = SelectionEvent::PharmacyChanged {
            medicine_id: medicine_id.to_string(),
            pharmacy_id: pharmacy.as_ref().map(|p| p.pharmacy_id.clone()),
        };
        self.mutate(medicine_id, event, |s, _| {
            if pharmacy.is_some() {
                s.is_selected = true;
            }
            s.selected_pharmacy = pharmacy;
        })
    }

    /// Binds one of the selected medicine's own offers by pharmacy id.
    ///
    /// No-op when either the medicine or the offer is unknown.
    pub fn set_pharmacy_by_id(&mut self, medicine_id: &str, pharmacy_id: &str) -> bool {
        let offer = self
            .state
            .get(medicine_id)
            .and_then(|s| s.selected_medicine.offer(pharmacy_id))
            .cloned();
        match offer {
            Some(offer) => self.set_pharmacy(medicine_id, Some(offer)),
            None => {
                debug!(medicine_id, pharmacy_id, "No matching offer, ignoring");
                false
            }
        }
    }

    /// Sets the dispensed unit count, clamped to at least 1.
    pub fn set_quantity(&mut self, medicine_id: &str, quantity: i64) -> bool {
        let quantity = quantity.max(1);
        let event = SelectionEvent::QuantityChanged {
            medicine_id: medicine_id.to_string(),
            quantity,
        };
        self.mutate(medicine_id, event, |s, _| {
            s.selected_quantity = quantity;
        })
    }

    /// Chooses a packaging tier and count, deriving the unit quantity from
    /// the selected medicine's pack size.
    pub fn set_packaging(&mut self, medicine_id: &str, packaging: Packaging, packaging_quantity: i64) -> bool {
        let packaging_quantity = packaging_quantity.max(1);
        let event = SelectionEvent::PackagingChanged {
            medicine_id: medicine_id.to_string(),
            packaging,
            packaging_quantity,
        };
        self.mutate(medicine_id, event, |s, rules| {
            let units = rules.units_for(packaging, s.selected_medicine.units_per_pack());
            s.selected_packaging = packaging;
            s.packaging_quantity = packaging_quantity;
            s.selected_quantity = packaging_quantity.saturating_mul(units).max(1);
        })
    }

    /// Free-text annotation. Marks dirty; totals are untouched.
    pub fn set_notes(&mut self, medicine_id: &str, notes: impl Into<String>) -> bool {
        let now = (self.clock)();
        let Some(selection) = self.state.selections.get_mut(medicine_id) else {
            debug!(medicine_id, "Ignoring notes for unknown medicine");
            return false;
        };
        selection.notes = notes.into();
        selection.touch(now);
        self.state.is_dirty = true;
        self.notify(SelectionEvent::NotesChanged {
            medicine_id: medicine_id.to_string(),
        });
        true
    }

    /// Re-runs validation for one record and the order-level checks.
    pub fn validate_one(&mut self, medicine_id: &str) -> bool {
        let rules = self.rules;
        let Some(selection) = self.state.selections.get_mut(medicine_id) else {
            debug!(medicine_id, "Ignoring validation of unknown medicine");
            return false;
        };
        selection.revalidate(&rules);
        self.refresh_validation();
        self.notify(SelectionEvent::Validated {
            medicine_id: Some(medicine_id.to_string()),
        });
        true
    }

    /// Re-runs validation for every record and the order-level checks.
    pub fn validate_all(&mut self) -> &ValidationReport {
        let rules = self.rules;
        for selection in self.state.selections.values_mut() {
            selection.revalidate(&rules);
        }
        self.refresh_validation();
        self.notify(SelectionEvent::Validated { medicine_id: None });
        &self.state.validation
    }

    /// Drops every selection; the session id and last save stamp survive.
    pub fn clear(&mut self) {
        self.state.selections.clear();
        self.state.is_dirty = true;
        self.recompute();
        info!(session_id = %self.state.session_id, "Selections cleared");
        self.notify(SelectionEvent::Cleared);
    }

    /// Acknowledges the current state as persisted by the host.
    pub fn mark_saved(&mut self) {
        let now = (self.clock)();
        self.state.is_dirty = false;
        self.state.last_saved = Some(match self.state.last_saved {
            Some(previous) => previous.max(now),
            None => now,
        });
        self.notify(SelectionEvent::Saved);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Applies `f` to a known record, then stamps, recomputes and notifies.
    fn mutate<F>(&mut self, medicine_id: &str, event: SelectionEvent, f: F) -> bool
    where
        F: FnOnce(&mut MedicineSelection, &SelectionRules),
    {
        let now = (self.clock)();
        let rules = self.rules;
        let Some(selection) = self.state.selections.get_mut(medicine_id) else {
            debug!(medicine_id, ?event, "Ignoring operation on unknown medicine");
            return false;
        };

        f(selection, &rules);
        selection.touch(now);
        self.state.is_dirty = true;
        self.recompute();
        self.notify(event);
        true
    }

    /// Recomputes every derived field from `selections`.
    fn recompute(&mut self) {
        let rules = self.rules;
        for selection in self.state.selections.values_mut() {
            selection.revalidate(&rules);
        }

        let mut total_price = Money::zero();
        let mut total_delivery_fees = Money::zero();
        let mut pharmacies_involved: Vec<String> = Vec::new();
        let mut slowest: Option<(u64, &str)> = None;

        for selection in self.state.selections.values().filter(|s| s.is_selected) {
            let Some(pharmacy) = &selection.selected_pharmacy else {
                continue;
            };
            total_price += selection.line_total();

            if pharmacies_involved.contains(&pharmacy.pharmacy_id) {
                continue;
            }
            pharmacies_involved.push(pharmacy.pharmacy_id.clone());
            total_delivery_fees += pharmacy.delivery_fee;

            let upper = pharmacy.delivery_upper_bound();
            if slowest.map_or(true, |(best, _)| upper > best) {
                slowest = Some((upper, pharmacy.delivery_time.as_str()));
            }
        }

        let estimated_delivery_time = slowest.map(|(_, t)| t.to_string()).unwrap_or_default();

        let state = &mut self.state;
        state.total_price = total_price;
        state.total_delivery_fees = total_delivery_fees;
        state.grand_total = total_price + total_delivery_fees;
        state.pharmacies_involved = pharmacies_involved;
        state.estimated_delivery_time = estimated_delivery_time;

        self.refresh_validation();
    }

    /// Order-level validation plus the completion figures that depend on it.
    fn refresh_validation(&mut self) {
        let state = &mut self.state;
        state.validation = validate_selections(&state.selections, &self.rules);

        let selected = state.selected_count();
        let bound = state
            .selections
            .values()
            .filter(|s| s.is_selected && s.selected_pharmacy.is_some())
            .count();

        state.completion_percentage = if selected == 0 {
            0.0
        } else {
            bound as f64 * 100.0 / selected as f64
        };
        state.is_complete = state.validation.is_valid && selected > 0 && bound == selected;
    }

    fn notify(&mut self, event: SelectionEvent) {
        let state = &self.state;
        for observer in self.observers.iter_mut() {
            observer.on_change(&event, state);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackagingPrices;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    fn fixed_clock() -> Clock {
        let t = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        Arc::new(move || t)
    }

    fn aggregator() -> SelectionAggregator {
        SelectionAggregator::new().with_clock(fixed_clock())
    }

    fn medicine(id: &str, pack_size: &str) -> Medicine {
        Medicine::new(id, format!("Medicine {}", id), pack_size)
    }

    fn pharmacy(id: &str, fee: i64, stock: i64) -> PharmacyOffer {
        PharmacyOffer::new(id, PackagingPrices::new(Money::from_major(100), Money::from_major(60)))
            .with_delivery(Money::from_major(fee), "30-45 mins")
            .with_stock(stock)
    }

    fn quantities(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn two_medicines() -> SelectionAggregator {
        let mut agg = aggregator();
        agg.initialize(
            vec![medicine("m1", "30 tablets"), medicine("m2", "20 tablets")],
            &quantities(&[("m1", 30), ("m2", 20)]),
        );
        agg
    }

    #[test]
    fn test_initialize_defaults() {
        let mut agg = aggregator();
        agg.initialize(
            vec![
                medicine("m1", "30 tablets"),
                medicine("m2", "10 tablets").with_quantity(14),
                medicine("m3", "bottle"),
                medicine("  ", "10 tablets"),
            ],
            &quantities(&[("m1", 30)]),
        );

        let state = agg.state();
        assert_eq!(state.selections.len(), 3);

        let m1 = &state.selections["m1"];
        assert!(m1.is_selected);
        assert_eq!(m1.selected_packaging, Packaging::Box);
        assert_eq!(m1.packaging_quantity, 1);
        assert_eq!(m1.prescribed_quantity, 30);
        assert_eq!(m1.selected_quantity, 30);
        assert!(!m1.is_valid);

        assert_eq!(state.selections["m2"].prescribed_quantity, 14);
        assert_eq!(state.selections["m3"].prescribed_quantity, 1);

        assert_eq!(state.completion_percentage, 0.0);
        assert!(!state.is_complete);
        assert!(!state.is_dirty);
        assert!(!state.validation.is_valid);
    }

    #[test]
    fn test_initialize_is_idempotent_and_keeps_session() {
        let meds = vec![medicine("m1", "30 tablets"), medicine("m2", "20 tablets")];
        let prescribed = quantities(&[("m1", 30)]);

        let mut agg = aggregator();
        agg.initialize(meds.clone(), &prescribed);
        let first = agg.snapshot();

        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        agg.initialize(meds, &prescribed);

        assert_eq!(agg.snapshot(), first);
        assert_eq!(agg.session_id(), first.session_id);
    }

    #[test]
    fn test_end_to_end_single_medicine() {
        let mut agg = aggregator();
        agg.initialize(vec![medicine("m1", "30 tablets")], &quantities(&[("m1", 30)]));

        let offer = PharmacyOffer::new(
            "ph1",
            PackagingPrices::new(Money::from_major(100), Money::from_major(60)),
        )
        .with_delivery(Money::from_major(20), "20-30 mins")
        .with_stock(50)
        .with_open(true);
        assert!(agg.set_pharmacy("m1", Some(offer)));

        let state = agg.state();
        assert_eq!(state.total_price, Money::from_major(100));
        assert_eq!(state.total_delivery_fees, Money::from_major(20));
        assert_eq!(state.grand_total, Money::from_major(120));
        assert_eq!(state.completion_percentage, 100.0);
        assert!(state.is_complete);
        assert!(state.validation.is_valid);
        assert_eq!(state.estimated_delivery_time, "20-30 mins");
        assert!(state.selections["m1"].is_valid);
        assert!(agg.can_proceed_to_checkout());
    }

    #[test]
    fn test_two_pharmacies_charge_two_fees() {
        let mut agg = two_medicines();
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        agg.set_pharmacy("m2", Some(pharmacy("ph2", 15, 50)));

        let state = agg.state();
        assert_eq!(state.total_delivery_fees, Money::from_major(35));
        assert_eq!(state.pharmacies_involved.len(), 2);
        assert_eq!(state.total_price, Money::from_major(200));
        assert_eq!(state.grand_total, Money::from_major(235));
    }

    #[test]
    fn test_same_pharmacy_fee_charged_once() {
        let mut agg = two_medicines();
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        agg.set_pharmacy("m2", Some(pharmacy("ph1", 20, 50)));

        let state = agg.state();
        assert_eq!(state.total_delivery_fees, Money::from_major(20));
        assert_eq!(state.pharmacies_involved, vec!["ph1".to_string()]);
    }

    #[test]
    fn test_slowest_delivery_wins_with_first_seen_tiebreak() {
        let mut agg = two_medicines();
        agg.set_pharmacy(
            "m1",
            Some(pharmacy("ph1", 20, 50).with_delivery(Money::from_major(20), "30-60 mins")),
        );
        agg.set_pharmacy(
            "m2",
            Some(pharmacy("ph2", 15, 50).with_delivery(Money::from_major(15), "45-90 mins")),
        );
        assert_eq!(agg.state().estimated_delivery_time, "45-90 mins");

        agg.set_pharmacy(
            "m2",
            Some(pharmacy("ph2", 15, 50).with_delivery(Money::from_major(15), "50-60 mins")),
        );
        assert_eq!(agg.state().estimated_delivery_time, "30-60 mins");
    }

    #[test]
    fn test_quantity_clamps_to_one() {
        let mut agg = two_medicines();
        for q in [0, -1, -500, i64::MIN] {
            agg.set_quantity("m1", q);
            assert_eq!(agg.state().selections["m1"].selected_quantity, 1);
        }
    }

    #[test]
    fn test_deselect_clears_pharmacy() {
        let mut agg = two_medicines();
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        agg.set_selected("m1", false);

        let m1 = &agg.state().selections["m1"];
        assert!(!m1.is_selected);
        assert!(m1.selected_pharmacy.is_none());
        assert_eq!(agg.state().total_price, Money::zero());

        // already unbound: still cleared
        agg.set_selected("m2", false);
        assert!(agg.state().selections["m2"].selected_pharmacy.is_none());
        assert_eq!(agg.state().completion_percentage, 0.0);
        assert!(!agg.can_proceed_to_checkout());
    }

    #[test]
    fn test_binding_pharmacy_reselects() {
        let mut agg = two_medicines();
        agg.set_selected("m1", false);
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        assert!(agg.state().selections["m1"].is_selected);
    }

    #[test]
    fn test_alternative_clears_pharmacy_and_warns() {
        let mut agg = two_medicines();
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));

        let alt = Medicine::new("m1-generic", "Generic m1", "30 tablets");
        agg.set_alternative("m1", Some(alt.clone()));
        let m1 = &agg.state().selections["m1"];
        assert!(m1.selected_pharmacy.is_none());
        assert_eq!(m1.selected_medicine, alt);
        assert_eq!(m1.medicine_id, "m1");

        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        let m1 = &agg.state().selections["m1"];
        assert!(m1.is_valid);
        assert!(m1
            .validation_warnings
            .iter()
            .any(|w| matches!(w, ValidationIssue::AlternativeSelected { .. })));

        agg.set_alternative("m1", None);
        let m1 = &agg.state().selections["m1"];
        assert_eq!(m1.selected_medicine, m1.original_medicine);
        assert!(m1.selected_alternative.is_none());
    }

    #[test]
    fn test_completion_never_decreases_when_binding() {
        let mut agg = aggregator();
        agg.initialize(
            vec![medicine("a", "10"), medicine("b", "10"), medicine("c", "10")],
            &HashMap::new(),
        );

        let mut last = agg.state().completion_percentage;
        for id in ["a", "b", "c"] {
            agg.set_pharmacy(id, Some(pharmacy("ph1", 5, 100)));
            let now = agg.state().completion_percentage;
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_overstock_is_an_error() {
        let mut agg = two_medicines();
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 10)));

        let m1 = &agg.state().selections["m1"];
        assert!(!m1.is_valid);
        assert!(m1
            .validation_errors
            .iter()
            .any(|e| e.to_string().contains("exceeds available stock (10 available)")));
        assert!(!agg.state().is_complete);
    }

    #[test]
    fn test_packaging_derives_quantity() {
        let mut agg = aggregator();
        agg.initialize(vec![medicine("m1", "20 tablets")], &HashMap::new());

        agg.set_packaging("m1", Packaging::Box, 2);
        assert_eq!(agg.state().selections["m1"].selected_quantity, 40);

        agg.set_packaging("m1", Packaging::Blister, 2);
        let m1 = &agg.state().selections["m1"];
        assert_eq!(m1.selected_quantity, 20);
        assert_eq!(m1.packaging_quantity, 2);
        assert_eq!(m1.selected_packaging, Packaging::Blister);
    }

    #[test]
    fn test_packaging_prices_by_tier() {
        let mut agg = two_medicines();
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 0, 500)));
        agg.set_packaging("m1", Packaging::Blister, 3);
        assert_eq!(agg.state().total_price, Money::from_major(180));

        // unit quantity changes alone never touch the price
        agg.set_quantity("m1", 7);
        assert_eq!(agg.state().total_price, Money::from_major(180));
    }

    #[test]
    fn test_packaging_uses_configured_blister_split() {
        let rules = SelectionRules {
            blisters_per_box: 3,
            ..SelectionRules::default()
        };
        let mut agg = SelectionAggregator::with_rules(rules)
            .unwrap()
            .with_clock(fixed_clock());
        agg.initialize(vec![medicine("m1", "30 tablets")], &HashMap::new());
        agg.set_packaging("m1", Packaging::Blister, 1);
        assert_eq!(agg.state().selections["m1"].selected_quantity, 10);
    }

    #[test]
    fn test_unknown_id_is_a_no_op() {
        let mut agg = two_medicines();
        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        agg.mark_saved();
        let before = agg.snapshot();

        assert!(!agg.set_selected("nope", false));
        assert!(!agg.set_alternative("nope", None));
        assert!(!agg.set_pharmacy("nope", Some(pharmacy("ph2", 1, 1))));
        assert!(!agg.set_pharmacy_by_id("nope", "ph1"));
        assert!(!agg.set_quantity("nope", 0));
        assert!(!agg.set_packaging("nope", Packaging::Blister, 3));
        assert!(!agg.set_notes("nope", "hello"));
        assert!(!agg.validate_one("nope"));

        assert_eq!(agg.snapshot(), before);
    }

    #[test]
    fn test_set_pharmacy_by_id_uses_medicine_offers() {
        let mut agg = aggregator();
        agg.initialize(
            vec![medicine("m1", "30 tablets").with_offer(pharmacy("ph7", 10, 99))],
            &HashMap::new(),
        );

        assert!(!agg.set_pharmacy_by_id("m1", "ph8"));
        assert!(agg.set_pharmacy_by_id("m1", "ph7"));
        assert_eq!(agg.state().pharmacies_involved, vec!["ph7".to_string()]);
    }

    #[test]
    fn test_notes_mark_dirty_without_recompute() {
        let mut agg = two_medicines();
        assert!(!agg.state().is_dirty);

        assert!(agg.set_notes("m1", "patient prefers morning delivery"));
        let state = agg.state();
        assert!(state.is_dirty);
        assert_eq!(state.selections["m1"].notes, "patient prefers morning delivery");
        assert_eq!(state.grand_total, Money::zero());
    }

    #[test]
    fn test_mark_saved_and_clear() {
        let mut agg = two_medicines();
        agg.set_quantity("m1", 12);
        assert!(agg.state().is_dirty);

        agg.mark_saved();
        assert!(!agg.state().is_dirty);
        assert!(agg.state().last_saved.is_some());

        let session = agg.session_id();
        agg.clear();
        let state = agg.state();
        assert!(state.selections.is_empty());
        assert_eq!(state.session_id, session);
        assert!(state.is_dirty);
        assert_eq!(state.grand_total, Money::zero());
        assert!(state.validation.is_valid);
        assert!(!state.is_complete);
        assert!(!agg.can_proceed_to_checkout());
    }

    #[test]
    fn test_checkout_requires_every_selected_bound() {
        let mut agg = two_medicines();
        assert!(!agg.can_proceed_to_checkout());

        agg.set_pharmacy("m1", Some(pharmacy("ph1", 20, 50)));
        assert!(!agg.can_proceed_to_checkout());
        assert_eq!(agg.state().completion_percentage, 50.0);

        agg.set_selected("m2", false);
        assert!(agg.can_proceed_to_checkout());
    }

    #[test]
    fn test_last_updated_never_goes_backwards() {
        let base = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let offset = Arc::new(AtomicI64::new(100));
        let ticks = Arc::clone(&offset);
        let clock: Clock = Arc::new(move || base + Duration::seconds(ticks.load(Ordering::SeqCst)));

        let mut agg = SelectionAggregator::new().with_clock(clock);
        agg.initialize(vec![medicine("m1", "10")], &HashMap::new());
        let first = agg.state().selections["m1"].last_updated;

        offset.store(5, Ordering::SeqCst);
        agg.set_quantity("m1", 3);
        assert_eq!(agg.state().selections["m1"].last_updated, first);

        offset.store(500, Ordering::SeqCst);
        agg.set_quantity("m1", 4);
        assert!(agg.state().selections["m1"].last_updated > first);
    }

    #[test]
    fn test_observers_see_each_transition() {
        let seen: Arc<Mutex<Vec<SelectionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut agg = aggregator();
        agg.add_observer(Box::new(move |event: &SelectionEvent, _: &SelectionState| {
            sink.lock().unwrap().push(event.clone());
        }));

        agg.initialize(vec![medicine("m1", "10")], &HashMap::new());
        agg.set_quantity("m1", 0);
        agg.set_quantity("ghost", 2);
        agg.mark_saved();

        let events = seen.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                SelectionEvent::Initialized { count: 1 },
                SelectionEvent::QuantityChanged {
                    medicine_id: "m1".to_string(),
                    quantity: 1
                },
                SelectionEvent::Saved,
            ]
        );
    }

    #[test]
    fn test_initialize_from_lines_skips_unidentified() {
        let lines = crate::input::parse_prescription(
            r#"[{"id": "m1", "packSize": "10 tablets", "quantity": 10}, {"name": "ghost"}]"#,
        )
        .unwrap();

        let mut agg = aggregator();
        agg.initialize_from_lines(lines, &HashMap::new());
        assert_eq!(agg.state().selections.len(), 1);
        assert_eq!(agg.state().selections["m1"].prescribed_quantity, 10);
    }

    #[test]
    fn test_extreme_numbers_saturate() {
        let lines = crate::input::parse_prescription(
            r#"[
                {"id": "m1", "packSize": "20 tablets",
                 "pharmacyStock": [{"pharmacyId": "ph1", "boxPrice": 100000000000000000,
                                    "blisterPrice": "92233720368547758.99", "stockQuantity": 5}]},
                {"id": "m2", "packSize": "9223372036854775807 tablets",
                 "pharmacyStock": [{"pharmacyId": "ph2", "boxPrice": 10, "blisterPrice": 6}]}
            ]"#,
        )
        .unwrap();

        let mut agg = aggregator();
        agg.initialize_from_lines(lines, &HashMap::new());
        let max = Money::from_cents(i64::MAX);

        assert!(agg.set_pharmacy_by_id("m1", "ph1"));
        assert_eq!(agg.state().total_price, max);

        assert!(agg.set_packaging("m1", Packaging::Box, i64::MAX / 10));
        assert_eq!(agg.state().selections["m1"].selected_quantity, i64::MAX);
        assert_eq!(agg.state().grand_total, max);

        assert!(agg.set_pharmacy_by_id("m2", "ph2"));
        assert!(agg.set_packaging("m2", Packaging::Blister, 1));
        assert_eq!(agg.state().selections["m2"].selected_quantity, i64::MAX / 2);
        assert_eq!(agg.state().selections["m2"].line_total(), Money::from_major(6));
        assert_eq!(agg.state().total_price, max);
    }

    #[test]
    fn test_validate_all_returns_report() {
        let mut agg = two_medicines();
        let report = agg.validate_all().clone();
        assert!(!report.is_valid);
        assert!(report.errors.contains(&ValidationIssue::NoCompletedSelections));
        assert!(agg.validate_one("m1"));
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let agg = two_medicines();
        let json = serde_json::to_value(agg.state()).unwrap();
        assert!(json.get("grandTotal").is_some());
        assert!(json["selections"]["m1"].get("selectedQuantity").is_some());
        assert_eq!(json["selections"]["m1"]["selectedPackaging"], "box");
    }
}
