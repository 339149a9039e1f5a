//! # medsel-core: Pure Selection Engine
//!
//! Turns a multi-medicine prescription into a checkout-ready order: for each
//! medicine, which pharmacy fulfils it, whether an alternative is used, in
//! what packaging and quantity. Totals, delivery fees, completion and
//! validation are recomputed after every change.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Medicine Selection Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Front end (selection UI)                     │   │
//! │  │   medicine list ──► pharmacy picker ──► packaging ──► checkout  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 medsel-session (host layer)                     │   │
//! │  │   SessionRegistry, command functions, config, tracing setup     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ medsel-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌─────────────┐      │   │
//! │  │   │  input   │ │  types   │ │ selection │ │ validation  │      │   │
//! │  │   │ loader → │ │ Medicine │ │ Aggregator│ │ issues and  │      │   │
//! │  │   │ Medicine │ │ Offer    │ │ State     │ │ report      │      │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └─────────────┘      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • SYNCHRONOUS TRANSITIONS                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Medicine, PharmacyOffer, Packaging
//! - [`money`] - Money in integer cents
//! - [`input`] - Loose prescription-loader JSON to typed medicines
//! - [`parse`] - Integer extraction from free text ("20 tablets", "30-45 mins")
//! - [`rules`] - Configurable business constants
//! - [`selection`] - MedicineSelection, SelectionState, SelectionAggregator
//! - [`action`] - Serializable transitions
//! - [`validation`] - Per-selection and whole-order checks
//! - [`observer`] - Change notification hooks
//! - [`error`] - Error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use medsel_core::{Medicine, Money, PackagingPrices, PharmacyOffer, SelectionAggregator};
//!
//! let offer = PharmacyOffer::new("ph1", PackagingPrices::new(Money::from_major(100), Money::from_major(60)))
//!     .with_delivery(Money::from_major(20), "20-30 mins")
//!     .with_stock(50);
//! let medicine = Medicine::new("m1", "Amoxicillin 500mg", "30 tablets").with_offer(offer);
//!
//! let mut agg = SelectionAggregator::new();
//! agg.initialize(vec![medicine], &HashMap::from([("m1".to_string(), 30)]));
//! agg.set_pharmacy_by_id("m1", "ph1");
//!
//! assert_eq!(agg.state().grand_total, Money::from_major(120));
//! assert!(agg.can_proceed_to_checkout());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod action;
pub mod error;
pub mod input;
pub mod money;
pub mod observer;
pub mod parse;
pub mod rules;
pub mod selection;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use action::SelectionAction;
pub use error::{CoreError, CoreResult, InputError};
pub use money::Money;
pub use observer::{SelectionEvent, SelectionObserver, TracingObserver};
pub use rules::SelectionRules;
pub use selection::{Clock, MedicineSelection, SelectionAggregator, SelectionState};
pub use types::*;
pub use validation::{Severity, ValidationIssue, ValidationReport};
