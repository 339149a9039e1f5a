//! # Domain Types
//!
//! The already-resolved medicine and pharmacy data the selection engine
//! consumes.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────────┐        ┌──────────────────────────────┐          │
//! │  │    Medicine      │ 0..n   │       PharmacyOffer          │          │
//! │  │  ──────────────  │───────►│  ──────────────────────────  │          │
//! │  │  id              │        │  pharmacy_id                 │          │
//! │  │  name            │        │  packaging_prices ─┐         │          │
//! │  │  pack_size       │        │  delivery_fee      │         │          │
//! │  │  quantity        │        │  delivery_time     │         │          │
//! │  └──────────────────┘        │  stock_info        │         │          │
//! │                              │  is_open           │         │          │
//! │                              └────────────────────┼─────────┘          │
//! │                                                   ▼                    │
//! │                       ┌──────────────────────────────────────┐         │
//! │                       │ PackagingPrices { box, blister }     │         │
//! │                       │ priced per pharmacy, per tier        │         │
//! │                       └──────────────────────────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Construction from loader JSON lives in [`crate::input`]; these types hold
//! only validated values.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::parse;

// =============================================================================
// Packaging
// =============================================================================

/// Unit-of-sale granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    /// Part of a box; see [`crate::rules::SelectionRules::blister_units`].
    Blister,
    /// A full pack.
    #[default]
    Box,
}

impl std::fmt::Display for Packaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Packaging::Blister => write!(f, "blister"),
            Packaging::Box => write!(f, "box"),
        }
    }
}

impl std::str::FromStr for Packaging {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "box" | "pack" => Ok(Packaging::Box),
            "blister" | "strip" => Ok(Packaging::Blister),
            other => Err(format!(
                "Unknown packaging: '{}'. Valid options: box, blister",
                other
            )),
        }
    }
}

/// Price of one packaging unit at one pharmacy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PackagingPrices {
    #[serde(rename = "box")]
    pub box_price: Money,
    #[serde(rename = "blister")]
    pub blister_price: Money,
}

impl PackagingPrices {
    pub fn new(box_price: Money, blister_price: Money) -> Self {
        PackagingPrices {
            box_price,
            blister_price,
        }
    }

    #[inline]
    pub fn price_for(&self, packaging: Packaging) -> Money {
        match packaging {
            Packaging::Box => self.box_price,
            Packaging::Blister => self.blister_price,
        }
    }
}

// =============================================================================
// Pharmacy Offer
// =============================================================================

/// Stock a pharmacy reports for one medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    pub stock_quantity: i64,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StockInfo {
    fn default() -> Self {
        StockInfo {
            stock_quantity: 0,
            is_available: true,
        }
    }
}

/// A fulfillment source for one medicine: who, at what price, how fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyOffer {
    /// Identity used for delivery-fee deduplication.
    pub pharmacy_id: String,

    #[serde(default)]
    pub name: String,

    pub packaging_prices: PackagingPrices,

    /// Charged once per pharmacy per order.
    #[serde(default)]
    pub delivery_fee: Money,

    /// Free text, usually "X-Y mins".
    #[serde(default)]
    pub delivery_time: String,

    #[serde(default)]
    pub stock_info: StockInfo,

    #[serde(default = "default_true")]
    pub is_open: bool,
}

impl PharmacyOffer {
    /// Creates an open offer with empty stock and no delivery details.
    pub fn new(pharmacy_id: impl Into<String>, packaging_prices: PackagingPrices) -> Self {
        let pharmacy_id = pharmacy_id.into();
        PharmacyOffer {
            name: pharmacy_id.clone(),
            pharmacy_id,
            packaging_prices,
            delivery_fee: Money::zero(),
            delivery_time: String::new(),
            stock_info: StockInfo::default(),
            is_open: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_delivery(mut self, fee: Money, time: impl Into<String>) -> Self {
        self.delivery_fee = fee;
        self.delivery_time = time.into();
        self
    }

    pub fn with_stock(mut self, stock_quantity: i64) -> Self {
        self.stock_info.stock_quantity = stock_quantity;
        self
    }

    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    /// Price of `quantity` packaging units of the given tier.
    pub fn price_of(&self, packaging: Packaging, quantity: i64) -> Money {
        self.packaging_prices.price_for(packaging).multiply_quantity(quantity)
    }

    /// Upper bound of the delivery estimate in minutes, 0 when unparseable.
    pub fn delivery_upper_bound(&self) -> u64 {
        parse::delivery_upper_bound(&self.delivery_time).unwrap_or(0)
    }

    /// Display label used in validation messages.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.pharmacy_id
        } else {
            &self.name
        }
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// A prescribed medicine, or an alternative offered in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub generic_name: Option<String>,

    /// Free-text pack descriptor, e.g. "20 tablets".
    #[serde(default = "default_pack_size")]
    pub pack_size: String,

    /// Quantity stated on the prescription line, if any.
    #[serde(default)]
    pub quantity: Option<i64>,

    /// Pharmacies able to supply this medicine.
    #[serde(default)]
    pub offers: Vec<PharmacyOffer>,
}

fn default_pack_size() -> String {
    "1".to_string()
}

impl Medicine {
    pub fn new(id: impl Into<String>, name: impl Into<String>, pack_size: impl Into<String>) -> Self {
        Medicine {
            id: id.into(),
            name: name.into(),
            generic_name: None,
            pack_size: pack_size.into(),
            quantity: None,
            offers: Vec::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_offer(mut self, offer: PharmacyOffer) -> Self {
        self.offers.push(offer);
        self
    }

    /// Units per pack parsed from `pack_size`; 1 when unparseable.
    #[inline]
    pub fn units_per_pack(&self) -> i64 {
        parse::units_per_pack(&self.pack_size)
    }

    /// Looks up this medicine's offer from a given pharmacy.
    pub fn offer(&self, pharmacy_id: &str) -> Option<&PharmacyOffer> {
        self.offers.iter().find(|o| o.pharmacy_id == pharmacy_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
