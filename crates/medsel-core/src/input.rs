//! # Prescription Input Boundary
//!
//! The prescription loader emits loosely-typed records: several alias fields
//! for the same value, prices as numbers or strings, stock nested per
//! provider. This module is the one place those shapes are accepted and the
//! defaulting rules are applied.
//!
//! ```text
//! loader JSON ──► PrescriptionLine ──► into_medicine() ──► Medicine
//!                   (serde, lenient)      (defaults)         (typed)
//! ```
//!
//! ## Defaults
//! ```text
//! ┌──────────────────┬───────────────────────────────────────────────────┐
//! │ Field            │ Resolution                                        │
//! ├──────────────────┼───────────────────────────────────────────────────┤
//! │ id               │ id → medicineId (trimmed); missing = error        │
//! │ name             │ name → medicineName → id                          │
//! │ pack size        │ packSize → "1"                                    │
//! │ quantity         │ quantity (number or "30 tablets") → none          │
//! │ pharmacy id      │ pharmacyId → providerId; missing = entry skipped  │
//! │ box price        │ boxPrice → price → blisterPrice → 0               │
//! │ blister price    │ blisterPrice → price → boxPrice → 0               │
//! │ delivery fee     │ deliveryFee → 0                                   │
//! │ stock quantity   │ stockQuantity → 0                                 │
//! │ isOpen           │ isOpen → true                                     │
//! └──────────────────┴───────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::InputError;
use crate::money::Money;
use crate::parse;
use crate::types::{Medicine, PackagingPrices, PharmacyOffer, StockInfo};

/// One medicine line as emitted by the prescription loader.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionLine {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub medicine_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub medicine_name: Option<String>,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub pack_size: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default, alias = "stock", alias = "pharmacies")]
    pub pharmacy_stock: Vec<PharmacyStockEntry>,
}

/// One provider's stock/pricing for a medicine line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyStockEntry {
    #[serde(default)]
    pub pharmacy_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default, alias = "providerName", alias = "pharmacyName")]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub box_price: Option<Value>,
    #[serde(default)]
    pub blister_price: Option<Value>,
    #[serde(default)]
    pub delivery_fee: Option<Value>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<Value>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub is_open: Option<bool>,
}

/// Parses a loader payload (a JSON array of lines).
pub fn parse_prescription(json: &str) -> Result<Vec<PrescriptionLine>, InputError> {
    Ok(serde_json::from_str(json)?)
}

/// Converts every line, logging and skipping the ones without an identifier.
pub fn medicines_from_lines(lines: Vec<PrescriptionLine>) -> Vec<Medicine> {
    lines
        .into_iter()
        .enumerate()
        .filter_map(|(index, line)| match line.into_medicine(index) {
            Ok(medicine) => Some(medicine),
            Err(e) => {
                warn!(index, error = %e, "Skipping prescription line");
                None
            }
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl PrescriptionLine {
    /// Applies the defaulting rules. `index` is the line's position, used
    /// only in error messages.
    pub fn into_medicine(self, index: usize) -> Result<Medicine, InputError> {
        let id = non_empty(self.id)
            .or_else(|| non_empty(self.medicine_id))
            .ok_or(InputError::MissingIdentifier { index })?;

        let name = non_empty(self.name)
            .or_else(|| non_empty(self.medicine_name))
            .unwrap_or_else(|| id.clone());

        let offers = self
            .pharmacy_stock
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match entry.into_offer(&id, i) {
                Ok(offer) => Some(offer),
                Err(e) => {
                    warn!(medicine_id = %id, error = %e, "Skipping stock entry");
                    None
                }
            })
            .collect();

        Ok(Medicine {
            name,
            generic_name: non_empty(self.generic_name),
            pack_size: non_empty(self.pack_size).unwrap_or_else(|| "1".to_string()),
            quantity: self.quantity.as_ref().and_then(parse::json_integer),
            offers,
            id,
        })
    }
}

impl PharmacyStockEntry {
    pub fn into_offer(self, medicine_id: &str, index: usize) -> Result<PharmacyOffer, InputError> {
        let pharmacy_id = non_empty(self.pharmacy_id)
            .or_else(|| non_empty(self.provider_id))
            .ok_or_else(|| InputError::MissingPharmacyIdentifier {
                medicine_id: medicine_id.to_string(),
                index,
            })?;

        let price = |v: &Option<Value>| v.as_ref().map(Money::from_json_lenient);
        let single = price(&self.price);
        let box_price = price(&self.box_price);
        let blister_price = price(&self.blister_price);

        let packaging_prices = PackagingPrices::new(
            box_price.or(single).or(blister_price).unwrap_or_default(),
            blister_price.or(single).or(box_price).unwrap_or_default(),
        );

        Ok(PharmacyOffer {
            name: non_empty(self.name).unwrap_or_else(|| pharmacy_id.clone()),
            pharmacy_id,
            packaging_prices,
            delivery_fee: price(&self.delivery_fee).unwrap_or_default(),
            delivery_time: self.delivery_time.unwrap_or_default(),
            stock_info: StockInfo {
                stock_quantity: self
                    .stock_quantity
                    .as_ref()
                    .and_then(parse::json_integer)
                    .unwrap_or(0),
                is_available: self.is_available.unwrap_or(true),
            },
            is_open: self.is_open.unwrap_or(true),
        })
    }
}
