//! # Selection Rules
//!
//! Business constants that shape quantity derivation and warnings.
//!
//! Both are configurable; the defaults are:
//!
//! ```text
//! ┌──────────────────────────┬─────────┬────────────────────────────────────┐
//! │ Rule                     │ Default │ Effect                             │
//! ├──────────────────────────┼─────────┼────────────────────────────────────┤
//! │ quantity_deviation_pct   │ 50      │ warn when |selected - prescribed|  │
//! │                          │         │ exceeds this % of prescribed       │
//! │ blisters_per_box         │ 2       │ one blister = ceil(pack / N) units │
//! └──────────────────────────┴─────────┴────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Packaging;

/// Default deviation threshold, percent of the prescribed quantity.
pub const DEFAULT_QUANTITY_DEVIATION_PCT: u32 = 50;

/// Default number of blisters that make up one box.
pub const DEFAULT_BLISTERS_PER_BOX: u32 = 2;

/// Configurable business rules for a selection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SelectionRules {
    #[serde(default = "default_deviation_pct")]
    pub quantity_deviation_pct: u32,

    #[serde(default = "default_blisters_per_box")]
    pub blisters_per_box: u32,
}

fn default_deviation_pct() -> u32 {
    DEFAULT_QUANTITY_DEVIATION_PCT
}

fn default_blisters_per_box() -> u32 {
    DEFAULT_BLISTERS_PER_BOX
}

impl Default for SelectionRules {
    fn default() -> Self {
        SelectionRules {
            quantity_deviation_pct: DEFAULT_QUANTITY_DEVIATION_PCT,
            blisters_per_box: DEFAULT_BLISTERS_PER_BOX,
        }
    }
}

impl SelectionRules {
    /// Rejects rule sets the arithmetic below cannot honour.
    pub fn validate(&self) -> CoreResult<()> {
        if self.blisters_per_box == 0 {
            return Err(CoreError::InvalidRules {
                reason: "blisters_per_box must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Units in one blister: `ceil(pack_units / blisters_per_box)`.
    pub fn blister_units(&self, pack_units: i64) -> i64 {
        let per_box = i64::from(self.blisters_per_box.max(1));
        let pack_units = pack_units.max(1);
        pack_units.saturating_add(per_box - 1) / per_box
    }

    /// Units in one packaging unit of the given tier.
    pub fn units_for(&self, packaging: Packaging, pack_units: i64) -> i64 {
        match packaging {
            Packaging::Box => pack_units.max(1),
            Packaging::Blister => self.blister_units(pack_units),
        }
    }

    /// True when `selected` strays from `prescribed` by more than the
    /// configured percentage of `prescribed`.
    pub fn deviates(&self, selected: i64, prescribed: i64) -> bool {
        let diff = (i128::from(selected) - i128::from(prescribed)).abs();
        diff * 100 > i128::from(prescribed) * i128::from(self.quantity_deviation_pct)
    }
}
