//! # Selection Actions
//!
//! Every state transition as a serializable value, so a host can forward
//! front-end intents verbatim and replay or log them.
//!
//! ```json
//! { "type": "SET_PACKAGING", "medicineId": "m1", "packaging": "blister", "packagingQuantity": 2 }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::selection::SelectionAggregator;
use crate::types::{Medicine, Packaging, PharmacyOffer};

/// A state transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum SelectionAction {
    Initialize {
        medicines: Vec<Medicine>,
        #[serde(default)]
        prescribed_quantities: HashMap<String, i64>,
    },
    SetSelected {
        medicine_id: String,
        is_selected: bool,
    },
    SetAlternative {
        medicine_id: String,
        #[serde(default)]
        alternative: Option<Medicine>,
    },
    SetPharmacy {
        medicine_id: String,
        #[serde(default)]
        pharmacy: Option<PharmacyOffer>,
    },
    SetPharmacyById {
        medicine_id: String,
        pharmacy_id: String,
    },
    SetQuantity {
        medicine_id: String,
        quantity: i64,
    },
    SetPackaging {
        medicine_id: String,
        packaging: Packaging,
        packaging_quantity: i64,
    },
    SetNotes {
        medicine_id: String,
        notes: String,
    },
    ValidateOne {
        medicine_id: String,
    },
    ValidateAll,
    Clear,
    MarkSaved,
}

impl SelectionAggregator {
    /// Dispatches an action. Returns `false` when it targeted an unknown
    /// medicine and nothing changed.
    pub fn apply(&mut self, action: SelectionAction) -> bool {
        match action {
            SelectionAction::Initialize {
                medicines,
                prescribed_quantities,
            } => {
                self.initialize(medicines, &prescribed_quantities);
                true
            }
            SelectionAction::SetSelected {
                medicine_id,
                is_selected,
            } => self.set_selected(&medicine_id, is_selected),
            SelectionAction::SetAlternative {
                medicine_id,
                alternative,
            } => self.set_alternative(&medicine_id, alternative),
            SelectionAction::SetPharmacy {
                medicine_id,
                pharmacy,
            } => self.set_pharmacy(&medicine_id, pharmacy),
            SelectionAction::SetPharmacyById {
                medicine_id,
                pharmacy_id,
            } => self.set_pharmacy_by_id(&medicine_id, &pharmacy_id),
            SelectionAction::SetQuantity {
                medicine_id,
                quantity,
            } => self.set_quantity(&medicine_id, quantity),
            SelectionAction::SetPackaging {
                medicine_id,
                packaging,
                packaging_quantity,
            } => self.set_packaging(&medicine_id, packaging, packaging_quantity),
            SelectionAction::SetNotes { medicine_id, notes } => self.set_notes(&medicine_id, notes),
            SelectionAction::ValidateOne { medicine_id } => self.validate_one(&medicine_id),
            SelectionAction::ValidateAll => {
                self.validate_all();
                true
            }
            SelectionAction::Clear => {
                self.clear();
                true
            }
            SelectionAction::MarkSaved => {
                self.mark_saved();
                true
            }
        }
    }
}
