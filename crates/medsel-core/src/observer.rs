//! # Change Notification
//!
//! Hosts that want to react to selection changes (auto-save, audit, UI push)
//! register a [`SelectionObserver`] on the aggregator. Observers run
//! synchronously, after the transition and its recompute have completed, so
//! they always see a consistent state. They are never called for no-ops.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::selection::SelectionState;
use crate::types::Packaging;

/// What just happened to the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SelectionEvent {
    Initialized { count: usize },
    SelectionToggled { medicine_id: String, is_selected: bool },
    AlternativeChanged { medicine_id: String, alternative_id: Option<String> },
    PharmacyChanged { medicine_id: String, pharmacy_id: Option<String> },
    QuantityChanged { medicine_id: String, quantity: i64 },
    PackagingChanged { medicine_id: String, packaging: Packaging, packaging_quantity: i64 },
    NotesChanged { medicine_id: String },
    Validated { medicine_id: Option<String> },
    Cleared,
    Saved,
}

/// Synchronous change hook.
pub trait SelectionObserver: Send {
    fn on_change(&mut self, event: &SelectionEvent, state: &SelectionState);
}

/// Closures make quick observers.
impl<F> SelectionObserver for F
where
    F: FnMut(&SelectionEvent, &SelectionState) + Send,
{
    fn on_change(&mut self, event: &SelectionEvent, state: &SelectionState) {
        self(event, state)
    }
}

/// Logs every event, and dirty-flag flips at `info`.
#[derive(Debug, Default)]
pub struct TracingObserver {
    was_dirty: bool,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionObserver for TracingObserver {
    fn on_change(&mut self, event: &SelectionEvent, state: &SelectionState) {
        debug!(
            session_id = %state.session_id,
            ?event,
            grand_total = %state.grand_total,
            completion = state.completion_percentage,
            "Selection changed"
        );

        if state.is_dirty != self.was_dirty {
            if state.is_dirty {
                info!(session_id = %state.session_id, "Selections have unsaved changes");
            } else {
                info!(session_id = %state.session_id, last_saved = ?state.last_saved, "Selections saved");
            }
            self.was_dirty = state.is_dirty;
        }
    }
}
