//! # Session State
//!
//! One [`SelectionAggregator`] per prescription-fulfillment session, each
//! behind its own lock.
//!
//! ## Thread Safety
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Session Lock Domains                                │
//! │                                                                         │
//! │  SessionRegistry                                                        │
//! │  RwLock<HashMap<Uuid, SessionHandle>>                                   │
//! │     │  open() / close()  ── write lock, held only for the map update    │
//! │     │  get()             ── read lock, clones the handle out            │
//! │     ▼                                                                   │
//! │  SessionHandle ── Arc<Mutex<SelectionAggregator>>                       │
//! │     │                                                                   │
//! │     │  with_session_mut(|agg| agg.set_quantity(..))                     │
//! │     │     one whole transition (mutate + recompute + notify)            │
//! │     │     runs under the lock; readers never see a half-updated state   │
//! │     ▼                                                                   │
//! │  with_session(|agg| agg.snapshot())                                     │
//! │                                                                         │
//! │  Sessions never share a lock.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, error, info};
use uuid::Uuid;

use medsel_core::{SelectionAggregator, TracingObserver};

use crate::config::SessionConfig;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// Session Handle
// =============================================================================

/// Shared handle to one session's aggregator.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    aggregator: Arc<Mutex<SelectionAggregator>>,
}

impl SessionHandle {
    pub fn new(aggregator: SelectionAggregator) -> Self {
        SessionHandle {
            id: aggregator.session_id(),
            aggregator: Arc::new(Mutex::new(aggregator)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Executes a function with read access to the aggregator.
    pub fn with_session<F, R>(&self, f: F) -> ApiResult<R>
    where
        F: FnOnce(&SelectionAggregator) -> R,
    {
        let aggregator = self.aggregator.lock().map_err(|_| self.poisoned())?;
        Ok(f(&aggregator))
    }

    /// Executes a function with write access to the aggregator.
    pub fn with_session_mut<F, R>(&self, f: F) -> ApiResult<R>
    where
        F: FnOnce(&mut SelectionAggregator) -> R,
    {
        let mut aggregator = self.aggregator.lock().map_err(|_| self.poisoned())?;
        Ok(f(&mut aggregator))
    }

    fn poisoned(&self) -> ApiError {
        error!(session_id = %self.id, "Selection session lock poisoned");
        ApiError::internal(format!("Selection session {} is unavailable", self.id))
    }
}

// =============================================================================
// Session Registry
// =============================================================================

/// All open sessions of a host, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        SessionRegistry {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Opens a fresh session using the configured rules.
    pub fn open(&self) -> ApiResult<SessionHandle> {
        let mut aggregator = SelectionAggregator::with_rules(self.config.rules)?;
        aggregator.add_observer(Box::new(TracingObserver::new()));

        let handle = SessionHandle::new(aggregator);
        self.sessions
            .write()
            .map_err(|_| ApiError::internal("Session registry lock poisoned"))?
            .insert(handle.id(), handle.clone());

        info!(session_id = %handle.id(), "Selection session opened");
        Ok(handle)
    }

    pub fn get(&self, session_id: Uuid) -> ApiResult<SessionHandle> {
        self.sessions
            .read()
            .map_err(|_| ApiError::internal("Session registry lock poisoned"))?
            .get(&session_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Session", &session_id.to_string()))
    }

    /// Discards a session. Returns `false` if it was not open.
    pub fn close(&self, session_id: Uuid) -> ApiResult<bool> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| ApiError::internal("Session registry lock poisoned"))?
            .remove(&session_id)
            .is_some();

        if removed {
            info!(%session_id, "Selection session closed");
        } else {
            debug!(%session_id, "Close requested for unknown session");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
