//! # medsel-session: Session Host Layer
//!
//! Hosts selection sessions for a front end: locking, configuration,
//! command functions and log setup. All business logic lives in
//! `medsel-core`.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. SessionConfig::load_or_default(None) ─────────────────────────────► │
//! │     • medsel.toml in the platform config dir, then MEDSEL_* overrides   │
//! │                                                                         │
//! │  2. init_tracing(&config.logging) ────────────────────────────────────► │
//! │     • RUST_LOG wins; otherwise the configured filter                    │
//! │                                                                         │
//! │  3. SessionRegistry::new(config) ─────────────────────────────────────► │
//! │     • open() per prescription being fulfilled                           │
//! │                                                                         │
//! │  4. commands::* against the session's handle ─────────────────────────► │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod session;

pub use commands::{FormattedTotals, SelectionResponse};
pub use config::SessionConfig;
pub use error::{ApiError, ApiResult, ConfigError, ErrorCode};
pub use session::{SessionHandle, SessionRegistry};

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=medsel_core=trace` - Show trace for the engine only
/// - Default: `logging.filter` from config (`info,medsel=debug`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        debug!("Tracing subscriber already installed");
    }
}
