//! # Session Configuration
//!
//! Configuration shared by every selection session a host opens.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MEDSEL_DEVIATION_PCT=40                                            │
//! │     MEDSEL_BLISTERS_PER_BOX=3                                          │
//! │     MEDSEL_CURRENCY_SYMBOL=Rs.                                         │
//! │     MEDSEL_LOG=debug                                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/medsel/medsel.toml (Linux)                               │
//! │     ~/Library/Application Support/com.medsel.medsel/medsel.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     deviation 50%, 2 blisters per box, "$" with 2 decimals             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # medsel.toml
//! [rules]
//! quantity_deviation_pct = 50
//! blisters_per_box = 2
//!
//! [currency]
//! code = "PKR"
//! symbol = "Rs."
//! decimals = 2
//!
//! [logging]
//! filter = "info,medsel=debug"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use medsel_core::{Money, SelectionRules};

use crate::error::{ConfigError, ConfigResult};

/// Largest supported display precision.
pub const MAX_CURRENCY_DECIMALS: u8 = 4;

// =============================================================================
// Sections
// =============================================================================

/// How amounts are shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// ISO 4217 code
    #[serde(default = "default_currency_code")]
    pub code: String,

    #[serde(default = "default_currency_symbol")]
    pub symbol: String,

    /// Digits after the decimal point when displaying amounts
    #[serde(default = "default_currency_decimals")]
    pub decimals: u8,
}

fn default_currency_code() -> String {
    "USD".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_currency_decimals() -> u8 {
    2
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            code: default_currency_code(),
            symbol: default_currency_symbol(),
            decimals: default_currency_decimals(),
        }
    }
}

impl CurrencyConfig {
    /// Formats an amount with this currency's symbol and precision.
    ///
    /// Amounts are stored in cents; precision below 2 rounds half away
    /// from zero, precision above 2 pads with zeros.
    ///
    /// ## Example
    /// ```rust
    /// use medsel_core::Money;
    /// use medsel_session::config::CurrencyConfig;
    ///
    /// let currency = CurrencyConfig::default();
    /// assert_eq!(currency.format(Money::from_cents(1234)), "$12.34");
    /// ```
    pub fn format(&self, amount: Money) -> String {
        let decimals = u32::from(self.decimals.min(MAX_CURRENCY_DECIMALS));
        let cents = i128::from(amount.cents());

        let scaled = if decimals >= 2 {
            cents * 10_i128.pow(decimals - 2)
        } else {
            let div = 10_i128.pow(2 - decimals);
            (cents.abs() + div / 2) / div * cents.signum()
        };

        let divisor = 10_i128.pow(decimals);
        let whole = (scaled / divisor).abs();
        let frac = (scaled % divisor).abs();

        format!(
            "{}{}{}",
            if scaled < 0 { "-" } else { "" },
            self.symbol,
            if decimals > 0 {
                format!("{}.{:0width$}", whole, frac, width = decimals as usize)
            } else {
                whole.to_string()
            }
        )
    }
}

/// Log filter used when `RUST_LOG` is not set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,medsel=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Complete host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub rules: SelectionRules,

    #[serde(default)]
    pub currency: CurrencyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SessionConfig {
    /// Loads configuration: file (explicit path or platform default), then
    /// environment overrides, then validation.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading session config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load session config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Session config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.rules
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.currency.decimals > MAX_CURRENCY_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "currency decimals must be at most {}, got {}",
                MAX_CURRENCY_DECIMALS, self.currency.decimals
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies `MEDSEL_*` overrides from any key lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(pct) = lookup("MEDSEL_DEVIATION_PCT") {
            match pct.trim().parse::<u32>() {
                Ok(p) => {
                    debug!(pct = p, "Overriding quantity deviation threshold from environment");
                    self.rules.quantity_deviation_pct = p;
                }
                Err(_) => warn!(value = %pct, "Ignoring invalid MEDSEL_DEVIATION_PCT"),
            }
        }

        if let Some(blisters) = lookup("MEDSEL_BLISTERS_PER_BOX") {
            match blisters.trim().parse::<u32>() {
                Ok(b) => {
                    debug!(blisters = b, "Overriding blisters per box from environment");
                    self.rules.blisters_per_box = b;
                }
                Err(_) => warn!(value = %blisters, "Ignoring invalid MEDSEL_BLISTERS_PER_BOX"),
            }
        }

        if let Some(symbol) = lookup("MEDSEL_CURRENCY_SYMBOL") {
            self.currency.symbol = symbol;
        }

        if let Some(filter) = lookup("MEDSEL_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Platform config path: `<config dir>/medsel.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "medsel", "medsel")
            .map(|dirs| dirs.config_dir().join("medsel.toml"))
    }

    /// Shorthand for `self.currency.format`.
    pub fn format_money(&self, amount: Money) -> String {
        self.currency.format(amount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_currency() {
        let config = SessionConfig::default();
        assert_eq!(config.format_money(Money::from_cents(1234)), "$12.34");
        assert_eq!(config.format_money(Money::from_cents(1)), "$0.01");
        assert_eq!(config.format_money(Money::zero()), "$0.00");
        assert_eq!(config.format_money(Money::from_cents(-1234)), "-$12.34");
        assert_eq!(config.format_money(Money::from_cents(123456789)), "$1234567.89");
    }

    #[test]
    fn test_format_currency_other_precisions() {
        let whole = CurrencyConfig {
            code: "PKR".to_string(),
            symbol: "Rs.".to_string(),
            decimals: 0,
        };
        assert_eq!(whole.format(Money::from_cents(1250)), "Rs.13");
        assert_eq!(whole.format(Money::from_cents(1249)), "Rs.12");
        assert_eq!(whole.format(Money::from_cents(-1250)), "-Rs.13");

        let fine = CurrencyConfig {
            decimals: 3,
            ..CurrencyConfig::default()
        };
        assert_eq!(fine.format(Money::from_cents(1234)), "$12.340");
    }

    #[test]
    fn test_toml_sections_and_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            [rules]
            blisters_per_box = 3

            [currency]
            symbol = "Rs."
            "#,
        )
        .unwrap();

        assert_eq!(config.rules.blisters_per_box, 3);
        assert_eq!(config.rules.quantity_deviation_pct, 50);
        assert_eq!(config.currency.symbol, "Rs.");
        assert_eq!(config.currency.decimals, 2);
        assert_eq!(config.logging.filter, "info,medsel=debug");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MEDSEL_DEVIATION_PCT", "25"),
            ("MEDSEL_BLISTERS_PER_BOX", "many"),
            ("MEDSEL_CURRENCY_SYMBOL", "€"),
            ("MEDSEL_LOG", "warn"),
        ]);

        let mut config = SessionConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.rules.quantity_deviation_pct, 25);
        assert_eq!(config.rules.blisters_per_box, 2);
        assert_eq!(config.currency.symbol, "€");
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SessionConfig::default();
        assert!(config.validate().is_ok());

        config.rules.blisters_per_box = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SessionConfig::default();
        config.currency.decimals = 5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("medsel-{}.toml", uuid::Uuid::new_v4()));

        let mut config = SessionConfig::default();
        config.rules.quantity_deviation_pct = 30;
        config.currency.code = "PKR".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded = SessionConfig::from_toml_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let path = std::env::temp_dir().join(format!("medsel-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[rules\nblisters_per_box = ").unwrap();

        let config = SessionConfig::load_or_default(Some(path.clone()));
        assert_eq!(config.currency.decimals, 2);

        std::fs::remove_file(&path).unwrap();
    }
}
