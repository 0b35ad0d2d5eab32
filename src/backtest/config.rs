//! Run configuration.

use crate::backtest::error::BacktestError;
use serde::{Deserialize, Serialize};

/// Default number of instrument handles pre-seeded into the directory.
pub const DEFAULT_INSTRUMENT_CAPACITY: usize = 50;

/// Default number of fills a portfolio reserves room for.
pub const DEFAULT_PORTFOLIO_CAPACITY: usize = 10_000;

/// Settings for a single backtest run.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides.
///
/// # Examples
///
/// ```
/// use backtest_core::BacktestConfig;
///
/// let config = BacktestConfig::from_json_str(r#"{ "instrument_capacity": 8 }"#)
///     .expect("valid config");
/// assert_eq!(config.instrument_capacity, 8);
/// assert_eq!(config.delimiter, b',');
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Instrument ids `0..instrument_capacity` are known before any data arrives
    pub instrument_capacity: usize,
    /// Number of fills a portfolio reserves room for
    pub portfolio_capacity: usize,
    /// Whether the first feed row is a header to skip
    pub has_headers: bool,
    /// Field delimiter of the feed
    pub delimiter: u8,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            instrument_capacity: DEFAULT_INSTRUMENT_CAPACITY,
            portfolio_capacity: DEFAULT_PORTFOLIO_CAPACITY,
            has_headers: false,
            delimiter: b',',
        }
    }
}

impl BacktestConfig {
    /// Parses a configuration from JSON, filling in defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::InvalidConfig`] if the document is not valid
    /// JSON for this structure or fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, BacktestError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BacktestError::InvalidConfig {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the number of pre-seeded instrument handles.
    #[must_use]
    pub fn with_instrument_capacity(mut self, capacity: usize) -> Self {
        self.instrument_capacity = capacity;
        self
    }

    /// Sets the number of fills a portfolio reserves room for.
    #[must_use]
    pub fn with_portfolio_capacity(mut self, capacity: usize) -> Self {
        self.portfolio_capacity = capacity;
        self
    }

    /// Sets whether the feed starts with a header row.
    #[must_use]
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Sets the feed's field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Checks the configuration for unusable values.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::InvalidConfig`] if the instrument capacity
    /// is zero, exceeds the handle range, or the delimiter is a line break.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.instrument_capacity == 0 {
            return Err(BacktestError::InvalidConfig {
                message: "instrument_capacity must be greater than zero".to_string(),
            });
        }
        if u32::try_from(self.instrument_capacity).is_err() {
            return Err(BacktestError::InvalidConfig {
                message: format!(
                    "instrument_capacity {} exceeds the instrument id range",
                    self.instrument_capacity
                ),
            });
        }
        if matches!(self.delimiter, b'\n' | b'\r') {
            return Err(BacktestError::InvalidConfig {
                message: "delimiter cannot be a line terminator".to_string(),
            });
        }
        Ok(())
    }
}
