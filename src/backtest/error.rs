//! Backtest error types
//!
//! [`BacktestError`] covers failures that stop a run before (or instead of)
//! completing it. Per-row and per-order problems are not errors in this
//! sense; they are recorded as [`Fault`](crate::backtest::fault::Fault)s.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring, starting or finishing a backtest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BacktestError {
    /// The market-data feed could not be opened.
    #[error("failed to open feed {}: {message}", .path.display())]
    FeedOpen {
        /// Path of the feed that failed to open
        path: PathBuf,
        /// Underlying I/O error message
        message: String,
    },

    /// An order was submitted after the sequencer was closed.
    #[error("order sequencer is closed")]
    SequencerClosed,

    /// An execution unit could not be launched.
    #[error("failed to spawn {unit} unit: {message}")]
    ThreadSpawn {
        /// Which unit failed to launch (`ingestion` or `matching`)
        unit: &'static str,
        /// Underlying error message
        message: String,
    },

    /// A Tokio-driven run was started outside a Tokio runtime.
    #[error("no Tokio runtime available: {message}")]
    NoRuntime {
        /// Underlying runtime error message
        message: String,
    },

    /// An execution unit panicked before returning its report.
    #[error("{unit} unit panicked")]
    WorkerPanicked {
        /// Which unit panicked
        unit: &'static str,
    },

    /// The supplied configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem
        message: String,
    },

    /// The strategy failed during start-up.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Error raised by a [`Strategy`](crate::backtest::strategy::Strategy) callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("strategy error: {message}")]
pub struct StrategyError {
    /// Human-readable description of the failure
    pub message: String,
}

impl StrategyError {
    /// Creates a strategy error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors produced by a record source while reading the feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FeedError {
    /// A single row could not be decoded; later rows are still readable.
    #[error("malformed record at row {row}: {message}")]
    Malformed {
        /// 1-based row number in the feed
        row: u64,
        /// Decoder message
        message: String,
    },

    /// The underlying stream failed; the source ends after this error.
    #[error("feed I/O error: {message}")]
    Io {
        /// Underlying I/O error message
        message: String,
    },
}

impl FeedError {
    /// Returns `true` when the source cannot produce further records.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeedError::Io { .. })
    }

    /// Row the error refers to, when known.
    #[must_use]
    pub fn row(&self) -> Option<u64> {
        match self {
            FeedError::Malformed { row, .. } => Some(*row),
            FeedError::Io { .. } => None,
        }
    }
}
