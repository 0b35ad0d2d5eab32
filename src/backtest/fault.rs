/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Thread-safe accumulation of non-fatal processing failures.
//!
//! Both execution units push a [`Fault`] for every row or order they could
//! not process and carry on with the next one. The sink is drained once,
//! after both units have finished.

use crate::backtest::types::InstrumentId;
use crate::utils::current_time_millis;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{info, warn};

/// Execution unit a fault originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultSource {
    /// The market-data ingestion loop
    Ingestion,
    /// The order-matching loop
    Matching,
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSource::Ingestion => write!(f, "ingestion"),
            FaultSource::Matching => write!(f, "matching"),
        }
    }
}

/// Why a single row or order could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[non_exhaustive]
pub enum FaultReason {
    /// The row has fewer columns than the feed mode requires.
    #[error("missing {field} field (column {column})")]
    MissingField {
        /// Logical name of the field
        field: &'static str,
        /// Zero-based column index
        column: usize,
    },

    /// A field did not convert to its expected numeric type.
    #[error("invalid {field} value {value:?}: {message}")]
    InvalidField {
        /// Logical name of the field
        field: &'static str,
        /// Raw field contents
        value: String,
        /// Parser message
        message: String,
    },

    /// The record source reported an error for this row.
    #[error("record source error: {message}")]
    Source {
        /// Source error message
        message: String,
    },

    /// The order requested a non-positive size.
    #[error("invalid order size {size}")]
    InvalidOrderSize {
        /// The offending size
        size: i64,
    },

    /// A liquidity counter was observed below zero.
    #[error("liquidity for instrument {instrument} is negative ({quantity})")]
    NegativeLiquidity {
        /// Instrument whose counter is broken
        instrument: InstrumentId,
        /// Observed quantity
        quantity: i64,
    },

    /// Matching arithmetic overflowed.
    #[error("arithmetic overflow matching size {size} against quantity {quantity}")]
    ArithmeticOverflow {
        /// Liquidity quantity before the match
        quantity: i64,
        /// Requested order size
        size: i64,
    },

    /// The strategy's fill callback returned an error.
    #[error("fill callback failed: {message}")]
    FillCallback {
        /// Strategy error message
        message: String,
    },
}

/// A recorded, non-fatal processing failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    /// Unit that recorded the fault
    pub source: FaultSource,
    /// Feed row (ingestion) or order sequence number (matching)
    pub index: u64,
    /// What went wrong
    pub reason: FaultReason,
    /// Unix timestamp in milliseconds when the fault was recorded
    pub timestamp: u64,
}

impl Fault {
    /// Creates a fault for a feed row.
    pub fn ingestion(row: u64, reason: FaultReason) -> Self {
        Self {
            source: FaultSource::Ingestion,
            index: row,
            reason,
            timestamp: current_time_millis(),
        }
    }

    /// Creates a fault for an order sequence number.
    pub fn matching(sequence: u64, reason: FaultReason) -> Self {
        Self {
            source: FaultSource::Matching,
            index: sequence,
            reason,
            timestamp: current_time_millis(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] #{}: {}", self.source, self.index, self.reason)
    }
}

/// Append-only fault list shared between the execution units.
///
/// Cloning the sink yields another handle onto the same list.
#[derive(Debug, Clone, Default)]
pub struct FaultSink {
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl FaultSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section pushes or drains whole elements, so a poisoned
    // list is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<Fault>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a fault. Safe to call from any thread.
    pub fn record(&self, fault: Fault) {
        self.lock().push(fault);
    }

    /// Number of faults recorded and not yet drained.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no faults are pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` if any pending fault came from the matching loop.
    pub fn has_matching_faults(&self) -> bool {
        self.lock()
            .iter()
            .any(|fault| fault.source == FaultSource::Matching)
    }

    /// Removes and returns every pending fault in the order recorded.
    pub fn drain(&self) -> Vec<Fault> {
        std::mem::take(&mut *self.lock())
    }

    /// Drains the sink and logs one line per fault plus a summary.
    pub fn report(&self) -> Vec<Fault> {
        let faults = self.drain();
        if faults.is_empty() {
            info!("no faults recorded");
            return faults;
        }

        for fault in &faults {
            warn!(source = %fault.source, index = fault.index, "fault occurred: {}", fault.reason);
        }
        let matching = faults
            .iter()
            .filter(|fault| fault.source == FaultSource::Matching)
            .count();
        info!(
            total = faults.len(),
            ingestion = faults.len() - matching,
            matching,
            "fault summary"
        );
        faults
    }
}
