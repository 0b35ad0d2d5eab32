//! Per-unit counters and the run summary.

use crate::backtest::fault::Fault;
use serde::Serialize;
use std::fmt;

/// Counters returned by the ingestion unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Rows pulled from the source, faulted ones included
    pub rows: u64,
    /// Rows that updated market state
    pub ingested: u64,
    /// Rows recorded as faults
    pub faulted: u64,
}

/// Counters returned by the matching unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    /// Orders consumed from the sequencer
    pub processed: u64,
    /// Orders that filled
    pub filled: u64,
    /// Orders rejected for lack of liquidity
    pub rejected: u64,
    /// Orders recorded as faults
    pub faulted: u64,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ingestion counters
    pub ingest: IngestReport,
    /// Matching counters
    pub matching: MatchReport,
    /// Every fault recorded during the run, in recording order
    pub faults: Vec<Fault>,
    /// `false` iff a matching fault was recorded
    pub success: bool,
}

impl RunSummary {
    /// Renders the summary as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} ingested={} orders={} filled={} rejected={} faults={} success={}",
            self.ingest.rows,
            self.ingest.ingested,
            self.matching.processed,
            self.matching.filled,
            self.matching.rejected,
            self.faults.len(),
            self.success
        )
    }
}
