//! Core types for the order sequencer.

use crate::backtest::types::Order;
use serde::Serialize;

/// An order as published by the sequencer.
///
/// `sequence` is the order's index in the log: unique, gap-free and assigned
/// in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequencedOrder {
    /// Position in the order log
    pub sequence: u64,
    /// The order itself
    pub order: Order,
}

/// Result of the consumer waiting for work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Orders are pending; `visible` is the total count at wake time.
    Ready {
        /// Snapshot of the total order count
        visible: u64,
    },

    /// The sequencer is closed but orders are still pending; `visible` is
    /// the final total count.
    Draining {
        /// Final total order count
        visible: u64,
    },

    /// The sequencer is closed and every order has been consumed.
    Finished,
}
