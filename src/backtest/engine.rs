/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Order-matching loop.
//!
//! The engine is the single consumer of the order sequencer and the only
//! writer of liquidity counters. It sleeps while no order is pending, drains
//! every order visible when it wakes, and exits once the sequencer is closed
//! and empty.

use crate::backtest::directory::InstrumentDirectory;
use crate::backtest::fault::{Fault, FaultReason, FaultSink};
use crate::backtest::matching::{MatchOutcome, match_against};
use crate::backtest::report::MatchReport;
use crate::backtest::sequencer::{OrderConsumer, WaitOutcome};
use crate::backtest::state::MarketState;
use crate::backtest::strategy::Strategy;
use crate::backtest::types::{FeedMode, Order};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle phase of the matching loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Waiting for orders.
    Idle,
    /// Processing the orders visible at the last wake-up.
    Matching,
    /// The sequencer is closed; processing the remaining orders before exit.
    Draining,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Matching => write!(f, "matching"),
            EngineState::Draining => write!(f, "draining"),
        }
    }
}

/// Consumer loop that matches sequenced orders against [`MarketState`].
pub struct MatchingEngine {
    state: Arc<MarketState>,
    directory: Arc<InstrumentDirectory>,
    consumer: OrderConsumer,
    strategy: Arc<dyn Strategy>,
    faults: FaultSink,
    mode: FeedMode,
    phase: EngineState,
    report: MatchReport,
}

impl MatchingEngine {
    /// Creates an idle engine.
    pub fn new(
        state: Arc<MarketState>,
        directory: Arc<InstrumentDirectory>,
        consumer: OrderConsumer,
        strategy: Arc<dyn Strategy>,
        faults: FaultSink,
        mode: FeedMode,
    ) -> Self {
        Self {
            state,
            directory,
            consumer,
            strategy,
            faults,
            mode,
            phase: EngineState::Idle,
            report: MatchReport::default(),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> EngineState {
        self.phase
    }

    /// Counters so far.
    #[must_use]
    pub fn report(&self) -> MatchReport {
        self.report
    }

    /// Runs until the sequencer is closed and fully consumed.
    pub fn run(mut self) -> MatchReport {
        info!(mode = %self.mode, "matching started");
        loop {
            self.phase = EngineState::Idle;
            let visible = match self.consumer.wait_for_work() {
                WaitOutcome::Ready { visible } => {
                    self.phase = EngineState::Matching;
                    visible
                }
                WaitOutcome::Draining { visible } => {
                    if self.phase != EngineState::Draining {
                        debug!(visible, "sequencer closed, draining");
                    }
                    self.phase = EngineState::Draining;
                    visible
                }
                WaitOutcome::Finished => break,
            };

            while self.consumer.cursor() < visible {
                self.step();
            }
        }

        info!(
            processed = self.report.processed,
            filled = self.report.filled,
            rejected = self.report.rejected,
            faulted = self.report.faulted,
            "matching finished"
        );
        self.report
    }

    /// Matches the order at the cursor, if any, then advances the cursor.
    ///
    /// Returns `false` when no order was pending.
    pub fn step(&mut self) -> bool {
        let Some(next) = self.consumer.next_pending() else {
            return false;
        };
        self.report.processed += 1;

        match self.match_order(&next.order) {
            Ok(MatchOutcome::Filled { liquidity, kind }) => {
                self.report.filled += 1;
                info!(
                    "Order {} successfully placed ({:?}, remaining {})",
                    next.order, kind, liquidity.quantity
                );
            }
            Ok(MatchOutcome::NoLiquidity) => {
                self.report.rejected += 1;
                info!("Order {} not successful: no liquidity", next.order);
            }
            Err(reason) => {
                self.report.faulted += 1;
                warn!(sequence = next.sequence, %reason, "order faulted");
                self.faults.record(Fault::matching(next.sequence, reason));
            }
        }

        self.consumer.advance();
        true
    }

    fn match_order(&self, order: &Order) -> Result<MatchOutcome, FaultReason> {
        let id = order.instrument;
        if !self.directory.contains(id) {
            return Ok(MatchOutcome::NoLiquidity);
        }

        let outcome = match_against(
            self.state.liquidity(id),
            self.state.has_history(id, self.mode),
            order,
        )?;
        let MatchOutcome::Filled { liquidity, .. } = outcome else {
            return Ok(outcome);
        };

        self.state.store_liquidity(id, liquidity);
        let callback = match self.mode {
            FeedMode::Quotes => {
                let quotes = self.state.take_quotes(id);
                self.strategy.fill_order(order, Some(&quotes))
            }
            FeedMode::Prints => self.strategy.fill_order(order, None),
        };
        self.state.update_state(id, liquidity.carry_is_sell);

        callback.map_err(|e| FaultReason::FillCallback { message: e.message })?;
        Ok(outcome)
    }
}

impl fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("mode", &self.mode)
            .field("phase", &self.phase)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}
