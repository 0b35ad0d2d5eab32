/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Prelude module that re-exports commonly used types and traits.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use backtest_core::prelude::*;
//! ```
//!
//! This imports everything needed to configure, drive and inspect a run.

// Run driver
pub use crate::backtest::config::BacktestConfig;
pub use crate::backtest::error::{BacktestError, FeedError, StrategyError};
pub use crate::backtest::manager::{Backtester, RunningBacktest, RunningBacktestTokio};

// Strategy seam
pub use crate::backtest::source::{CsvRecordSource, FeedRecord, RecordSource};
pub use crate::backtest::strategy::{Portfolio, PortfolioStrategy, Strategy};

// Order flow and matching
pub use crate::backtest::engine::{EngineState, MatchingEngine};
pub use crate::backtest::matching::{FillKind, MatchOutcome};
pub use crate::backtest::sequencer::{OrderConsumer, OrderSubmitter, WaitOutcome};

// State and reporting
pub use crate::backtest::directory::InstrumentDirectory;
pub use crate::backtest::fault::{Fault, FaultReason, FaultSink, FaultSource};
pub use crate::backtest::report::{IngestReport, MatchReport, RunSummary};
pub use crate::backtest::state::{InstrumentSnapshot, MarketState};

// Data model
pub use crate::backtest::types::{
    FeedMode, InstrumentId, InstrumentLiquidity, Order, QuoteUpdate, Side, TradePrint,
};
