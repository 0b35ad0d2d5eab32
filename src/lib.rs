//! # Concurrent Backtest Matching Core
//!
//! A single-node order-matching core for back-testing trading strategies. It reads a
//! sequential market-data feed, keeps per-instrument liquidity state, accepts orders from a
//! strategy and matches them against that state while the feed is still being ingested.
//!
//! ## Key Features
//!
//! - **Two Execution Units**: Market-data ingestion and order matching run concurrently over
//!   shared per-instrument state, one producer and one consumer.
//!
//! - **Sequenced Order Flow**: Orders are appended to a grow-only log and matched strictly in
//!   submission order. The matcher sleeps on a condition variable while the log is drained.
//!
//! - **Per-Instrument Slots**: Each instrument owns an atomic liquidity cell and its own history
//!   lock, so unrelated instruments never contend.
//!
//! - **Faults, Not Panics**: A malformed feed row or a broken order is recorded as a typed fault
//!   and the loop moves on. Faults are drained and reported once the run finishes.
//!
//! - **Std and Tokio Drivers**: Run both units on named OS threads or as blocking tasks on a
//!   Tokio runtime.
//!
//! ## Matching Model
//!
//! Matching is deliberately simple. Each instrument carries a signed liquidity quantity and a
//! carry direction. An order of either side consumes the quantity; an order larger than the
//! quantity inverts the carry direction and leaves the surplus behind. An instrument with no
//! quantity, no sell carry and no buffered market data does not fill.
//!
//! | Liquidity | Order size | Result                         |
//! |-----------|------------|--------------------------------|
//! | 5         | 3          | fill, 2 left                   |
//! | 5         | 5          | fill, 0 left                   |
//! | 5         | 7          | fill, 2 left, carry flipped    |
//! | 0 (flat)  | any        | not filled                     |
//!
//! ## Feed Format
//!
//! The feed is a delimited text file, one event per row. Column 0 is a timestamp and column 1
//! the instrument id. Quote feeds continue with bid price, ask price, bid size and ask size.
//! Print feeds continue with trade price, size and an aggressor flag (`> 0` for a buyer).
//!
//! ## Example
//!
//! ```rust,no_run
//! use backtest_core::prelude::*;
//! use std::sync::Arc;
//!
//! let config = BacktestConfig::default();
//! let strategy = Arc::new(PortfolioStrategy::new("PRINTS.csv", FeedMode::Prints, config.clone()));
//! let backtester = Backtester::new(config).expect("valid config");
//!
//! let summary = backtester
//!     .run(strategy, |orders| {
//!         let _ = orders.submit(InstrumentId::new(1), 100, 5, 1, Side::Buy);
//!     })
//!     .expect("backtest ran");
//! println!("{}", summary);
//! ```

pub mod backtest;

pub mod prelude;
mod utils;

pub use backtest::config::{BacktestConfig, DEFAULT_INSTRUMENT_CAPACITY, DEFAULT_PORTFOLIO_CAPACITY};
pub use backtest::error::{BacktestError, FeedError, StrategyError};
pub use backtest::fault::{Fault, FaultReason, FaultSink, FaultSource};
pub use backtest::manager::{Backtester, RunningBacktest, RunningBacktestTokio};
pub use backtest::report::{IngestReport, MatchReport, RunSummary};
pub use backtest::sequencer::{OrderConsumer, OrderSubmitter, order_sequencer};
pub use backtest::source::{CsvRecordSource, FeedRecord, RecordSource};
pub use backtest::state::MarketState;
pub use backtest::strategy::{Portfolio, PortfolioStrategy, Strategy};
pub use backtest::types::{
    FeedMode, InstrumentId, InstrumentLiquidity, Order, QuoteUpdate, Side, TradePrint,
};
pub use utils::current_time_millis;
