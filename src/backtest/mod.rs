//! Concurrent ingestion and matching core of the backtester.

pub mod config;
pub mod directory;
/// Order-matching loop driving the sequencer.
pub mod engine;
pub mod error;
pub mod fault;
/// Market-data ingestion loop.
pub mod ingest;
/// Multi-unit run driver with std and Tokio variants.
pub mod manager;
pub mod matching;
pub mod report;
pub mod sequencer;
pub mod source;
pub mod state;
pub mod strategy;
pub mod types;

pub use config::BacktestConfig;
pub use directory::InstrumentDirectory;
pub use engine::{EngineState, MatchingEngine};
pub use error::{BacktestError, FeedError, StrategyError};
pub use fault::{Fault, FaultReason, FaultSink, FaultSource};
pub use ingest::MarketDataIngestor;
pub use manager::{Backtester, RunningBacktest, RunningBacktestTokio};
pub use matching::{FillKind, MatchOutcome, match_against};
pub use report::{IngestReport, MatchReport, RunSummary};
pub use sequencer::{OrderConsumer, OrderSubmitter, SequencedOrder, WaitOutcome, order_sequencer};
pub use source::{CsvRecordSource, FeedRecord, RecordSource};
pub use state::{InstrumentHistory, InstrumentSnapshot, MarketState};
pub use strategy::{Portfolio, PortfolioStrategy, Strategy};
pub use types::{
    FeedMode, InstrumentId, InstrumentLiquidity, Order, QuoteUpdate, Side, TradePrint,
};
