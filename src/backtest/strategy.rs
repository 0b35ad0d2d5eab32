/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! The strategy seam and a portfolio-recording reference strategy.
//!
//! A [`Strategy`] supplies the market-data feed, reacts to fills and is told
//! when the feed ends. It may also watch each market-data update as it is
//! ingested. It is shared between both execution units as an
//! `Arc<dyn Strategy>`, so every callback takes `&self`.

use crate::backtest::config::BacktestConfig;
use crate::backtest::error::{BacktestError, StrategyError};
use crate::backtest::source::{CsvRecordSource, RecordSource};
use crate::backtest::types::{FeedMode, InstrumentId, Order, QuoteUpdate, Side, TradePrint};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Callbacks a trading strategy provides to the backtester.
pub trait Strategy: Send + Sync {
    /// Opens the market-data feed and names its mode.
    ///
    /// Called once, on the caller's thread, before either execution unit
    /// starts.
    ///
    /// # Errors
    ///
    /// Any error aborts the run before it starts.
    fn start(&self) -> Result<(Box<dyn RecordSource>, FeedMode), BacktestError>;

    /// Called synchronously by the matching unit for every fill.
    ///
    /// `quotes` holds the instrument's buffered quote history in quote mode
    /// (handed over and cleared) and is `None` in print mode.
    ///
    /// # Errors
    ///
    /// An error is recorded as a matching fault; matching continues.
    fn fill_order(
        &self,
        order: &Order,
        quotes: Option<&[QuoteUpdate]>,
    ) -> Result<(), StrategyError>;

    /// Called exactly once by the ingestion unit when the feed is exhausted.
    fn stop(&self);

    /// Called by the ingestion unit after a quote update is buffered.
    ///
    /// Runs on the ingestion thread and must not block it.
    fn on_quote(&self, _quote: &QuoteUpdate) {}

    /// Called by the ingestion unit after a trade print is buffered.
    fn on_print(&self, _print: &TradePrint) {}
}

/// Orders filled during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Portfolio {
    fills: Vec<Order>,
}

impl Portfolio {
    /// Creates an empty portfolio with room for `capacity` fills.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fills: Vec::with_capacity(capacity),
        }
    }

    /// Records a filled order.
    pub fn record(&mut self, order: Order) {
        self.fills.push(order);
    }

    /// Filled orders in fill order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.fills
    }

    /// Number of fills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fills.len()
    }

    /// Returns `true` if nothing has filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Signed filled size for `instrument`: buys add, sells subtract.
    #[must_use]
    pub fn net_position(&self, instrument: InstrumentId) -> i64 {
        self.fills
            .iter()
            .filter(|order| order.instrument == instrument)
            .map(signed_size)
            .sum()
    }

    /// Net position for every instrument with at least one fill.
    #[must_use]
    pub fn positions(&self) -> BTreeMap<InstrumentId, i64> {
        let mut positions = BTreeMap::new();
        for order in &self.fills {
            *positions.entry(order.instrument).or_insert(0) += signed_size(order);
        }
        positions
    }

    /// Discards every fill.
    pub fn clear(&mut self) {
        self.fills.clear();
    }
}

fn signed_size(order: &Order) -> i64 {
    match order.side {
        Side::Buy => order.size,
        Side::Sell => -order.size,
    }
}

/// Strategy that reads a CSV feed and records every fill in a [`Portfolio`].
#[derive(Debug)]
pub struct PortfolioStrategy {
    feed: PathBuf,
    mode: FeedMode,
    config: BacktestConfig,
    portfolio: Mutex<Portfolio>,
}

impl PortfolioStrategy {
    /// Creates a strategy over the feed at `feed`.
    pub fn new(feed: impl Into<PathBuf>, mode: FeedMode, config: BacktestConfig) -> Self {
        let portfolio = Portfolio::with_capacity(config.portfolio_capacity);
        Self {
            feed: feed.into(),
            mode,
            config,
            portfolio: Mutex::new(portfolio),
        }
    }

    /// Path of the feed this strategy opens.
    #[must_use]
    pub fn feed_path(&self) -> &Path {
        &self.feed
    }

    /// Mode the feed is read in.
    #[must_use]
    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    /// A copy of the current portfolio.
    #[must_use]
    pub fn portfolio(&self) -> Portfolio {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Portfolio> {
        self.portfolio.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Strategy for PortfolioStrategy {
    fn start(&self) -> Result<(Box<dyn RecordSource>, FeedMode), BacktestError> {
        let source = CsvRecordSource::from_path(&self.feed, &self.config)?;
        info!(feed = %self.feed.display(), mode = %self.mode, "strategy started");
        Ok((Box::new(source), self.mode))
    }

    fn fill_order(
        &self,
        order: &Order,
        quotes: Option<&[QuoteUpdate]>,
    ) -> Result<(), StrategyError> {
        debug!(
            order_id = order.order_id,
            instrument = %order.instrument,
            quotes = quotes.map_or(0, <[QuoteUpdate]>::len),
            "recording fill"
        );
        self.lock().record(*order);
        Ok(())
    }

    // Fills may still arrive after the feed ends, so the portfolio is kept.
    fn stop(&self) {
        let portfolio = self.lock();
        info!(fills = portfolio.len(), "feed exhausted, portfolio:");
        for (instrument, position) in portfolio.positions() {
            info!("  instrument {}: net position {}", instrument, position);
        }
    }
}
