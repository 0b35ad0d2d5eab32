//! Runs a backtest over a feed file and prints the run summary as JSON.
//!
//! Usage:
//!
//! ```text
//! backtest <feed.csv> [quotes|prints] [instrument]
//! ```
//!
//! The chosen instrument is seeded with some liquidity, a short sequence of
//! alternating orders is submitted while the feed is ingested, and the
//! summary plus the final per-instrument state are printed once both units
//! have finished.

use backtest_core::prelude::*;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const SEED_QUANTITY: i64 = 10;
const ORDER_SIZES: [i64; 4] = [4, 8, 3, 1];

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(feed) = args.next() else {
        eprintln!("usage: backtest <feed.csv> [quotes|prints] [instrument]");
        return ExitCode::from(2);
    };
    let mode = match args.next().map(|raw| raw.parse::<FeedMode>()).transpose() {
        Ok(mode) => mode.unwrap_or(FeedMode::Quotes),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    let instrument = match args.next().map(|raw| raw.parse::<InstrumentId>()).transpose() {
        Ok(instrument) => instrument.unwrap_or_else(|| InstrumentId::new(1)),
        Err(e) => {
            eprintln!("invalid instrument: {e}");
            return ExitCode::from(2);
        }
    };

    match run(&feed, mode, instrument) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("backtest failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(feed: &str, mode: FeedMode, instrument: InstrumentId) -> Result<bool, BacktestError> {
    info!("=== Backtest: {} feed {} on instrument {} ===", mode, feed, instrument);

    let config = BacktestConfig::default();
    let strategy = Arc::new(PortfolioStrategy::new(feed, mode, config.clone()));
    let backtester = Backtester::new(config)?;
    backtester.seed_liquidity(instrument, SEED_QUANTITY, false);
    let state = backtester.market_state();

    let shared: Arc<dyn Strategy> = strategy.clone();
    let summary = backtester.run(shared, |orders| {
        for (order_id, size) in (1u64..).zip(ORDER_SIZES) {
            let side = if order_id % 2 == 0 { Side::Sell } else { Side::Buy };
            if let Err(e) = orders.submit(instrument, 100, size, order_id, side) {
                error!("order {} rejected by sequencer: {}", order_id, e);
            }
        }
    })?;

    let snapshot: Vec<InstrumentSnapshot> = state
        .snapshot()
        .into_iter()
        .filter(|entry| entry.carry_entry.is_some() || !entry.liquidity.is_flat())
        .collect();
    let report = serde_json::json!({
        "summary": summary,
        "instruments": snapshot,
        "net_position": strategy.portfolio().net_position(instrument),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("failed to render summary: {}", e),
    }
    Ok(summary.success)
}
