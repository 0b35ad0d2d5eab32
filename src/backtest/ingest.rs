//! Market-data ingestion loop.
//!
//! Every feed row is independent: a row that fails to parse is recorded as a
//! fault and skipped, and the loop never waits on the matching unit.

use crate::backtest::directory::InstrumentDirectory;
use crate::backtest::fault::{Fault, FaultReason, FaultSink};
use crate::backtest::report::IngestReport;
use crate::backtest::source::{FeedRecord, RecordSource};
use crate::backtest::state::MarketState;
use crate::backtest::strategy::Strategy;
use crate::backtest::types::{FeedMode, InstrumentId, QuoteUpdate, TradePrint};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// A named column of the feed.
#[derive(Debug, Clone, Copy)]
struct Column {
    name: &'static str,
    index: usize,
}

const TIMESTAMP: Column = Column { name: "timestamp", index: 0 };
const INSTRUMENT: Column = Column { name: "instrument", index: 1 };

const BID_PRICE: Column = Column { name: "bid_price", index: 2 };
const ASK_PRICE: Column = Column { name: "ask_price", index: 3 };
const BID_SIZE: Column = Column { name: "bid_size", index: 4 };
const ASK_SIZE: Column = Column { name: "ask_size", index: 5 };

const TRADE_PRICE: Column = Column { name: "trade_price", index: 2 };
const TRADE_SIZE: Column = Column { name: "size", index: 3 };
const AGGRESSOR: Column = Column { name: "aggressor", index: 4 };

fn parse_field<T>(record: &FeedRecord, column: Column) -> Result<T, FaultReason>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = record.get(column.index).ok_or(FaultReason::MissingField {
        field: column.name,
        column: column.index,
    })?;
    raw.trim()
        .parse::<T>()
        .map_err(|e| FaultReason::InvalidField {
            field: column.name,
            value: raw.to_string(),
            message: e.to_string(),
        })
}

/// One parsed feed row.
#[derive(Debug, Clone, Copy)]
enum MarketEvent {
    Quote(QuoteUpdate),
    Print(TradePrint),
}

impl MarketEvent {
    fn instrument(&self) -> InstrumentId {
        match self {
            MarketEvent::Quote(quote) => quote.instrument,
            MarketEvent::Print(print) => print.instrument,
        }
    }

    fn notify(&self, strategy: &dyn Strategy) {
        match self {
            MarketEvent::Quote(quote) => strategy.on_quote(quote),
            MarketEvent::Print(print) => strategy.on_print(print),
        }
    }
}

/// Reads the feed into [`MarketState`] and the [`InstrumentDirectory`].
#[derive(Debug, Clone)]
pub struct MarketDataIngestor {
    directory: Arc<InstrumentDirectory>,
    state: Arc<MarketState>,
    faults: FaultSink,
    mode: FeedMode,
}

impl MarketDataIngestor {
    /// Creates an ingestor writing into the given shared state.
    pub fn new(
        directory: Arc<InstrumentDirectory>,
        state: Arc<MarketState>,
        faults: FaultSink,
        mode: FeedMode,
    ) -> Self {
        Self {
            directory,
            state,
            faults,
            mode,
        }
    }

    /// Mode rows are classified in.
    #[must_use]
    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    /// Consumes `source` to the end, then calls `strategy.stop()` once.
    ///
    /// Each buffered row is also passed to the strategy's market-data hook.
    pub fn run<S: RecordSource>(&self, source: S, strategy: &dyn Strategy) -> IngestReport {
        info!(mode = %self.mode, "ingestion started");
        let mut report = IngestReport::default();

        for item in source {
            report.rows += 1;
            let outcome = match item {
                Ok(record) => self
                    .apply(&record)
                    .map(|event| event.notify(strategy))
                    .map_err(|reason| (record.row(), reason)),
                Err(err) => Err((
                    err.row().unwrap_or(report.rows),
                    FaultReason::Source {
                        message: err.to_string(),
                    },
                )),
            };

            match outcome {
                Ok(_) => report.ingested += 1,
                Err((row, reason)) => {
                    warn!(row, %reason, "skipping feed row");
                    self.faults.record(Fault::ingestion(row, reason));
                    report.faulted += 1;
                }
            }
        }

        info!(
            rows = report.rows,
            ingested = report.ingested,
            faulted = report.faulted,
            "ingestion finished"
        );
        strategy.stop();
        report
    }

    /// Applies one record to market state and returns its instrument.
    ///
    /// The instrument is registered as soon as its id parses, even if a later
    /// field of the row is invalid.
    ///
    /// # Errors
    ///
    /// Returns the [`FaultReason`] for the first missing or invalid field.
    pub fn ingest_record(&self, record: &FeedRecord) -> Result<InstrumentId, FaultReason> {
        self.apply(record).map(|event| event.instrument())
    }

    fn apply(&self, record: &FeedRecord) -> Result<MarketEvent, FaultReason> {
        let instrument: InstrumentId = parse_field(record, INSTRUMENT)?;
        self.directory.register(instrument);
        let timestamp: i64 = parse_field(record, TIMESTAMP)?;

        let event = match self.mode {
            FeedMode::Quotes => MarketEvent::Quote(QuoteUpdate {
                timestamp,
                instrument,
                bid_price: parse_field(record, BID_PRICE)?,
                ask_price: parse_field(record, ASK_PRICE)?,
                bid_size: parse_field(record, BID_SIZE)?,
                ask_size: parse_field(record, ASK_SIZE)?,
            }),
            FeedMode::Prints => {
                let trade_price = parse_field(record, TRADE_PRICE)?;
                let size = parse_field(record, TRADE_SIZE)?;
                let aggressor: i64 = parse_field(record, AGGRESSOR)?;
                MarketEvent::Print(TradePrint {
                    timestamp,
                    instrument,
                    trade_price,
                    size,
                    aggressor_is_buy: aggressor > 0,
                })
            }
        };
        match event {
            MarketEvent::Quote(quote) => self.state.append_quote(quote),
            MarketEvent::Print(print) => self.state.append_print(print),
        }
        Ok(event)
    }
}
