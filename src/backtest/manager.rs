/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Top-level driver that wires the execution units together.
//!
//! A [`Backtester`] owns the shared state of one run. Starting it calls the
//! strategy's `start` on the caller's thread, then launches the ingestion and
//! matching units either as named OS threads ([`Backtester::start`]) or as
//! blocking tasks on the current Tokio runtime ([`Backtester::start_tokio`]).
//! Finishing a run joins ingestion, closes the sequencer, joins matching and
//! drains the fault sink.

use crate::backtest::config::BacktestConfig;
use crate::backtest::directory::InstrumentDirectory;
use crate::backtest::engine::MatchingEngine;
use crate::backtest::error::BacktestError;
use crate::backtest::fault::FaultSink;
use crate::backtest::ingest::MarketDataIngestor;
use crate::backtest::report::{IngestReport, MatchReport, RunSummary};
use crate::backtest::sequencer::{OrderConsumer, OrderSubmitter, order_sequencer};
use crate::backtest::source::RecordSource;
use crate::backtest::state::MarketState;
use crate::backtest::strategy::Strategy;
use crate::backtest::types::InstrumentId;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// Handles shared by the driver and a running backtest.
#[derive(Debug, Clone)]
struct SharedHandles {
    directory: Arc<InstrumentDirectory>,
    state: Arc<MarketState>,
    submitter: OrderSubmitter,
    faults: FaultSink,
}

impl SharedHandles {
    /// Drains the fault sink into a run summary.
    fn summarize(&self, ingest: IngestReport, matching: MatchReport) -> RunSummary {
        let success = !self.faults.has_matching_faults();
        let summary = RunSummary {
            ingest,
            matching,
            faults: self.faults.report(),
            success,
        };
        info!(%summary, "backtest finished");
        summary
    }
}

/// Closes the sequencer when a running backtest is dropped without being
/// finished, so the matching unit drains and exits instead of waiting forever.
///
/// Ingestion is not interrupted; it runs to the end of the feed on its own.
#[derive(Debug)]
struct CloseOnDrop(OrderSubmitter);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if !self.0.is_closed() {
            warn!("running backtest dropped before finish, closing order sequencer");
            self.0.close();
        }
    }
}

/// Everything an execution unit needs, built before any unit is launched.
struct Launch {
    ingestor: MarketDataIngestor,
    source: Box<dyn RecordSource>,
    engine: MatchingEngine,
    shared: SharedHandles,
}

/// A backtest that has not started yet.
#[derive(Debug)]
pub struct Backtester {
    config: BacktestConfig,
    shared: SharedHandles,
    consumer: OrderConsumer,
}

impl Backtester {
    /// Creates a backtester with empty market state.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::InvalidConfig`] if `config` is unusable.
    pub fn new(config: BacktestConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        let (submitter, consumer) = order_sequencer();
        let shared = SharedHandles {
            directory: Arc::new(InstrumentDirectory::new(config.instrument_capacity)),
            state: Arc::new(MarketState::new(config.instrument_capacity)),
            submitter,
            faults: FaultSink::new(),
        };
        info!(
            instruments = config.instrument_capacity,
            "backtester created"
        );
        Ok(Self {
            config,
            shared,
            consumer,
        })
    }

    /// Configuration of this run.
    #[must_use]
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// A producer handle onto the order sequencer.
    ///
    /// Orders submitted before the run starts are matched first.
    #[must_use]
    pub fn submitter(&self) -> OrderSubmitter {
        self.shared.submitter.clone()
    }

    /// Shared market state.
    #[must_use]
    pub fn market_state(&self) -> Arc<MarketState> {
        Arc::clone(&self.shared.state)
    }

    /// Shared instrument directory.
    #[must_use]
    pub fn directory(&self) -> Arc<InstrumentDirectory> {
        Arc::clone(&self.shared.directory)
    }

    /// Shared fault sink.
    #[must_use]
    pub fn faults(&self) -> FaultSink {
        self.shared.faults.clone()
    }

    /// Registers `id` and sets its starting liquidity.
    pub fn seed_liquidity(&self, id: InstrumentId, quantity: i64, carry_is_sell: bool) {
        self.shared.directory.register(id);
        self.shared.state.seed_liquidity(id, quantity, carry_is_sell);
    }

    fn prepare(self, strategy: &Arc<dyn Strategy>) -> Result<Launch, BacktestError> {
        let (source, mode) = strategy.start()?;
        let shared = self.shared;
        let ingestor = MarketDataIngestor::new(
            Arc::clone(&shared.directory),
            Arc::clone(&shared.state),
            shared.faults.clone(),
            mode,
        );
        let engine = MatchingEngine::new(
            Arc::clone(&shared.state),
            Arc::clone(&shared.directory),
            self.consumer,
            Arc::clone(strategy),
            shared.faults.clone(),
            mode,
        );
        Ok(Launch {
            ingestor,
            source,
            engine,
            shared,
        })
    }

    /// Starts both execution units on dedicated threads.
    ///
    /// # Errors
    ///
    /// Returns the strategy's start-up error, or
    /// [`BacktestError::ThreadSpawn`] if a thread cannot be created. In
    /// either case no unit is left running.
    pub fn start(self, strategy: Arc<dyn Strategy>) -> Result<RunningBacktest, BacktestError> {
        let Launch {
            ingestor,
            source,
            engine,
            shared,
        } = self.prepare(&strategy)?;

        let matching = thread::Builder::new()
            .name("backtest-matching".to_string())
            .spawn(move || engine.run())
            .map_err(|e| BacktestError::ThreadSpawn {
                unit: "matching",
                message: e.to_string(),
            })?;

        let ingestion = thread::Builder::new()
            .name("backtest-ingestion".to_string())
            .spawn(move || ingestor.run(source, strategy.as_ref()));
        let ingestion = match ingestion {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn ingestion thread: {}", e);
                shared.submitter.close();
                if matching.join().is_err() {
                    error!("matching unit panicked during shutdown");
                }
                return Err(BacktestError::ThreadSpawn {
                    unit: "ingestion",
                    message: e.to_string(),
                });
            }
        };

        info!("backtest started");
        Ok(RunningBacktest {
            close_on_drop: CloseOnDrop(shared.submitter.clone()),
            shared,
            ingestion,
            matching,
        })
    }

    /// Starts both execution units as blocking tasks on the current Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns the strategy's start-up error, or
    /// [`BacktestError::NoRuntime`] when called outside a runtime.
    pub fn start_tokio(
        self,
        strategy: Arc<dyn Strategy>,
    ) -> Result<RunningBacktestTokio, BacktestError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| BacktestError::NoRuntime {
                message: e.to_string(),
            })?;
        let Launch {
            ingestor,
            source,
            engine,
            shared,
        } = self.prepare(&strategy)?;

        let matching = runtime.spawn_blocking(move || engine.run());
        let ingestion = runtime.spawn_blocking(move || ingestor.run(source, strategy.as_ref()));

        info!("backtest started (Tokio)");
        Ok(RunningBacktestTokio {
            close_on_drop: CloseOnDrop(shared.submitter.clone()),
            shared,
            ingestion,
            matching,
        })
    }

    /// Starts the run, hands the submitter to `order_flow` on the calling
    /// thread, then finishes the run once `order_flow` returns.
    ///
    /// If `order_flow` panics the sequencer is closed during unwinding and
    /// the matching unit exits after draining.
    ///
    /// # Errors
    ///
    /// Any error from [`start`](Self::start) or
    /// [`RunningBacktest::finish`].
    pub fn run<F>(
        self,
        strategy: Arc<dyn Strategy>,
        order_flow: F,
    ) -> Result<RunSummary, BacktestError>
    where
        F: FnOnce(&OrderSubmitter),
    {
        let running = self.start(strategy)?;
        order_flow(&running.shared.submitter);
        running.finish()
    }
}

/// A backtest whose units run on OS threads.
///
/// Dropping it without calling [`finish`](Self::finish) closes the order
/// sequencer, so the matching thread still exits.
#[derive(Debug)]
pub struct RunningBacktest {
    close_on_drop: CloseOnDrop,
    shared: SharedHandles,
    ingestion: JoinHandle<IngestReport>,
    matching: JoinHandle<MatchReport>,
}

impl RunningBacktest {
    /// A producer handle onto the order sequencer.
    #[must_use]
    pub fn submitter(&self) -> OrderSubmitter {
        self.shared.submitter.clone()
    }

    /// Shared market state.
    #[must_use]
    pub fn market_state(&self) -> Arc<MarketState> {
        Arc::clone(&self.shared.state)
    }

    /// Shared instrument directory.
    #[must_use]
    pub fn directory(&self) -> Arc<InstrumentDirectory> {
        Arc::clone(&self.shared.directory)
    }

    /// Returns `true` once the feed has been fully ingested.
    #[must_use]
    pub fn is_ingestion_finished(&self) -> bool {
        self.ingestion.is_finished()
    }

    /// Declares order flow finished and waits for both units.
    ///
    /// Waits for ingestion, closes the sequencer, waits for matching to drain
    /// every submitted order, then reports and drains the fault sink.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::WorkerPanicked`] if either unit panicked.
    pub fn finish(self) -> Result<RunSummary, BacktestError> {
        let ingest = self.ingestion.join();
        self.close_on_drop.0.close();
        let matching = self
            .matching
            .join()
            .map_err(|_| BacktestError::WorkerPanicked { unit: "matching" })?;
        let ingest = ingest.map_err(|_| BacktestError::WorkerPanicked { unit: "ingestion" })?;
        Ok(self.shared.summarize(ingest, matching))
    }
}

/// A backtest whose units run as Tokio blocking tasks.
///
/// Dropping it without awaiting [`finish`](Self::finish) closes the order
/// sequencer, so the matching task still completes.
#[derive(Debug)]
pub struct RunningBacktestTokio {
    close_on_drop: CloseOnDrop,
    shared: SharedHandles,
    ingestion: tokio::task::JoinHandle<IngestReport>,
    matching: tokio::task::JoinHandle<MatchReport>,
}

impl RunningBacktestTokio {
    /// A producer handle onto the order sequencer.
    #[must_use]
    pub fn submitter(&self) -> OrderSubmitter {
        self.shared.submitter.clone()
    }

    /// Shared market state.
    #[must_use]
    pub fn market_state(&self) -> Arc<MarketState> {
        Arc::clone(&self.shared.state)
    }

    /// Async counterpart of [`RunningBacktest::finish`].
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::WorkerPanicked`] if either task failed.
    pub async fn finish(self) -> Result<RunSummary, BacktestError> {
        let ingest = self.ingestion.await;
        self.close_on_drop.0.close();
        let matching = self
            .matching
            .await
            .map_err(|_| BacktestError::WorkerPanicked { unit: "matching" })?;
        let ingest = ingest.map_err(|_| BacktestError::WorkerPanicked { unit: "ingestion" })?;
        Ok(self.shared.summarize(ingest, matching))
    }
}
