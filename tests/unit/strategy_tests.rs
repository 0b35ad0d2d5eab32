use backtest_core::{
    BacktestConfig, BacktestError, Backtester, FeedMode, InstrumentId, PortfolioStrategy, Side,
    Strategy,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn quotes_feed() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "timestamp;instrument;bid;ask;bid_size;ask_size").expect("write header");
    writeln!(file, "1000;3;99;101;5;6").expect("write row");
    writeln!(file, "1001;3;99;102;4;6").expect("write row");
    file.flush().expect("flush feed");
    file
}

fn config() -> BacktestConfig {
    BacktestConfig::default()
        .with_headers(true)
        .with_delimiter(b';')
        .with_portfolio_capacity(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_reads_configured_feed() {
        let feed = quotes_feed();
        let strategy = PortfolioStrategy::new(feed.path(), FeedMode::Quotes, config());

        let (source, mode) = strategy.start().expect("feed opens");
        assert_eq!(mode, FeedMode::Quotes);
        let rows: Vec<_> = source.collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(Result::is_ok));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_driver_runs_quotes_feed() {
        let feed = quotes_feed();
        let strategy = Arc::new(PortfolioStrategy::new(feed.path(), FeedMode::Quotes, config()));
        let backtester = Backtester::new(config()).expect("valid config");
        let instrument = InstrumentId::new(3);
        backtester.seed_liquidity(instrument, 5, false);

        let shared: Arc<dyn Strategy> = strategy.clone();
        let running = backtester.start_tokio(shared).expect("run starts");
        running
            .submitter()
            .submit(instrument, 100, 2, 1, Side::Buy)
            .expect("open sequencer");
        let summary = running.finish().await.expect("run completes");

        assert!(summary.success);
        assert_eq!(summary.ingest.ingested, 2);
        assert_eq!(summary.matching.filled, 1);
        assert_eq!(strategy.portfolio().net_position(instrument), 2);
    }

    #[test]
    fn test_tokio_driver_needs_a_runtime() {
        let feed = quotes_feed();
        let strategy: Arc<dyn Strategy> =
            Arc::new(PortfolioStrategy::new(feed.path(), FeedMode::Quotes, config()));
        let backtester = Backtester::new(config()).expect("valid config");
        assert!(matches!(
            backtester.start_tokio(strategy),
            Err(BacktestError::NoRuntime { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_tokio_run_releases_strategy() {
        let feed = quotes_feed();
        let strategy = Arc::new(PortfolioStrategy::new(feed.path(), FeedMode::Quotes, config()));
        let backtester = Backtester::new(config()).expect("valid config");
        let submitter = backtester.submitter();

        let shared: Arc<dyn Strategy> = strategy.clone();
        let running = backtester.start_tokio(shared).expect("run starts");
        drop(running);
        assert!(submitter.is_closed());

        let mut released = false;
        for _ in 0..500 {
            if Arc::strong_count(&strategy) == 1 {
                released = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(released);
    }
}
