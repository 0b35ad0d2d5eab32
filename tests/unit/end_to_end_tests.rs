use backtest_core::{
    BacktestConfig, BacktestError, Backtester, FeedMode, InstrumentId, InstrumentLiquidity,
    PortfolioStrategy, Side, Strategy,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn feed_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write feed");
    file.flush().expect("flush feed");
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_prints_run() {
        let feed = feed_file("1,7,100,2,1\n2,7,101,1,0\n3,7,102,5,1\n");
        let config = BacktestConfig::default();
        let strategy = Arc::new(PortfolioStrategy::new(
            feed.path(),
            FeedMode::Prints,
            config.clone(),
        ));
        let backtester = Backtester::new(config).expect("valid config");
        let instrument = InstrumentId::new(7);
        backtester.seed_liquidity(instrument, 10, false);
        let state = backtester.market_state();

        let shared: Arc<dyn Strategy> = strategy.clone();
        let summary = backtester
            .run(shared, |orders| {
                orders
                    .submit(instrument, 100, 4, 1, Side::Buy)
                    .expect("open sequencer");
                orders
                    .submit(instrument, 100, 8, 2, Side::Sell)
                    .expect("open sequencer");
            })
            .expect("run completes");

        assert!(summary.success);
        assert_eq!(summary.ingest.ingested, 3);
        assert_eq!(summary.matching.filled, 2);
        assert_eq!(state.liquidity(instrument), InstrumentLiquidity::new(2, true));

        let portfolio = strategy.portfolio();
        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.net_position(instrument), -4);
    }

    #[test]
    fn test_intermediate_state_after_first_fill() {
        let feed = feed_file("");
        let config = BacktestConfig::default();
        let strategy: Arc<dyn Strategy> =
            Arc::new(PortfolioStrategy::new(feed.path(), FeedMode::Prints, config.clone()));
        let backtester = Backtester::new(config).expect("valid config");
        let instrument = InstrumentId::new(7);
        backtester.seed_liquidity(instrument, 10, false);
        let state = backtester.market_state();

        let summary = backtester
            .run(strategy, |orders| {
                orders
                    .submit(instrument, 100, 4, 1, Side::Buy)
                    .expect("open sequencer");
            })
            .expect("run completes");

        assert_eq!(summary.matching.filled, 1);
        assert_eq!(state.liquidity(instrument), InstrumentLiquidity::new(6, false));
    }

    #[test]
    fn test_unregistered_instrument_is_not_filled() {
        let feed = feed_file("1,3,100,2,1\n");
        let config = BacktestConfig::default().with_instrument_capacity(5);
        let strategy: Arc<dyn Strategy> =
            Arc::new(PortfolioStrategy::new(feed.path(), FeedMode::Prints, config.clone()));
        let backtester = Backtester::new(config).expect("valid config");

        let summary = backtester
            .run(strategy, |orders| {
                orders
                    .submit(InstrumentId::new(500), 100, 1, 1, Side::Buy)
                    .expect("open sequencer");
            })
            .expect("run completes");

        assert_eq!(summary.matching.rejected, 1);
        assert_eq!(summary.matching.filled, 0);
        assert!(summary.success);
    }

    #[test]
    fn test_missing_feed_fails_before_start() {
        let config = BacktestConfig::default();
        let strategy: Arc<dyn Strategy> = Arc::new(PortfolioStrategy::new(
            "/nonexistent/MARKET.csv",
            FeedMode::Quotes,
            config.clone(),
        ));
        let backtester = Backtester::new(config).expect("valid config");
        let submitter = backtester.submitter();

        let result = backtester.start(strategy);

        assert!(matches!(result, Err(BacktestError::FeedOpen { .. })));
        assert!(!submitter.is_closed());
    }

    #[test]
    fn test_summary_exports_as_json() {
        let feed = feed_file("1,1,100,2,1\nbad,row\n");
        let config = BacktestConfig::default();
        let strategy: Arc<dyn Strategy> =
            Arc::new(PortfolioStrategy::new(feed.path(), FeedMode::Prints, config.clone()));

        let summary = Backtester::new(config)
            .expect("valid config")
            .run(strategy, |_| {})
            .expect("run completes");

        let json: serde_json::Value =
            serde_json::from_str(&summary.to_json().expect("serializable")).expect("valid json");
        assert_eq!(json["ingest"]["faulted"], 1);
        assert_eq!(json["faults"][0]["source"], "ingestion");
        assert_eq!(json["success"], true);
    }
}
