use backtest_core::backtest::directory::InstrumentDirectory;
use backtest_core::backtest::ingest::MarketDataIngestor;
use backtest_core::{
    BacktestConfig, BacktestError, CsvRecordSource, FaultReason, FaultSink, FaultSource, FeedMode,
    IngestReport, InstrumentId, MarketState, Order, QuoteUpdate, RecordSource, Strategy,
    StrategyError, TradePrint,
};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct StopCounter {
    stops: AtomicUsize,
    updates: AtomicUsize,
}

impl Strategy for StopCounter {
    fn start(&self) -> Result<(Box<dyn RecordSource>, FeedMode), BacktestError> {
        Err(BacktestError::InvalidConfig {
            message: "not used".to_string(),
        })
    }

    fn fill_order(&self, _: &Order, _: Option<&[QuoteUpdate]>) -> Result<(), StrategyError> {
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn on_quote(&self, _: &QuoteUpdate) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn on_print(&self, _: &TradePrint) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

struct Ingested {
    directory: Arc<InstrumentDirectory>,
    state: Arc<MarketState>,
    faults: FaultSink,
    strategy: StopCounter,
    report: IngestReport,
}

impl Ingested {
    fn stops(&self) -> usize {
        self.strategy.stops.load(Ordering::SeqCst)
    }

    fn updates(&self) -> usize {
        self.strategy.updates.load(Ordering::SeqCst)
    }
}

fn ingest(mode: FeedMode, feed: &str) -> Ingested {
    let directory = Arc::new(InstrumentDirectory::new(50));
    let state = Arc::new(MarketState::new(50));
    let faults = FaultSink::new();
    let ingestor = MarketDataIngestor::new(
        Arc::clone(&directory),
        Arc::clone(&state),
        faults.clone(),
        mode,
    );
    let strategy = StopCounter::default();
    let source =
        CsvRecordSource::from_reader(Cursor::new(feed.to_string()), &BacktestConfig::default());
    let report = ingestor.run(source, &strategy);
    Ingested {
        directory,
        state,
        faults,
        strategy,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_malformed_row_among_many() {
        let feed = "\
1000,1,99,101,5,6
1001,1,99,101,5,6
1002,2,98,xx,5,6
1003,3,97,102,1,1
1004,1,99,101,5,6
1005,4,99,101,5,6
";
        let run = ingest(FeedMode::Quotes, feed);

        assert_eq!(run.report.rows, 6);
        assert_eq!(run.report.ingested, 5);
        assert_eq!(run.report.faulted, 1);
        assert_eq!(run.stops(), 1);
        assert_eq!(run.updates(), 5);
        assert_eq!(run.state.quote_count(InstrumentId::new(1)), 3);
        assert_eq!(run.state.quote_count(InstrumentId::new(2)), 0);

        let recorded = run.faults.drain();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].source, FaultSource::Ingestion);
        assert_eq!(recorded[0].index, 3);
        assert!(matches!(
            recorded[0].reason,
            FaultReason::InvalidField { field: "ask_price", .. }
        ));
    }

    #[test]
    fn test_new_instruments_grow_the_directory() {
        let feed = "1,60,100,2,1\n2,61,100,2,-1\n3,60,100,2,0\n";
        let run = ingest(FeedMode::Prints, feed);

        assert_eq!(run.report.ingested, 3);
        assert_eq!(run.updates(), 3);
        assert!(run.faults.is_empty());
        assert_eq!(run.directory.len(), 52);
        assert!(run.directory.contains(InstrumentId::new(60)));
        assert!(run.directory.contains(InstrumentId::new(61)));

        let prints = run.state.history(InstrumentId::new(60)).prints;
        assert_eq!(prints.len(), 2);
        assert!(prints[0].aggressor_is_buy);
        assert!(!prints[1].aggressor_is_buy);
        assert!(!run.state.history(InstrumentId::new(61)).prints[0].aggressor_is_buy);
    }

    #[test]
    fn test_padded_fields_are_trimmed() {
        let feed = " 5 , 9 , 100 , 4 , 1 \n";
        let run = ingest(FeedMode::Prints, feed);
        assert!(run.faults.is_empty());
        assert_eq!(run.state.print_count(InstrumentId::new(9)), 1);
    }

    #[test]
    fn test_short_print_row_reports_missing_field() {
        let run = ingest(FeedMode::Prints, "1,2,100\n");
        assert_eq!(run.report.faulted, 1);
        assert_eq!(run.stops(), 1);
        assert_eq!(run.updates(), 0);
        assert_eq!(
            run.faults.drain()[0].reason,
            FaultReason::MissingField {
                field: "size",
                column: 3,
            }
        );
    }
}
