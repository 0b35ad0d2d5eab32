use backtest_core::backtest::directory::InstrumentDirectory;
use backtest_core::{
    BacktestConfig, BacktestError, Backtester, DEFAULT_INSTRUMENT_CAPACITY, InstrumentId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_pre_seeds_fifty_instruments() {
        let config = BacktestConfig::default();
        assert_eq!(config.instrument_capacity, DEFAULT_INSTRUMENT_CAPACITY);

        let directory = InstrumentDirectory::new(config.instrument_capacity);
        assert_eq!(directory.len(), 50);
        assert!((0..50u32).all(|raw| directory.contains(InstrumentId::new(raw))));
        assert!(!directory.contains(InstrumentId::new(50)));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BacktestConfig::from_json_str(r#"{ "has_headers": true, "delimiter": 59 }"#)
            .expect("valid config");
        assert!(config.has_headers);
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.instrument_capacity, 50);
        assert_eq!(config.portfolio_capacity, 10_000);
    }

    #[test]
    fn test_zero_capacity_is_rejected_by_backtester() {
        let config = BacktestConfig::default().with_instrument_capacity(0);
        assert!(matches!(
            Backtester::new(config),
            Err(BacktestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_invalid_config() {
        assert!(matches!(
            BacktestConfig::from_json_str("{ not json"),
            Err(BacktestError::InvalidConfig { .. })
        ));
    }
}
