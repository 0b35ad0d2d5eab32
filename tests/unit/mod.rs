mod config_tests;
mod end_to_end_tests;
mod ingest_tests;
mod sequencer_tests;
mod strategy_tests;
