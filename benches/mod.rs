use criterion::{criterion_group, criterion_main};


use matching::register_benchmarks as register_matching_benchmarks;
use sequencer::register_benchmarks as register_sequencer_benchmarks;

// Define the benchmark groups
criterion_group!(
    benches,
    register_matching_benchmarks,
    register_sequencer_benchmarks,
);

criterion_main!(benches);
