//! Order sequencer: the hand-off between the strategy and the matching loop.
//!
//! The sequencer is an append-only, index-addressed order log with a
//! monotonically advancing cursor. Producers append through an
//! [`OrderSubmitter`]; the single consumer (the matching engine) reads through
//! an [`OrderConsumer`] and blocks on a condition variable while no order is
//! pending.
//!
//! # Types
//!
//! - [`OrderSubmitter`]: cloneable producer handle
//! - [`OrderConsumer`]: unique consumer handle
//! - [`WaitOutcome`]: why the consumer woke up
//! - [`SequencedOrder`]: an order together with its sequence number
//!
//! Use [`order_sequencer`] to create a connected pair.

pub mod queue;
pub mod types;

pub use queue::{OrderConsumer, OrderSubmitter, order_sequencer, order_sequencer_with_capacity};
pub use types::{SequencedOrder, WaitOutcome};
