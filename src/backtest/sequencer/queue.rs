//! Grow-only order log shared by a producer and a consumer handle.

use super::types::{SequencedOrder, WaitOutcome};
use crate::backtest::error::BacktestError;
use crate::backtest::types::{InstrumentId, Order, Side};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{info, trace};

#[derive(Debug, Default)]
struct SequencerState {
    /// Published orders; the total count is `log.len()`
    log: Vec<Order>,
    /// Index of the next order eligible for matching
    cursor: u64,
    closed: bool,
}

impl SequencerState {
    fn total(&self) -> u64 {
        self.log.len() as u64
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SequencerState>,
    ready: Condvar,
}

impl Shared {
    // Each critical section is a single push, increment or flag write.
    fn lock(&self) -> MutexGuard<'_, SequencerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a connected producer/consumer pair over an empty order log.
pub fn order_sequencer() -> (OrderSubmitter, OrderConsumer) {
    order_sequencer_with_capacity(0)
}

/// Like [`order_sequencer`], reserving room for `capacity` orders up front.
pub fn order_sequencer_with_capacity(capacity: usize) -> (OrderSubmitter, OrderConsumer) {
    let shared = Arc::new(Shared {
        state: Mutex::new(SequencerState {
            log: Vec::with_capacity(capacity),
            ..SequencerState::default()
        }),
        ready: Condvar::new(),
    });
    (
        OrderSubmitter {
            shared: Arc::clone(&shared),
        },
        OrderConsumer { shared },
    )
}

/// Producer handle. Clone it to submit from several threads.
#[derive(Debug, Clone)]
pub struct OrderSubmitter {
    shared: Arc<Shared>,
}

impl OrderSubmitter {
    /// Appends a new order built from its parts and returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::SequencerClosed`] once the sequencer is closed.
    pub fn submit(
        &self,
        instrument: InstrumentId,
        price: i64,
        size: i64,
        order_id: u64,
        side: Side,
    ) -> Result<u64, BacktestError> {
        self.submit_order(Order::new(instrument, price, size, order_id, side))
    }

    /// Appends `order` and wakes the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::SequencerClosed`] once the sequencer is closed.
    pub fn submit_order(&self, order: Order) -> Result<u64, BacktestError> {
        let sequence = {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(BacktestError::SequencerClosed);
            }
            let sequence = state.total();
            state.log.push(order);
            sequence
        };
        self.shared.ready.notify_one();
        trace!(sequence, order_id = order.order_id, "order submitted");
        Ok(sequence)
    }

    /// Closes the sequencer. Pending orders are still delivered; new
    /// submissions are refused. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.shared.lock();
            if !state.closed {
                state.closed = true;
                info!(total = state.total(), "order sequencer closed");
            }
        }
        self.shared.ready.notify_all();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Total number of orders submitted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.shared.lock().total()
    }

    /// Current consumer cursor.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.shared.lock().cursor
    }

    /// Orders submitted but not yet consumed.
    #[must_use]
    pub fn pending(&self) -> u64 {
        let state = self.shared.lock();
        state.total() - state.cursor
    }
}

/// Consumer handle. There is exactly one per sequencer.
#[derive(Debug)]
pub struct OrderConsumer {
    shared: Arc<Shared>,
}

impl OrderConsumer {
    /// The order at the cursor, or `None` if the cursor has caught up.
    #[must_use]
    pub fn next_pending(&self) -> Option<SequencedOrder> {
        let state = self.shared.lock();
        let sequence = state.cursor;
        state
            .log
            .get(sequence as usize)
            .map(|order| SequencedOrder {
                sequence,
                order: *order,
            })
    }

    /// Moves the cursor past the current order.
    ///
    /// Called after every match attempt, fill or not. Returns `false` and
    /// leaves the cursor untouched if there is no pending order.
    pub fn advance(&mut self) -> bool {
        let mut state = self.shared.lock();
        if state.cursor < state.total() {
            state.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Blocks until an order is pending or the sequencer is closed.
    ///
    /// The predicate is re-checked after every wake-up, so spurious wake-ups
    /// and notifications sent before the wait began are both harmless.
    pub fn wait_for_work(&self) -> WaitOutcome {
        let guard = self.shared.lock();
        let state = self
            .shared
            .ready
            .wait_while(guard, |state| state.cursor >= state.total() && !state.closed)
            .unwrap_or_else(PoisonError::into_inner);

        let visible = state.total();
        trace!(cursor = state.cursor, visible, closed = state.closed, "matcher woke");
        match (state.cursor < visible, state.closed) {
            (true, false) => WaitOutcome::Ready { visible },
            (true, true) => WaitOutcome::Draining { visible },
            (false, _) => WaitOutcome::Finished,
        }
    }

    /// Current cursor.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.shared.lock().cursor
    }

    /// Total number of orders submitted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.shared.lock().total()
    }

    /// Returns `true` once the producer side has closed the sequencer.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn order(order_id: u64) -> Order {
        Order::new(InstrumentId::new(1), 100, 1, order_id, Side::Buy)
    }

    #[test]
    fn test_sequence_numbers_are_gap_free() {
        let (submitter, consumer) = order_sequencer();
        for expected in 0..5 {
            assert_eq!(submitter.submit_order(order(expected + 10)).ok(), Some(expected));
        }
        assert_eq!(consumer.total(), 5);
        assert_eq!(submitter.pending(), 5);
    }

    #[test]
    fn test_next_pending_and_advance() {
        let (submitter, mut consumer) = order_sequencer();
        assert!(consumer.next_pending().is_none());
        assert!(!consumer.advance());

        submitter.submit_order(order(1)).expect("open sequencer");
        submitter.submit_order(order(2)).expect("open sequencer");

        let first = consumer.next_pending().expect("pending order");
        assert_eq!(first.sequence, 0);
        assert_eq!(first.order.order_id, 1);
        // Peeking does not consume.
        assert_eq!(consumer.next_pending(), Some(first));

        assert!(consumer.advance());
        assert_eq!(consumer.next_pending().map(|o| o.order.order_id), Some(2));
        assert!(consumer.advance());
        assert!(!consumer.advance());
        assert_eq!(consumer.cursor(), consumer.total());
    }

    #[test]
    fn test_submit_after_close_is_refused() {
        let (submitter, consumer) = order_sequencer();
        submitter.submit_order(order(1)).expect("open sequencer");
        submitter.close();
        submitter.close();

        assert!(matches!(
            submitter.submit_order(order(2)),
            Err(BacktestError::SequencerClosed)
        ));
        assert!(consumer.is_closed());
        assert_eq!(consumer.total(), 1);
    }

    #[test]
    fn test_wait_reports_draining_then_finished() {
        let (submitter, mut consumer) = order_sequencer();
        submitter.submit_order(order(1)).expect("open sequencer");
        assert_eq!(consumer.wait_for_work(), WaitOutcome::Ready { visible: 1 });

        submitter.close();
        assert_eq!(consumer.wait_for_work(), WaitOutcome::Draining { visible: 1 });
        consumer.advance();
        assert_eq!(consumer.wait_for_work(), WaitOutcome::Finished);
    }

    #[test]
    fn test_wait_blocks_until_submit() {
        let (submitter, consumer) = order_sequencer();
        let waiter = thread::spawn(move || consumer.wait_for_work());
        submitter.submit_order(order(9)).expect("open sequencer");
        assert_eq!(
            waiter.join().expect("waiter panicked"),
            WaitOutcome::Ready { visible: 1 }
        );
    }

    #[test]
    fn test_close_wakes_idle_consumer() {
        let (submitter, consumer) = order_sequencer();
        let waiter = thread::spawn(move || consumer.wait_for_work());
        submitter.close();
        assert_eq!(waiter.join().expect("waiter panicked"), WaitOutcome::Finished);
    }

    #[test]
    fn test_concurrent_producers_every_order_consumed_once() {
        let (submitter, mut consumer) = order_sequencer();
        let producers: Vec<_> = (0..4u64)
            .map(|worker| {
                let submitter = submitter.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        submitter
                            .submit_order(order(worker * 1_000 + i))
                            .expect("open sequencer");
                    }
                })
            })
            .collect();

        let consumer_thread = thread::spawn(move || {
            let mut seen = Vec::new();
            loop {
                match consumer.wait_for_work() {
                    WaitOutcome::Finished => break,
                    WaitOutcome::Ready { .. } | WaitOutcome::Draining { .. } => {
                        while let Some(next) = consumer.next_pending() {
                            seen.push(next.sequence);
                            consumer.advance();
                        }
                    }
                }
            }
            (seen, consumer.cursor(), consumer.total())
        });

        for producer in producers {
            producer.join().expect("producer panicked");
        }
        submitter.close();

        let (seen, cursor, total) = consumer_thread.join().expect("consumer panicked");
        assert_eq!(total, 400);
        assert_eq!(cursor, total);
        assert_eq!(seen, (0..400).collect::<Vec<u64>>());
    }
}
