use backtest_core::backtest::sequencer::{WaitOutcome, order_sequencer};
use backtest_core::{BacktestError, InstrumentId, Side};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Submit(i64),
    Advance,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(1i64..100).prop_map(Op::Submit), Just(Op::Advance)]
}

proptest! {
    #[test]
    fn prop_cursor_is_monotone_and_bounded(ops in proptest::collection::vec(op(), 0..200)) {
        let (submitter, mut consumer) = order_sequencer();
        let mut expected_sequence = 0u64;
        let mut last_cursor = 0u64;

        for op in ops {
            match op {
                Op::Submit(size) => {
                    let sequence = submitter
                        .submit(InstrumentId::new(1), 100, size, expected_sequence, Side::Buy)
                        .expect("open sequencer");
                    prop_assert_eq!(sequence, expected_sequence);
                    expected_sequence += 1;
                }
                Op::Advance => {
                    let had_pending = consumer.next_pending().is_some();
                    prop_assert_eq!(consumer.advance(), had_pending);
                }
            }
            let cursor = consumer.cursor();
            prop_assert!(cursor >= last_cursor);
            prop_assert!(cursor <= consumer.total());
            last_cursor = cursor;
        }

        while consumer.advance() {}
        prop_assert_eq!(consumer.cursor(), consumer.total());
        prop_assert_eq!(submitter.pending(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_sequence_number_is_delivered_once() {
        let (submitter, mut consumer) = order_sequencer();
        for order_id in 0..10 {
            submitter
                .submit(InstrumentId::new(2), 50, 1, order_id, Side::Sell)
                .expect("open sequencer");
        }
        submitter.close();

        let mut delivered = Vec::new();
        while let WaitOutcome::Ready { .. } | WaitOutcome::Draining { .. } =
            consumer.wait_for_work()
        {
            while let Some(next) = consumer.next_pending() {
                delivered.push((next.sequence, next.order.order_id));
                consumer.advance();
            }
        }

        assert_eq!(delivered, (0..10).map(|i| (i, i)).collect::<Vec<_>>());
        assert_eq!(consumer.cursor(), consumer.total());
    }

    #[test]
    fn test_closed_sequencer_refuses_orders() {
        let (submitter, _consumer) = order_sequencer();
        submitter.close();
        assert!(matches!(
            submitter.submit(InstrumentId::new(0), 1, 1, 1, Side::Buy),
            Err(BacktestError::SequencerClosed)
        ));
        assert_eq!(submitter.total(), 0);
    }
}
