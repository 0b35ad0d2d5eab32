//! Per-instrument liquidity and market-data history.
//!
//! Each instrument owns one slot. The liquidity cell is written only by the
//! matching loop; the history buffers are appended by the ingestion loop and
//! cleared by the matching loop, so each slot guards its history with its own
//! mutex. Unrelated instruments never contend on a shared lock.

use crate::backtest::types::{FeedMode, InstrumentId, InstrumentLiquidity, QuoteUpdate, TradePrint};
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Quote and print history accumulated for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstrumentHistory {
    /// Quote updates in feed order
    pub quotes: Vec<QuoteUpdate>,
    /// Trade prints in feed order
    pub prints: Vec<TradePrint>,
}

impl InstrumentHistory {
    /// Returns `true` if the buffer for `mode` holds nothing.
    #[must_use]
    pub fn is_empty_for(&self, mode: FeedMode) -> bool {
        match mode {
            FeedMode::Quotes => self.quotes.is_empty(),
            FeedMode::Prints => self.prints.is_empty(),
        }
    }

    /// Discards both buffers.
    pub fn clear(&mut self) {
        self.quotes.clear();
        self.prints.clear();
    }
}

#[derive(Debug, Default)]
struct InstrumentSlot {
    liquidity: AtomicCell<InstrumentLiquidity>,
    /// Carry direction recorded the first time the instrument filled
    carry_entry: AtomicCell<Option<bool>>,
    history: Mutex<InstrumentHistory>,
}

impl InstrumentSlot {
    // Appends and clears never leave the buffers half-written, so a poisoned
    // history is still usable.
    fn history(&self) -> MutexGuard<'_, InstrumentHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point-in-time view of one instrument, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstrumentSnapshot {
    /// Instrument handle
    pub instrument: InstrumentId,
    /// Current liquidity carry
    pub liquidity: InstrumentLiquidity,
    /// Carry direction recorded at the first fill, if any
    pub carry_entry: Option<bool>,
    /// Buffered quote updates
    pub quotes: usize,
    /// Buffered trade prints
    pub prints: usize,
}

/// Liquidity model for every instrument in a run.
#[derive(Debug)]
pub struct MarketState {
    slots: DashMap<InstrumentId, Arc<InstrumentSlot>>,
}

impl MarketState {
    /// Creates a state table with empty slots for ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        let slots = DashMap::with_capacity(capacity);
        let seeded = u32::try_from(capacity).unwrap_or(u32::MAX);
        for raw in 0..seeded {
            slots.insert(InstrumentId::new(raw), Arc::new(InstrumentSlot::default()));
        }
        Self { slots }
    }

    /// Returns the slot for `id`, creating it on first use.
    ///
    /// The map shard lock is released before the caller touches the slot.
    fn slot(&self, id: InstrumentId) -> Arc<InstrumentSlot> {
        if let Some(slot) = self.slots.get(&id) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(id).or_default().value())
    }

    fn existing_slot(&self, id: InstrumentId) -> Option<Arc<InstrumentSlot>> {
        self.slots.get(&id).map(|slot| Arc::clone(slot.value()))
    }

    /// Current liquidity carry for `id`; flat for an unseen instrument.
    #[must_use]
    pub fn liquidity(&self, id: InstrumentId) -> InstrumentLiquidity {
        self.existing_slot(id)
            .map(|slot| slot.liquidity.load())
            .unwrap_or_default()
    }

    /// Overwrites the liquidity carry for `id`. Reserved for the matching loop.
    pub(crate) fn store_liquidity(&self, id: InstrumentId, liquidity: InstrumentLiquidity) {
        self.slot(id).liquidity.store(liquidity);
    }

    /// Sets an initial liquidity carry for `id`.
    ///
    /// Intended for setting up a run before it starts; once the matching
    /// loop is running it is the only writer of liquidity.
    pub fn seed_liquidity(&self, id: InstrumentId, quantity: i64, carry_is_sell: bool) {
        debug!(instrument = %id, quantity, carry_is_sell, "seeding liquidity");
        self.store_liquidity(id, InstrumentLiquidity::new(quantity, carry_is_sell));
    }

    /// Appends a quote update to its instrument's history.
    pub fn append_quote(&self, quote: QuoteUpdate) {
        self.slot(quote.instrument).history().quotes.push(quote);
    }

    /// Appends a trade print to its instrument's history.
    pub fn append_print(&self, print: TradePrint) {
        self.slot(print.instrument).history().prints.push(print);
    }

    /// Number of buffered quote updates for `id`.
    #[must_use]
    pub fn quote_count(&self, id: InstrumentId) -> usize {
        self.existing_slot(id)
            .map_or(0, |slot| slot.history().quotes.len())
    }

    /// Number of buffered trade prints for `id`.
    #[must_use]
    pub fn print_count(&self, id: InstrumentId) -> usize {
        self.existing_slot(id)
            .map_or(0, |slot| slot.history().prints.len())
    }

    /// A copy of the buffered history for `id`.
    #[must_use]
    pub fn history(&self, id: InstrumentId) -> InstrumentHistory {
        self.existing_slot(id)
            .map(|slot| slot.history().clone())
            .unwrap_or_default()
    }

    /// Returns `true` if `id` has buffered history for `mode`.
    pub(crate) fn has_history(&self, id: InstrumentId, mode: FeedMode) -> bool {
        self.existing_slot(id)
            .is_some_and(|slot| !slot.history().is_empty_for(mode))
    }

    /// Removes and returns the quote history for `id`, leaving it empty.
    pub(crate) fn take_quotes(&self, id: InstrumentId) -> Vec<QuoteUpdate> {
        self.existing_slot(id)
            .map(|slot| std::mem::take(&mut slot.history().quotes))
            .unwrap_or_default()
    }

    /// Carry direction recorded at the first fill for `id`.
    #[must_use]
    pub fn carry_entry(&self, id: InstrumentId) -> Option<bool> {
        self.existing_slot(id).and_then(|slot| slot.carry_entry.load())
    }

    /// Persists the instrument's entry after a fill.
    ///
    /// The first call for an instrument records its initial carry direction.
    /// Later calls with `carry_is_sell == false` mean the surplus has been
    /// worked off, so the accumulated quote and print history is discarded.
    ///
    /// Returns the number of history entries discarded.
    pub fn update_state(&self, id: InstrumentId, carry_is_sell: bool) -> usize {
        let slot = self.slot(id);
        if slot.carry_entry.load().is_none() {
            slot.carry_entry.store(Some(carry_is_sell));
            trace!(instrument = %id, carry_is_sell, "recorded initial carry direction");
            return 0;
        }
        if carry_is_sell {
            return 0;
        }
        let mut history = slot.history();
        let discarded = history.quotes.len() + history.prints.len();
        history.clear();
        trace!(instrument = %id, discarded, "surplus worked off, history cleared");
        discarded
    }

    /// Snapshot of every instrument slot, sorted by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<InstrumentSnapshot> {
        let slots: Vec<(InstrumentId, Arc<InstrumentSlot>)> = self
            .slots
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut snapshot: Vec<InstrumentSnapshot> = slots
            .into_iter()
            .map(|(instrument, slot)| {
                let history = slot.history();
                InstrumentSnapshot {
                    instrument,
                    liquidity: slot.liquidity.load(),
                    carry_entry: slot.carry_entry.load(),
                    quotes: history.quotes.len(),
                    prints: history.prints.len(),
                }
            })
            .collect();
        snapshot.sort_unstable_by_key(|entry| entry.instrument);
        snapshot
    }
}
