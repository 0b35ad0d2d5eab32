//! The set of instrument handles known to a run.

use crate::backtest::types::InstrumentId;
use dashmap::DashSet;
use tracing::{debug, trace};

/// Concurrent set of known instrument ids.
///
/// The directory is pre-seeded with `0..capacity` so that lookups for
/// in-range instruments succeed before any market data has arrived, and it
/// grows whenever the feed names an instrument outside that range.
#[derive(Debug)]
pub struct InstrumentDirectory {
    known: DashSet<InstrumentId>,
    capacity: usize,
}

impl InstrumentDirectory {
    /// Creates a directory pre-seeded with ids `0..capacity`.
    ///
    /// Capacities beyond the `u32` handle range are clamped to it.
    pub fn new(capacity: usize) -> Self {
        let known = DashSet::with_capacity(capacity);
        let seeded = u32::try_from(capacity).unwrap_or(u32::MAX);
        for raw in 0..seeded {
            known.insert(InstrumentId::new(raw));
        }
        debug!(capacity, "instrument directory seeded");
        Self { known, capacity }
    }

    /// Inserts `id`. Idempotent; returns `true` if the id was not known yet.
    pub fn register(&self, id: InstrumentId) -> bool {
        let inserted = self.known.insert(id);
        if inserted {
            trace!(instrument = %id, "registered new instrument");
        }
        inserted
    }

    /// Returns `true` if `id` is known.
    #[must_use]
    pub fn contains(&self, id: InstrumentId) -> bool {
        self.known.contains(&id)
    }

    /// Number of known instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns `true` if no instrument is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// The pre-seeded capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A sorted snapshot of every known id.
    #[must_use]
    pub fn ids(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self.known.iter().map(|id| *id).collect();
        ids.sort_unstable();
        ids
    }
}
