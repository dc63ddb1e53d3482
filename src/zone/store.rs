//! The active zone.
//!
//! [`ZoneStore`] publishes exactly one [`Snapshot`] at a time. Readers take an `Arc` to the
//! active snapshot without locking; writers replace it wholesale. There is no way to change a
//! record in place, so a reader can never observe part of an update.

use crate::zone::Snapshot;
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, PoisonError};
use time::OffsetDateTime;
use tracing::{info, Span};

pub struct ZoneStore {
    active: ArcSwap<Snapshot>,
    // Serializes writers; holds the last generation handed out.
    writer: Mutex<u64>,
    span: Span,
}

impl ZoneStore {
    /// Create a store publishing `initial` as generation 1. Events are logged inside `span`.
    #[must_use]
    pub fn new(initial: Snapshot, span: Span) -> Self {
        let initial = initial.install(1, OffsetDateTime::now_utc());
        span.in_scope(|| info!(generation = 1, records = initial.len(), "zone installed"));
        ZoneStore {
            active: ArcSwap::from_pointee(initial),
            writer: Mutex::new(1),
            span,
        }
    }

    /// The active snapshot. Lock-free; the returned snapshot stays valid (and unchanged) for as
    /// long as the caller holds it, whatever replacements happen meanwhile.
    #[must_use]
    pub fn get(&self) -> Arc<Snapshot> {
        self.active.load_full()
    }

    /// Publish `snapshot` as the active zone and return it as published.
    ///
    /// Concurrent `replace` calls are applied one at a time, each getting the next generation.
    /// Readers are never blocked: they see the previous snapshot until the swap and the new one
    /// after it.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let mut generation = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        let next = Arc::new(snapshot.install(*generation, OffsetDateTime::now_utc()));
        let previous = self.active.swap(Arc::clone(&next));
        self.span.in_scope(|| {
            info!(
                generation = next.generation(),
                records = next.len(),
                previous_generation = previous.generation(),
                "zone replaced"
            );
        });
        next
    }
}

impl std::fmt::Debug for ZoneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.active.load();
        f.debug_struct("ZoneStore")
            .field("generation", &active.generation())
            .field("records", &active.len())
            .finish()
    }
}
