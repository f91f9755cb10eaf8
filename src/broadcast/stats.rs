//! Lifetime counters of the session broadcaster.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use utoipa::ToSchema;

/// Shared atomic counters, updated by the broadcaster and by every emitter.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) connections_accepted: AtomicU64,
    pub(crate) cancelled_on_disconnect: AtomicU64,
    pub(crate) cancelled_on_shutdown: AtomicU64,
    pub(crate) updates_emitted: AtomicU64,
    pub(crate) updates_dropped: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BroadcastStats {
        BroadcastStats {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            cancelled_on_disconnect: self.cancelled_on_disconnect.load(Ordering::Relaxed),
            cancelled_on_shutdown: self.cancelled_on_shutdown.load(Ordering::Relaxed),
            updates_emitted: self.updates_emitted.load(Ordering::Relaxed),
            updates_dropped: self.updates_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the broadcaster counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BroadcastStats {
    /// Sessions ever registered.
    pub connections_accepted: u64,
    /// Emitters cancelled because their client went away.
    pub cancelled_on_disconnect: u64,
    /// Emitters cancelled by the process-wide shutdown.
    pub cancelled_on_shutdown: u64,
    /// Updates handed to a connection.
    pub updates_emitted: u64,
    /// Updates discarded because a connection's queue was full.
    pub updates_dropped: u64,
}

impl BroadcastStats {
    /// Total emitter cancellations, whatever triggered them.
    #[must_use]
    pub const fn cancellations(&self) -> u64 {
        self.cancelled_on_disconnect + self.cancelled_on_shutdown
    }
}
