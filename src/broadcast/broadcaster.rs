//! Session broadcaster: connection lifecycle and emitter cleanup.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::BroadcastError;
use super::emitter::EmitterHandle;
use super::registry::ConnectionRegistry;
use super::stats::{BroadcastStats, Counters};
use crate::domain::{ConnectionId, OrderUpdate};

/// One accepted session: its id and the stream of updates meant for it.
#[derive(Debug)]
pub struct Session {
    /// Registry key of this session.
    pub id: ConnectionId,
    updates: mpsc::Receiver<OrderUpdate>,
    closing: CancellationToken,
}

impl Session {
    /// Next update for this session.
    ///
    /// Returns `None` once the broadcaster has shut down, discarding
    /// anything still queued, or once the emitter has stopped and the
    /// queue is empty.
    pub async fn next_update(&mut self) -> Option<OrderUpdate> {
        if self.closing.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.closing.cancelled() => None,
            update = self.updates.recv() => update,
        }
    }
}

/// Owns the connection registry and runs one emitter per session.
///
/// # Lifecycle
///
/// - [`connect`](Self::connect) registers a session and starts its emitter.
/// - [`disconnect`](Self::disconnect) cancels one emitter.
/// - [`shutdown`](Self::shutdown) cancels all remaining emitters and
///   refuses new sessions.
///
/// Whichever of `disconnect` and `shutdown` removes a registry entry
/// cancels its emitter; the other finds nothing to do. Each emitter is
/// therefore cancelled exactly once.
#[derive(Debug)]
pub struct SessionBroadcaster {
    registry: ConnectionRegistry,
    period: Duration,
    queue_capacity: usize,
    counters: Arc<Counters>,
    closing: CancellationToken,
}

impl SessionBroadcaster {
    /// Creates a broadcaster emitting every `period`, buffering up to
    /// `queue_capacity` undelivered updates per session.
    #[must_use]
    pub fn new(period: Duration, queue_capacity: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            period,
            queue_capacity: queue_capacity.max(1),
            counters: Arc::new(Counters::default()),
            closing: CancellationToken::new(),
        }
    }

    /// Accepts a new session.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Closed`] after [`shutdown`](Self::shutdown).
    pub fn connect(&self) -> Result<Session, BroadcastError> {
        let id = ConnectionId::new();
        let (tx, updates) = mpsc::channel(self.queue_capacity);
        let counters = Arc::clone(&self.counters);
        let period = self.period;

        self.registry
            .insert_with(id, move || EmitterHandle::spawn(id, period, tx, counters))?;
        Counters::bump(&self.counters.connections_accepted);

        tracing::info!(connection_id = %id, "client connected");
        Ok(Session {
            id,
            updates,
            closing: self.closing.clone(),
        })
    }

    /// Ends the session `id`.
    ///
    /// Returns `true` if this call cancelled the emitter, `false` if the
    /// session was unknown or already cleaned up by shutdown.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let Some(emitter) = self.registry.remove(id) else {
            tracing::debug!(connection_id = %id, "disconnect for inactive session");
            return false;
        };
        emitter.cancel();
        Counters::bump(&self.counters.cancelled_on_disconnect);

        tracing::info!(connection_id = %id, "client disconnected");
        true
    }

    /// Cancels every active emitter and closes the registry.
    ///
    /// Open sessions stop yielding updates immediately, including ones
    /// already queued. Returns the number of emitters cancelled. Later
    /// calls return 0.
    pub fn shutdown(&self) -> usize {
        self.closing.cancel();
        let drained = self.registry.close();
        let cancelled = drained.len();
        for (id, emitter) in drained {
            emitter.cancel();
            tracing::debug!(connection_id = %id, "emitter cancelled by shutdown");
        }
        Counters::add(&self.counters.cancelled_on_shutdown, cancelled as u64);

        tracing::info!(cancelled, "session broadcaster shut down");
        cancelled
    }

    /// Fails once [`shutdown`](Self::shutdown) has been called.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Closed`] after shutdown.
    pub fn ensure_accepting(&self) -> Result<(), BroadcastError> {
        if self.registry.is_closed() {
            return Err(BroadcastError::Closed);
        }
        Ok(())
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        !self.registry.is_closed()
    }

    /// Returns `true` if the session `id` is still registered.
    #[must_use]
    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.registry.contains(id)
    }

    /// Number of currently registered sessions.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.registry.len()
    }

    /// Emission interval.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Snapshot of the lifetime counters.
    #[must_use]
    pub fn stats(&self) -> BroadcastStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tokio::time;

    const PERIOD: Duration = Duration::from_secs(5);

    fn broadcaster() -> SessionBroadcaster {
        SessionBroadcaster::new(PERIOD, 16)
    }

    fn drain(rx: &mut mpsc::Receiver<OrderUpdate>) -> Vec<OrderUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    fn connect(b: &SessionBroadcaster) -> Session {
        let Ok(session) = b.connect() else {
            panic!("broadcaster should accept");
        };
        session
    }

    #[tokio::test(start_paused = true)]
    async fn one_client_twelve_seconds_gets_two_updates() {
        let b = broadcaster();
        let mut session = connect(&b);

        time::sleep(Duration::from_secs(12)).await;
        let updates = drain(&mut session.updates);
        assert_eq!(updates.len(), 2);
        for update in &updates {
            assert!(update.order_id < 1000);
            assert_eq!(update.status, "preparing");
        }

        assert!(b.disconnect(session.id));
        time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut session.updates).is_empty());
        assert!(session.updates.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnecting_one_client_leaves_the_other_running() {
        let b = broadcaster();
        let mut first = connect(&b);
        let mut second = connect(&b);

        time::sleep(Duration::from_secs(11)).await;
        assert_eq!(drain(&mut first.updates).len(), 2);
        assert_eq!(drain(&mut second.updates).len(), 2);

        assert!(b.disconnect(first.id));
        time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut first.updates).is_empty());
        assert_eq!(drain(&mut second.updates).len(), 2);
        assert!(b.is_active(second.id));
        assert_eq!(b.active_connections(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn staggered_sessions_get_floor_of_duration_over_period() {
        let b = broadcaster();
        let start = time::Instant::now();
        // (connect offset, lifetime) in seconds
        let plan: [(u64, u64); 5] = [(0, 3), (1, 27), (2, 10), (4, 16), (7, 5)];

        let mut sessions = Vec::new();
        for (offset, lifetime) in plan {
            time::sleep_until(start + Duration::from_secs(offset)).await;
            sessions.push((offset + lifetime, lifetime, connect(&b)));
        }

        // Disconnect in order of end time, which differs from connect order.
        // The half second keeps disconnects off tick boundaries.
        sessions.sort_by_key(|(end, _, _)| *end);
        for (end, lifetime, mut session) in sessions {
            time::sleep_until(start + Duration::from_millis(end * 1000 + 500)).await;
            assert!(b.disconnect(session.id));
            let received = drain(&mut session.updates).len() as u64;
            assert_eq!(received, lifetime / 5, "lifetime {lifetime}s");
        }

        assert_eq!(b.active_connections(), 0);
        let stats = b.stats();
        assert_eq!(stats.connections_accepted, 5);
        assert_eq!(stats.cancelled_on_disconnect, 5);
        assert_eq!(stats.cancelled_on_shutdown, 0);
        assert_eq!(stats.updates_emitted, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_every_active_session_once() {
        for k in [0_usize, 1, 3, 8] {
            let b = broadcaster();
            let mut sessions: Vec<Session> = (0..k).map(|_| connect(&b)).collect();

            time::sleep(Duration::from_secs(6)).await;
            assert_eq!(b.shutdown(), k);
            assert_eq!(b.active_connections(), 0);
            assert!(!b.is_accepting());

            for session in &mut sessions {
                assert!(session.next_update().await.is_none());
                assert!(!b.disconnect(session.id));
            }

            let stats = b.stats();
            assert_eq!(stats.cancelled_on_shutdown, k as u64);
            assert_eq!(stats.cancelled_on_disconnect, 0);
            assert_eq!(stats.cancellations(), k as u64);
            assert_eq!(b.shutdown(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_queued_updates() {
        let b = broadcaster();
        let mut session = connect(&b);

        // Nobody reads, so three updates pile up.
        time::sleep(Duration::from_secs(16)).await;
        assert_eq!(b.stats().updates_emitted, 3);

        assert_eq!(b.shutdown(), 1);
        assert!(session.next_update().await.is_none());
        assert!(session.next_update().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn next_update_yields_queued_updates_while_running() {
        let b = broadcaster();
        let mut session = connect(&b);

        time::sleep(Duration::from_secs(11)).await;
        assert!(session.next_update().await.is_some());
        assert!(session.next_update().await.is_some());

        assert!(b.disconnect(session.id));
        assert!(session.next_update().await.is_none());
    }

    #[tokio::test]
    async fn connect_after_shutdown_is_refused() {
        let b = broadcaster();
        assert!(b.ensure_accepting().is_ok());
        b.shutdown();
        assert!(matches!(b.connect(), Err(BroadcastError::Closed)));
        assert_eq!(b.ensure_accepting(), Err(BroadcastError::Closed));
        assert_eq!(b.stats().connections_accepted, 0);
    }

    #[tokio::test]
    async fn disconnect_unknown_session_is_a_no_op() {
        let b = broadcaster();
        assert!(!b.disconnect(ConnectionId::new()));
        assert_eq!(b.stats().cancellations(), 0);
    }
}
