//! Per-connection periodic emitter.
//!
//! Each session owns one background task that synthesizes an
//! [`OrderUpdate`] on a fixed cadence and queues it for the connection's
//! writer. The task is controlled exclusively through its
//! [`EmitterHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::stats::Counters;
use crate::domain::{ConnectionId, OrderUpdate};

/// Handle to a running emitter task.
///
/// Cancelling consumes the handle, so an emitter can only be cancelled
/// through the registry entry that owns it. Dropping a handle without
/// calling [`EmitterHandle::cancel`] still stops the task.
#[derive(Debug)]
pub struct EmitterHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl EmitterHandle {
    /// Spawns an emitter for `connection_id`.
    ///
    /// The first update is produced one `period` after this call, then
    /// every `period` until cancelled.
    pub(crate) fn spawn(
        connection_id: ConnectionId,
        period: Duration,
        sink: mpsc::Sender<OrderUpdate>,
        counters: Arc<Counters>,
    ) -> Self {
        let token = CancellationToken::new();
        let first_tick = Instant::now() + period;
        let task = tokio::spawn(run(
            connection_id,
            first_tick,
            period,
            sink,
            token.clone(),
            counters,
        ));
        Self { token, task }
    }

    /// Stops the emitter. No update is queued after this returns.
    pub fn cancel(self) {
        self.token.cancel();
        self.task.abort();
    }
}

impl Drop for EmitterHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    connection_id: ConnectionId,
    first_tick: Instant,
    period: Duration,
    sink: mpsc::Sender<OrderUpdate>,
    token: CancellationToken,
    counters: Arc<Counters>,
) {
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {
                if token.is_cancelled() {
                    break;
                }
                match sink.try_send(OrderUpdate::synthesize()) {
                    Ok(()) => Counters::bump(&counters.updates_emitted),
                    Err(TrySendError::Full(update)) => {
                        Counters::bump(&counters.updates_dropped);
                        tracing::warn!(
                            %connection_id,
                            order_id = update.order_id,
                            "connection queue full, dropping order update"
                        );
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        }
    }

    tracing::trace!(%connection_id, "emitter stopped");
}
