//! Session broadcasting: per-connection emitters and their registry.
//!
//! Every WebSocket session gets its own emitter task that produces a
//! synthetic [`crate::domain::OrderUpdate`] on a fixed cadence. The
//! [`SessionBroadcaster`] owns the [`ConnectionRegistry`] that tracks those
//! emitters and guarantees each one is cancelled exactly once, either when
//! its client disconnects or when the process shuts down.

pub mod broadcaster;
pub mod emitter;
pub mod registry;
pub mod stats;

pub use broadcaster::{Session, SessionBroadcaster};
pub use emitter::EmitterHandle;
pub use registry::ConnectionRegistry;
pub use stats::BroadcastStats;

use crate::domain::ConnectionId;

/// Errors raised by the broadcaster and its registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    /// The broadcaster has been shut down and accepts no new sessions.
    #[error("session broadcaster is shut down")]
    Closed,

    /// A session with this id is already registered.
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}
