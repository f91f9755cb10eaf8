//! Connection registry: live sessions and their emitters.
//!
//! [`ConnectionRegistry`] maps each [`ConnectionId`] to the
//! [`EmitterHandle`] driving it. An id is present exactly while its emitter
//! is scheduled. Every removal path hands the handle back to the caller, so
//! whoever removes an entry is the one (and only one) who cancels it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::BroadcastError;
use super::emitter::EmitterHandle;
use crate::domain::ConnectionId;

/// Registry of active connections.
///
/// The lock is never held across an `.await`; every method is a short
/// synchronous critical section.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    emitters: HashMap<ConnectionId, EmitterHandle>,
    closed: bool,
}

impl ConnectionRegistry {
    /// Creates an empty, open registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `id` with the emitter produced by `start`.
    ///
    /// `start` runs under the registry lock and only when the insertion is
    /// going to succeed, so an emitter is never started for an id that
    /// cannot be tracked.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Closed`] once [`ConnectionRegistry::close`]
    /// has been called, or [`BroadcastError::DuplicateConnection`] if `id` is
    /// already registered (should never happen with UUID v4).
    pub fn insert_with<F>(&self, id: ConnectionId, start: F) -> Result<(), BroadcastError>
    where
        F: FnOnce() -> EmitterHandle,
    {
        let mut inner = self.lock();
        if inner.closed {
            return Err(BroadcastError::Closed);
        }
        if inner.emitters.contains_key(&id) {
            return Err(BroadcastError::DuplicateConnection(id));
        }
        inner.emitters.insert(id, start());
        Ok(())
    }

    /// Removes `id`, returning its emitter if it was still registered.
    pub fn remove(&self, id: ConnectionId) -> Option<EmitterHandle> {
        self.lock().emitters.remove(&id)
    }

    /// Closes the registry to new entries and takes every remaining one.
    ///
    /// Calling it again returns an empty list.
    pub fn close(&self) -> Vec<(ConnectionId, EmitterHandle)> {
        let mut inner = self.lock();
        inner.closed = true;
        inner.emitters.drain().collect()
    }

    /// Returns `true` if `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().emitters.contains_key(&id)
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().emitters.len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().emitters.is_empty()
    }

    /// Returns `true` once the registry refuses new entries.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    fn emitter() -> EmitterHandle {
        let (tx, _rx) = mpsc::channel(1);
        EmitterHandle::spawn(
            ConnectionId::new(),
            Duration::from_secs(5),
            tx,
            Arc::default(),
        )
    }

    #[tokio::test]
    async fn insert_and_remove() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();

        assert!(registry.insert_with(id, emitter).is_ok());
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        let Some(handle) = registry.remove(id) else {
            panic!("entry should be present");
        };
        handle.cancel();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn second_remove_returns_nothing() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let _ = registry.insert_with(id, emitter);

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_without_starting() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let _ = registry.insert_with(id, emitter);

        let result = registry.insert_with(id, || panic!("must not start"));
        assert!(matches!(result, Err(BroadcastError::DuplicateConnection(dup)) if dup == id));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn close_drains_and_refuses() {
        let registry = ConnectionRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let _ = registry.insert_with(a, emitter);
        let _ = registry.insert_with(b, emitter);

        let drained = registry.close();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert!(registry.is_closed());

        let result = registry.insert_with(ConnectionId::new(), || panic!("must not start"));
        assert!(matches!(result, Err(BroadcastError::Closed)));
        assert!(registry.close().is_empty());
        assert!(registry.remove(a).is_none());
    }
}
