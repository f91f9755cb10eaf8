//! Advertiser that keeps everything in memory.
//!
//! Useful for running the server where multicast is unavailable and for
//! asserting on the publish/withdraw sequence in tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{Advertisement, Advertiser, DiscoveryError, ServiceRecord};

/// Records publications and withdrawals instead of touching the network.
#[derive(Debug, Default)]
pub struct InMemoryAdvertiser {
    published: Mutex<Vec<String>>,
    withdrawals: AtomicUsize,
    fail_publish: AtomicBool,
}

impl InMemoryAdvertiser {
    /// Creates an advertiser whose calls always succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an advertiser whose `publish` always fails, as if the
    /// network stack were unavailable.
    #[must_use]
    pub fn failing() -> Self {
        let advertiser = Self::default();
        advertiser.fail_publish.store(true, Ordering::SeqCst);
        advertiser
    }

    /// Fully-qualified names of every publication so far.
    #[must_use]
    pub fn published(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of withdrawals performed.
    #[must_use]
    pub fn withdrawals(&self) -> usize {
        self.withdrawals.load(Ordering::SeqCst)
    }
}

impl Advertiser for InMemoryAdvertiser {
    fn publish(&self, record: &ServiceRecord) -> Result<Advertisement, DiscoveryError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(DiscoveryError::Daemon("network unavailable".to_string()));
        }
        record.validate()?;

        let fqdn = record.fullname();
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fqdn.clone());
        tracing::debug!(%fqdn, "in-memory service published");
        Ok(Advertisement::new(record.clone(), fqdn))
    }

    fn withdraw(&self, advertisement: Advertisement) -> Result<(), DiscoveryError> {
        self.withdrawals.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(fqdn = advertisement.fqdn(), "in-memory service withdrawn");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::discovery::Protocol;

    #[test]
    fn publish_then_withdraw() {
        let advertiser = InMemoryAdvertiser::new();
        let record = ServiceRecord::new("pos-server", "pos-server", 3000, Protocol::Tcp);

        let Ok(ad) = advertiser.publish(&record) else {
            panic!("publish should succeed");
        };
        assert!(ad.fqdn().ends_with("._pos-server._tcp.local."));
        assert_eq!(ad.record(), &record);
        assert_eq!(advertiser.published(), vec![ad.fqdn().to_string()]);

        assert!(advertiser.withdraw(ad).is_ok());
        assert_eq!(advertiser.withdrawals(), 1);
    }

    #[test]
    fn failing_advertiser_rejects_publish() {
        let advertiser = InMemoryAdvertiser::failing();
        let record = ServiceRecord::new("pos-server", "pos-server", 3000, Protocol::Tcp);
        assert!(matches!(
            advertiser.publish(&record),
            Err(DiscoveryError::Daemon(_))
        ));
        assert!(advertiser.published().is_empty());
    }

    #[test]
    fn invalid_record_is_rejected() {
        let advertiser = InMemoryAdvertiser::new();
        let record = ServiceRecord::new("", "pos-server", 3000, Protocol::Tcp);
        assert!(matches!(
            advertiser.publish(&record),
            Err(DiscoveryError::InvalidRecord(_))
        ));
    }
}
