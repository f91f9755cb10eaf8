//! Local service discovery: publishing and withdrawing the mDNS record.
//!
//! [`Advertiser`] is the seam between the server lifecycle and the
//! discovery backend. [`MdnsAdvertiser`] talks to the network through
//! `mdns-sd`; [`InMemoryAdvertiser`] records calls and is used to drive the
//! lifecycle without touching the network.

pub mod mdns;
pub mod memory;
pub mod record;

pub use mdns::MdnsAdvertiser;
pub use memory::InMemoryAdvertiser;
pub use record::{Advertisement, Protocol, ServiceRecord};

/// Errors raised while publishing or withdrawing an advertisement.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The discovery daemon could not be started or refused a request.
    #[error("mdns daemon error: {0}")]
    Daemon(String),

    /// The record breaks DNS-SD naming rules.
    #[error("invalid service record: {0}")]
    InvalidRecord(String),

    /// The daemon did not confirm a request in time.
    #[error("mdns daemon did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Publishes a service record and later withdraws it.
///
/// `withdraw` takes the [`Advertisement`] by value: a publication can be
/// withdrawn at most once.
pub trait Advertiser: Send + Sync + std::fmt::Debug {
    /// Announces `record` on the local network.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] if the record is invalid or the
    /// backend rejects it. Callers treat this as fatal.
    fn publish(&self, record: &ServiceRecord) -> Result<Advertisement, DiscoveryError>;

    /// Stops announcing `advertisement` and releases the backend.
    ///
    /// Waits a bounded amount of time for the backend to confirm.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] if the backend fails or times out.
    fn withdraw(&self, advertisement: Advertisement) -> Result<(), DiscoveryError>;
}
