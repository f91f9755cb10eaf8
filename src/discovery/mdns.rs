//! `mdns-sd` backed advertiser.

use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceInfo};

use super::{Advertisement, Advertiser, DiscoveryError, ServiceRecord};

/// Default bound on waiting for the daemon during withdrawal.
pub const DEFAULT_WITHDRAW_TIMEOUT: Duration = Duration::from_secs(1);

/// Advertises records through a multicast DNS responder running on
/// `mdns-sd`'s own thread.
pub struct MdnsAdvertiser {
    daemon: ServiceDaemon,
    host: String,
    withdraw_timeout: Duration,
}

impl std::fmt::Debug for MdnsAdvertiser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdnsAdvertiser")
            .field("host", &self.host)
            .field("withdraw_timeout", &self.withdraw_timeout)
            .finish_non_exhaustive()
    }
}

impl MdnsAdvertiser {
    /// Starts the mDNS daemon. The machine hostname is used as the target
    /// host of published records.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Daemon`] if the daemon cannot bind its
    /// multicast sockets.
    pub fn new(withdraw_timeout: Duration) -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::Daemon(e.to_string()))?;

        let hostname = match hostname::get() {
            Ok(h) => h.to_string_lossy().into_owned(),
            Err(e) => {
                tracing::warn!(error = %e, "could not determine hostname, using localhost");
                "localhost".to_string()
            }
        };

        Ok(Self {
            daemon,
            host: format!("{hostname}.{}", super::record::LOCAL_DOMAIN),
            withdraw_timeout,
        })
    }
}

impl Advertiser for MdnsAdvertiser {
    fn publish(&self, record: &ServiceRecord) -> Result<Advertisement, DiscoveryError> {
        record.validate()?;

        let info = service_info(record, &self.host)?;
        let fqdn = info.get_fullname().to_string();
        self.daemon
            .register(info)
            .map_err(|e| DiscoveryError::Daemon(e.to_string()))?;

        tracing::info!(%fqdn, host = %self.host, port = record.port, "mdns service published");
        Ok(Advertisement::new(record.clone(), fqdn))
    }

    fn withdraw(&self, advertisement: Advertisement) -> Result<(), DiscoveryError> {
        let fqdn = advertisement.fqdn();

        withdraw_then_stop(
            || {
                let unregistered = self
                    .daemon
                    .unregister(fqdn)
                    .map_err(|e| DiscoveryError::Daemon(e.to_string()))?;
                match unregistered.recv_timeout(self.withdraw_timeout) {
                    Ok(status) => tracing::info!(%fqdn, ?status, "mdns service withdrawn"),
                    Err(_) => tracing::warn!(%fqdn, "mdns unregister not confirmed in time"),
                }
                Ok(())
            },
            || {
                let stopped = self
                    .daemon
                    .shutdown()
                    .map_err(|e| DiscoveryError::Daemon(e.to_string()))?;
                stopped
                    .recv_timeout(self.withdraw_timeout)
                    .map_err(|_| DiscoveryError::Timeout(self.withdraw_timeout))?;
                tracing::debug!("mdns daemon stopped");
                Ok(())
            },
        )
    }
}

/// Builds the `mdns-sd` record for `record`, targeting `host`.
fn service_info(record: &ServiceRecord, host: &str) -> Result<ServiceInfo, DiscoveryError> {
    let properties = [("version", env!("CARGO_PKG_VERSION"))];
    let info = ServiceInfo::new(
        &record.service_domain(),
        &record.name,
        host,
        "",
        record.port,
        &properties[..],
    )
    .map_err(|e| DiscoveryError::InvalidRecord(e.to_string()))?;
    Ok(info.enable_addr_auto())
}

/// Runs `unregister`, then `stop` whatever the outcome, and reports the
/// first failure. The daemon thread must not outlive a failed unregister.
fn withdraw_then_stop<U, S>(unregister: U, stop: S) -> Result<(), DiscoveryError>
where
    U: FnOnce() -> Result<(), DiscoveryError>,
    S: FnOnce() -> Result<(), DiscoveryError>,
{
    let unregistered = unregister();
    if let Err(e) = &unregistered {
        tracing::warn!(error = %e, "mdns unregister failed, stopping daemon anyway");
    }
    let stopped = stop();
    unregistered.and(stopped)
}
