//! Service advertisement record and DNS-SD naming.

use std::fmt;
use std::str::FromStr;

use super::DiscoveryError;

/// Domain every mDNS name lives under.
pub const LOCAL_DOMAIN: &str = "local.";

/// Longest DNS label, in bytes.
const MAX_LABEL_LEN: usize = 63;

/// Longest DNS-SD service type (without the leading underscore).
const MAX_SERVICE_TYPE_LEN: usize = 15;

/// Transport protocol part of a DNS-SD service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// `_tcp`
    #[default]
    Tcp,
    /// `_udp`
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(DiscoveryError::InvalidRecord(format!(
                "unknown protocol: {other}"
            ))),
        }
    }
}

/// What gets advertised: instance name, service type, port and transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Instance name, e.g. `pos-server`.
    pub name: String,
    /// Bare service type without underscore or protocol, e.g. `pos-server`.
    pub service_type: String,
    /// Port the service listens on.
    pub port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl ServiceRecord {
    /// Creates a record.
    pub fn new(
        name: impl Into<String>,
        service_type: impl Into<String>,
        port: u16,
        protocol: Protocol,
    ) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
            port,
            protocol,
        }
    }

    /// Service type with protocol and domain: `_pos-server._tcp.local.`.
    #[must_use]
    pub fn service_domain(&self) -> String {
        format!("_{}._{}.{LOCAL_DOMAIN}", self.service_type, self.protocol)
    }

    /// Fully-qualified instance name: `pos-server._pos-server._tcp.local.`.
    #[must_use]
    pub fn fullname(&self) -> String {
        format!("{}.{}", self.name, self.service_domain())
    }

    /// Checks the record against DNS-SD naming rules.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidRecord`] if the instance name is
    /// empty or longer than a DNS label, or if the service type is not
    /// 1–15 ASCII letters, digits and inner hyphens, or the port is 0.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.name.is_empty() || self.name.len() > MAX_LABEL_LEN {
            return Err(DiscoveryError::InvalidRecord(format!(
                "instance name must be 1-{MAX_LABEL_LEN} bytes: {:?}",
                self.name
            )));
        }

        let ty = self.service_type.as_str();
        let well_formed = !ty.is_empty()
            && ty.len() <= MAX_SERVICE_TYPE_LEN
            && ty.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !ty.starts_with('-')
            && !ty.ends_with('-')
            && ty.chars().any(|c| c.is_ascii_alphabetic());
        if !well_formed {
            return Err(DiscoveryError::InvalidRecord(format!(
                "invalid service type: {ty:?}"
            )));
        }

        if self.port == 0 {
            return Err(DiscoveryError::InvalidRecord(
                "port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A published record together with the name it resolved to.
///
/// Obtained from [`super::Advertiser::publish`] and consumed by
/// [`super::Advertiser::withdraw`].
#[derive(Debug, PartialEq, Eq)]
pub struct Advertisement {
    record: ServiceRecord,
    fqdn: String,
}

impl Advertisement {
    pub(crate) fn new(record: ServiceRecord, fqdn: String) -> Self {
        Self { record, fqdn }
    }

    /// Fully-qualified name the service is reachable under.
    #[must_use]
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// The record that was published.
    #[must_use]
    pub const fn record(&self) -> &ServiceRecord {
        &self.record
    }
}
