//! Exception lists: callers trusted by network address alone.
//!
//! Three sources feed the decision:
//!
//! - **Exact addresses** from `ipList` (`10.0.0.1`)
//! - **Subnet ranges** from `ipList` (`192.168.1.0/24`)
//! - **Hostnames** from `hostList`, resolved on a throttled schedule
//!
//! # Check Order
//!
//! ```text
//! remote addr ──► refresh hosts (if due) ──► parse host:port
//!                                               │ fail ──► not trusted
//!                                               ▼
//!                        exact ──► host snapshot ──► ranges
//! ```
//!
//! Equality checks run before containment checks; the order only affects how
//! soon the check short-circuits, never the result.

pub mod address;
pub mod hosts;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ExceptionsConfig;
use crate::duration::parse_or_disabled;

pub use address::{AddressList, Ipv4Range, ParsedAddressList, RejectReason, RejectedEntry};
pub use hosts::{
    HostCache, HostResolver, HostSnapshot, RefreshOutcome, SkipReason, SystemResolver,
};

#[cfg(test)]
pub(crate) use hosts::StaticResolver;

/// Why a remote address could not be turned into an IPv4 address.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAddrError {
    #[error("missing port")]
    MissingPort,
    #[error("too many colons")]
    TooManyColons,
    #[error("no IP found")]
    NotAnAddress,
    #[error("not an IPv4 address")]
    NotIpv4,
}

/// Extract the IPv4 host from a `host:port` or `[host]:port` address.
///
/// The port itself is not validated. IPv4-mapped IPv6 hosts are normalized.
pub fn parse_remote_addr(addr: &str) -> Result<Ipv4Addr, RemoteAddrError> {
    let host = if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or(RemoteAddrError::MissingPort)?;
        let port = after.strip_prefix(':').ok_or(RemoteAddrError::MissingPort)?;
        if port.contains(':') {
            return Err(RemoteAddrError::TooManyColons);
        }
        host
    } else {
        let (host, _port) = addr.rsplit_once(':').ok_or(RemoteAddrError::MissingPort)?;
        if host.contains(':') {
            return Err(RemoteAddrError::TooManyColons);
        }
        host
    };

    let ip: IpAddr = host.parse().map_err(|_| RemoteAddrError::NotAnAddress)?;
    address::to_ipv4(ip).ok_or(RemoteAddrError::NotIpv4)
}

/// Decides whether a caller is trusted by its network address.
#[derive(Debug)]
pub struct ExceptionChecker {
    addresses: AddressList,
    hosts: HostCache,
}

impl ExceptionChecker {
    /// Build a checker from configuration.
    ///
    /// Unusable `ipList` entries are logged and skipped. An empty or invalid
    /// `hostUpdateInterval` disables hostname resolution entirely.
    pub fn new(config: &ExceptionsConfig, resolver: Arc<dyn HostResolver>) -> Self {
        let parsed = address::parse_address_list(&config.ip_list);
        for rejected in &parsed.rejected {
            warn!(
                entry = %rejected.entry,
                reason = %rejected.reason,
                "Parsing IP or CIDR failed, entry skipped"
            );
        }

        let interval = parse_or_disabled("hostUpdateInterval", &config.host_update_interval);
        if !config.host_list.is_empty() && interval.is_zero() {
            warn!(
                hosts = config.host_list.len(),
                "Host exceptions configured but host updates are disabled"
            );
        }

        debug!(
            exact = parsed.list.exact().len(),
            ranges = parsed.list.ranges().len(),
            hosts = config.host_list.len(),
            interval_secs = interval.as_secs_f64(),
            "Exception lists loaded"
        );

        Self::from_parts(
            parsed.list,
            HostCache::new(config.host_list.clone(), interval, resolver),
        )
    }

    pub fn from_parts(addresses: AddressList, hosts: HostCache) -> Self {
        Self { addresses, hosts }
    }

    pub fn addresses(&self) -> &AddressList {
        &self.addresses
    }

    pub fn hosts(&self) -> &HostCache {
        &self.hosts
    }

    /// Run the initial host resolution, if refreshing is enabled.
    pub async fn prime(&self) -> RefreshOutcome {
        self.hosts.maybe_refresh(Instant::now()).await
    }

    /// Check whether `remote_addr` (`host:port`) is on an exception list.
    ///
    /// Refreshes the host snapshot first when due. Fails closed: an address
    /// that cannot be parsed is never trusted.
    pub async fn is_trusted_remote_addr(&self, remote_addr: &str) -> bool {
        self.hosts.maybe_refresh(Instant::now()).await;

        let ip = match parse_remote_addr(remote_addr) {
            Ok(ip) => ip,
            Err(e) => {
                debug!(remote_addr, error = %e, "Splitting remote address failed");
                return false;
            }
        };

        self.addresses.matches_exact(ip)
            || self.hosts.snapshot().await.contains(ip)
            || self.addresses.matches_range(ip)
    }
}
