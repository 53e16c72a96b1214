//! Hostname exceptions, re-resolved lazily on a throttled schedule.
//!
//! # Refresh Model
//!
//! There is no background timer. Every trust check calls
//! [`HostCache::maybe_refresh`], which is a cheap no-op unless the refresh
//! interval has elapsed. When a refresh is due, one caller resolves every
//! hostname and swaps in a brand-new [`HostSnapshot`]; concurrent callers that
//! find the refresh lock taken keep using the previous snapshot instead of
//! waiting on DNS.
//!
//! ```text
//!  trust check ──► maybe_refresh(now)
//!                    │ no hosts / interval 0 / not due ──► Skipped
//!                    │ lock busy ───────────────────────► Skipped(InProgress)
//!                    ▼
//!                  resolve all hosts ──► new Arc<HostSnapshot> ──► swap
//! ```
//!
//! # Failure Policy
//!
//! A hostname that fails to resolve (or has no IPv4 address) contributes
//! nothing to the new snapshot. Its previous address is NOT carried over.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};

use super::address::to_ipv4;
use crate::metrics;

/// Boxed future returned by [`HostResolver::lookup`].
pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<IpAddr>>> + Send + 'a>>;

/// Name resolution used by the host cache.
pub trait HostResolver: Send + Sync {
    /// Resolve `host` to all of its addresses.
    fn lookup<'a>(&'a self, host: &'a str) -> LookupFuture<'a>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn lookup<'a>(&'a self, host: &'a str) -> LookupFuture<'a> {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host, 0)).await?;
            Ok(addrs.map(|addr| addr.ip()).collect())
        })
    }
}

#[cfg(test)]
pub(crate) use static_resolver::StaticResolver;

#[cfg(test)]
mod static_resolver {
    use std::collections::HashMap;
    use std::io;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    use super::{HostResolver, LookupFuture};

    /// Resolver with a fixed, editable host table.
    ///
    /// Hosts missing from the table fail with [`io::ErrorKind::NotFound`].
    /// Counts lookups, which makes refresh throttling observable in tests.
    #[derive(Debug, Default)]
    pub(crate) struct StaticResolver {
        table: Mutex<HashMap<String, Vec<IpAddr>>>,
        lookups: AtomicUsize,
    }

    impl StaticResolver {
        pub(crate) fn new<I, S>(entries: I) -> Self
        where
            I: IntoIterator<Item = (S, Vec<IpAddr>)>,
            S: Into<String>,
        {
            Self {
                table: Mutex::new(
                    entries
                        .into_iter()
                        .map(|(host, addrs)| (host.into(), addrs))
                        .collect(),
                ),
                lookups: AtomicUsize::new(0),
            }
        }

        /// Replace the addresses for `host`.
        pub(crate) fn set(&self, host: &str, addrs: Vec<IpAddr>) {
            self.table
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(host.to_string(), addrs);
        }

        /// Make `host` unresolvable.
        pub(crate) fn remove(&self, host: &str) {
            self.table
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(host);
        }

        /// Number of lookups performed so far.
        pub(crate) fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl HostResolver for StaticResolver {
        fn lookup<'a>(&'a self, host: &'a str) -> LookupFuture<'a> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let result = self
                .table
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(host)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host not in table"));
            Box::pin(async move { result })
        }
    }
}

/// Immutable result of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSnapshot {
    /// First IPv4 address of every hostname that resolved
    pub addresses: Vec<Ipv4Addr>,
    /// When this snapshot was produced (`None` = never refreshed)
    pub refreshed_at: Option<Instant>,
}

impl HostSnapshot {
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.addresses.contains(&ip)
    }
}

/// Why [`HostCache::maybe_refresh`] did not resolve anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No hostnames configured.
    NoHosts,
    /// Refresh interval is zero.
    Disabled,
    /// The interval has not elapsed since the last refresh.
    NotDue,
    /// Another caller is refreshing right now.
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Skipped(SkipReason),
    Refreshed(Arc<HostSnapshot>),
}

/// Hostname allow-list with a throttled, lazily refreshed address snapshot.
pub struct HostCache {
    hosts: Vec<String>,
    interval: Duration,
    resolver: Arc<dyn HostResolver>,
    snapshot: RwLock<Arc<HostSnapshot>>,
    refresh_lock: AsyncMutex<()>,
}

impl HostCache {
    /// Create a cache for `hosts`.
    ///
    /// An `interval` of zero disables resolution entirely, including the
    /// first one.
    pub fn new(hosts: Vec<String>, interval: Duration, resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            hosts,
            interval,
            resolver,
            snapshot: RwLock::new(Arc::new(HostSnapshot::default())),
            refresh_lock: AsyncMutex::new(()),
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if refreshing can ever happen.
    pub fn is_enabled(&self) -> bool {
        !self.hosts.is_empty() && !self.interval.is_zero()
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub async fn snapshot(&self) -> Arc<HostSnapshot> {
        self.snapshot.read().await.clone()
    }

    async fn is_due(&self, now: Instant) -> bool {
        match self.snapshot.read().await.refreshed_at {
            Some(at) => now.saturating_duration_since(at) >= self.interval,
            None => true,
        }
    }

    /// Re-resolve hostnames if the refresh interval has elapsed.
    pub async fn maybe_refresh(&self, now: Instant) -> RefreshOutcome {
        if self.hosts.is_empty() {
            return RefreshOutcome::Skipped(SkipReason::NoHosts);
        }
        if self.interval.is_zero() {
            return RefreshOutcome::Skipped(SkipReason::Disabled);
        }
        if !self.is_due(now).await {
            return RefreshOutcome::Skipped(SkipReason::NotDue);
        }

        let Ok(_guard) = self.refresh_lock.try_lock() else {
            return RefreshOutcome::Skipped(SkipReason::InProgress);
        };
        // Someone may have finished a refresh between the check and the lock
        if !self.is_due(now).await {
            return RefreshOutcome::Skipped(SkipReason::NotDue);
        }

        RefreshOutcome::Refreshed(self.refresh(now).await)
    }

    /// Resolve every hostname now and swap in the resulting snapshot.
    ///
    /// Ignores the interval. Callers that need serialization should go
    /// through [`HostCache::maybe_refresh`].
    pub async fn refresh(&self, now: Instant) -> Arc<HostSnapshot> {
        let mut addresses = Vec::with_capacity(self.hosts.len());

        for host in &self.hosts {
            if let Some(ip) = self.resolve_first_ipv4(host).await {
                debug!(host = %host, ip = %ip, "Resolved exception host");
                addresses.push(ip);
            }
        }

        let snapshot = Arc::new(HostSnapshot {
            addresses,
            refreshed_at: Some(now),
        });
        *self.snapshot.write().await = snapshot.clone();

        metrics::record_host_refresh(snapshot.addresses.len());
        info!(
            hosts = self.hosts.len(),
            resolved = snapshot.addresses.len(),
            "Exception hosts refreshed"
        );

        snapshot
    }

    async fn resolve_first_ipv4(&self, host: &str) -> Option<Ipv4Addr> {
        match self.resolver.lookup(host).await {
            Ok(addrs) => {
                let found = addrs.into_iter().find_map(to_ipv4);
                if found.is_none() {
                    metrics::record_host_lookup_failure();
                    warn!(host = %host, "Host lookup failed: no IPv4 address found");
                }
                found
            }
            Err(e) => {
                metrics::record_host_lookup_failure();
                warn!(host = %host, error = %e, "Host lookup failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for HostCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCache")
            .field("hosts", &self.hosts)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
