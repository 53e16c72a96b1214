//! Static exception entries: exact IPv4 addresses and IPv4 subnet ranges.
//!
//! Only IPv4 is supported. IPv4-mapped IPv6 input (`::ffff:10.0.0.1`,
//! `::ffff:10.0.0.0/104`) is normalized to its IPv4 form; any other IPv6 entry
//! is rejected at parse time and reported back to the caller.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Bits of an IPv6 prefix occupied by the `::ffff:0:0/96` mapping.
const IPV4_MAPPED_PREFIX: u8 = 96;

/// Normalize an address to IPv4, accepting IPv4-mapped IPv6.
#[inline]
pub fn to_ipv4(ip: IpAddr) -> Option<Ipv4Addr> {
    match ip {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    }
}

/// An IPv4 CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Range {
    /// Network address with host bits cleared
    network: Ipv4Addr,
    /// Prefix length (0..=32)
    prefix_len: u8,
}

impl Ipv4Range {
    /// Build a range, clearing host bits of `network`.
    ///
    /// Returns `None` if `prefix_len` is greater than 32.
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Option<Self> {
        if prefix_len > 32 {
            return None;
        }
        let masked = u32::from(network) & Self::mask(prefix_len);
        Some(Self {
            network: Ipv4Addr::from(masked),
            prefix_len,
        })
    }

    fn mask(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len)
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Check if an address is contained within this range.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = Self::mask(self.prefix_len);
        (u32::from(ip) & mask) == (u32::from(self.network) & mask)
    }
}

impl fmt::Display for Ipv4Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Why an exception entry was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Neither an address nor `address/prefix`.
    Unparsable,
    /// Prefix length larger than the address family allows.
    InvalidPrefix,
    /// A valid IPv6 address or network that has no IPv4 form.
    Ipv6Unsupported,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Unparsable => write!(f, "failed to parse as IP or CIDR"),
            RejectReason::InvalidPrefix => write!(f, "prefix length out of range"),
            RejectReason::Ipv6Unsupported => write!(f, "IPv6 entries are not supported"),
        }
    }
}

/// An exception entry that was dropped during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub entry: String,
    pub reason: RejectReason,
}

/// Exact addresses and subnet ranges an address can match against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList {
    exact: Vec<Ipv4Addr>,
    ranges: Vec<Ipv4Range>,
}

impl AddressList {
    pub fn new(exact: Vec<Ipv4Addr>, ranges: Vec<Ipv4Range>) -> Self {
        Self { exact, ranges }
    }

    pub fn exact(&self) -> &[Ipv4Addr] {
        &self.exact
    }

    pub fn ranges(&self) -> &[Ipv4Range] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.ranges.is_empty()
    }

    /// Check whether `ip` is one of the exact entries.
    pub fn matches_exact(&self, ip: Ipv4Addr) -> bool {
        self.exact.contains(&ip)
    }

    /// Check whether `ip` falls into one of the ranges.
    pub fn matches_range(&self, ip: Ipv4Addr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }

    /// Check `ip` against exact entries, then ranges.
    pub fn matches(&self, ip: Ipv4Addr) -> bool {
        matches(ip, &self.exact, &self.ranges)
    }
}

/// Test an address against exact entries and ranges.
///
/// Exact entries are compared first since equality is cheaper than
/// containment.
pub fn matches(ip: Ipv4Addr, exact: &[Ipv4Addr], ranges: &[Ipv4Range]) -> bool {
    exact.contains(&ip) || ranges.iter().any(|range| range.contains(ip))
}

/// Result of parsing exception lines: what was accepted and what was not.
#[derive(Debug, Clone, Default)]
pub struct ParsedAddressList {
    pub list: AddressList,
    pub rejected: Vec<RejectedEntry>,
}

/// Parse a single exception line.
enum ParsedEntry {
    Exact(Ipv4Addr),
    Range(Ipv4Range),
}

fn parse_entry(line: &str) -> Result<ParsedEntry, RejectReason> {
    if let Ok(ip) = line.parse::<IpAddr>() {
        return to_ipv4(ip)
            .map(ParsedEntry::Exact)
            .ok_or(RejectReason::Ipv6Unsupported);
    }

    let (addr, prefix) = line.split_once('/').ok_or(RejectReason::Unparsable)?;
    let ip: IpAddr = addr.parse().map_err(|_| RejectReason::Unparsable)?;
    // Leading '+' and the like are accepted by u8::from_str; CIDR prefixes are digits only
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RejectReason::Unparsable);
    }
    let prefix_len: u8 = prefix.parse().map_err(|_| RejectReason::InvalidPrefix)?;

    match ip {
        IpAddr::V4(v4) => Ipv4Range::new(v4, prefix_len)
            .map(ParsedEntry::Range)
            .ok_or(RejectReason::InvalidPrefix),
        IpAddr::V6(v6) => {
            if prefix_len > 128 {
                return Err(RejectReason::InvalidPrefix);
            }
            match v6.to_ipv4_mapped() {
                Some(v4) if prefix_len >= IPV4_MAPPED_PREFIX => {
                    Ipv4Range::new(v4, prefix_len - IPV4_MAPPED_PREFIX)
                        .map(ParsedEntry::Range)
                        .ok_or(RejectReason::InvalidPrefix)
                }
                _ => Err(RejectReason::Ipv6Unsupported),
            }
        }
    }
}

/// Classify exception lines into exact addresses and subnet ranges.
///
/// Lines are trimmed; blank lines are ignored. Lines that cannot be used are
/// returned in [`ParsedAddressList::rejected`] instead of being logged here,
/// so the caller decides how loudly to complain.
///
/// # Example
///
/// ```
/// use auth_gate::exceptions::address::parse_address_list;
///
/// let parsed = parse_address_list(["10.0.0.1", "192.168.1.0/24", "nope"]);
/// assert_eq!(parsed.list.exact().len(), 1);
/// assert_eq!(parsed.list.ranges().len(), 1);
/// assert_eq!(parsed.rejected.len(), 1);
/// ```
pub fn parse_address_list<I, S>(lines: I) -> ParsedAddressList
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut exact = Vec::new();
    let mut ranges = Vec::new();
    let mut rejected = Vec::new();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        match parse_entry(line) {
            Ok(ParsedEntry::Exact(ip)) => exact.push(ip),
            Ok(ParsedEntry::Range(range)) => ranges.push(range),
            Err(reason) => rejected.push(RejectedEntry {
                entry: line.to_string(),
                reason,
            }),
        }
    }

    ParsedAddressList {
        list: AddressList::new(exact, ranges),
        rejected,
    }
}
