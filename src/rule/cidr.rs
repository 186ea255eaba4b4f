//! IP CIDR range matching.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::RuleError;

/// CidrSet matches IP addresses against CIDR network ranges.
///
/// Supports both IPv4 and IPv6 CIDR notation.
///
/// # Examples
/// ```
/// use geoblock::rule::CidrSet;
///
/// let mut set = CidrSet::new();
/// set.add_pattern("192.168.0.0/16").unwrap();
/// set.add_pattern("fc00::/7").unwrap();
/// assert!(set.contains("192.168.1.1".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CidrSet {
    /// IPv4 CIDR ranges (sorted by network address)
    v4_cidrs: Vec<Ipv4Net>,
    /// IPv6 CIDR ranges (sorted by network address)
    v6_cidrs: Vec<Ipv6Net>,
}

impl CidrSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of IPv4 CIDR patterns.
    pub fn v4_count(&self) -> usize {
        self.v4_cidrs.len()
    }

    /// Get the number of IPv6 CIDR patterns.
    pub fn v6_count(&self) -> usize {
        self.v6_cidrs.len()
    }

    /// Get the total number of CIDR patterns.
    pub fn len(&self) -> usize {
        self.v4_count() + self.v6_count()
    }

    /// Check if the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a CIDR pattern such as `10.0.0.0/8` or `2001:db8::/32`.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<(), RuleError> {
        let pattern = pattern.trim();

        if let Ok(v4net) = pattern.parse::<Ipv4Net>() {
            let pos = self
                .v4_cidrs
                .binary_search_by_key(&v4net.network(), |n| n.network())
                .unwrap_or_else(|e| e);
            self.v4_cidrs.insert(pos, v4net);
            return Ok(());
        }

        if let Ok(v6net) = pattern.parse::<Ipv6Net>() {
            let pos = self
                .v6_cidrs
                .binary_search_by_key(&v6net.network(), |n| n.network())
                .unwrap_or_else(|e| e);
            self.v6_cidrs.insert(pos, v6net);
            return Ok(());
        }

        Err(RuleError::InvalidCidr(pattern.to_string()))
    }

    /// Check if an address falls in any range.
    ///
    /// IPv4-mapped IPv6 addresses are matched against the IPv4 ranges too.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.contains_v4(v4),
            IpAddr::V6(v6) => {
                self.contains_v6(v6) || v6.to_ipv4_mapped().is_some_and(|v4| self.contains_v4(v4))
            }
        }
    }

    fn contains_v4(&self, ip: Ipv4Addr) -> bool {
        self.v4_cidrs.iter().any(|cidr| cidr.contains(&ip))
    }

    fn contains_v6(&self, ip: Ipv6Addr) -> bool {
        self.v6_cidrs.iter().any(|cidr| cidr.contains(&ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_cidr_match() {
        let mut set = CidrSet::new();
        set.add_pattern("192.168.0.0/16").unwrap();
        set.add_pattern("10.0.0.0/8").unwrap();

        assert!(set.contains("192.168.1.1".parse().unwrap()));
        assert!(set.contains("192.168.255.255".parse().unwrap()));
        assert!(set.contains("10.0.0.1".parse().unwrap()));
        assert!(!set.contains("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_ipv6_cidr_match() {
        let mut set = CidrSet::new();
        set.add_pattern("fc00::/7").unwrap();
        set.add_pattern("2001:db8::/32").unwrap();

        assert!(set.contains("fc00::1".parse().unwrap()));
        assert!(set.contains("fd00::1".parse().unwrap()));
        assert!(set.contains("2001:db8::1".parse().unwrap()));
        assert!(!set.contains("2001:4860::1".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_mapped_address() {
        let mut set = CidrSet::new();
        set.add_pattern("1.1.1.0/24").unwrap();

        assert!(set.contains("::ffff:1.1.1.1".parse().unwrap()));
        assert!(!set.contains("::ffff:8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_unaligned_network() {
        // Host bits are allowed and ignored when matching.
        let mut set = CidrSet::new();
        set.add_pattern("1.1.1.1/24").unwrap();
        assert!(set.contains("1.1.1.200".parse().unwrap()));
    }

    #[test]
    fn test_counts() {
        let mut set = CidrSet::new();
        assert!(set.is_empty());

        set.add_pattern("127.0.0.0/8").unwrap();
        set.add_pattern("::1/128").unwrap();
        set.add_pattern(" 10.0.0.0/8 ").unwrap();

        assert_eq!(set.v4_count(), 2);
        assert_eq!(set.v6_count(), 1);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_invalid_cidr() {
        let mut set = CidrSet::new();

        assert!(set.add_pattern("invalid").is_err());
        assert!(set.add_pattern("192.168.1.1").is_err()); // No prefix
        assert!(set.add_pattern("192.168.1.1/33").is_err()); // Invalid prefix
        assert!(set.is_empty());
    }
}
