//! Validated scan targets.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::error::ScanError;

/// The address range handed to the discovery sweep.
///
/// Only CIDR networks and single addresses are accepted, so nothing
/// option-like can reach the nmap command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTarget {
    Network(IpNet),
    Host(IpAddr),
}

impl FromStr for ScanTarget {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(net) = trimmed.parse::<IpNet>() {
            return Ok(Self::Network(net));
        }
        if let Ok(addr) = trimmed.parse::<IpAddr>() {
            return Ok(Self::Host(addr));
        }
        Err(ScanError::InvalidTarget {
            target: s.to_string(),
        })
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(net) => net.fmt(f),
            Self::Host(addr) => addr.fmt(f),
        }
    }
}
