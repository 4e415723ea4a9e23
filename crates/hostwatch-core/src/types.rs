//! Core inventory types shared by the store and the scanner.
//!
//! A `Host` exclusively owns its `NetworkPort` and `Vulnerability` rows;
//! both child collections are replaced wholesale whenever the host is
//! rescanned.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HostwatchError;

/// Hostname stored until a service probe resolves a real one.
pub const PLACEHOLDER_HOSTNAME: &str = "N/A";

/// OS name stored until a service probe produces an OS match.
pub const UNKNOWN_OS: &str = "Unknown";

// ── Hosts ─────────────────────────────────────────────────────────

/// Unique identifier for a host record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HostId(pub Uuid);

impl HostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Liveness of a host as of the most recent sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Up,
    Down,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostStatus {
    type Err = HostwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(HostwatchError::InvalidValue {
                kind: "host status",
                value: other.to_string(),
            }),
        }
    }
}

/// A network host, identified by its IP address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Host {
    pub id: HostId,
    pub ip: IpAddr,
    pub hostname: String,
    pub mac_address: Option<String>,
    pub vendor: Option<String>,
    pub os_name: String,
    pub status: HostStatus,
    pub last_seen: DateTime<Utc>,
}

impl Host {
    /// A freshly discovered host: up, with placeholder hostname and OS.
    pub fn discovered(ip: IpAddr, now: DateTime<Utc>) -> Self {
        Self {
            id: HostId::new(),
            ip,
            hostname: PLACEHOLDER_HOSTNAME.to_string(),
            mac_address: None,
            vendor: None,
            os_name: UNKNOWN_OS.to_string(),
            status: HostStatus::Up,
            last_seen: now,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == HostStatus::Up
    }
}

/// Fingerprint attributes written by a service probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDetails {
    pub hostname: String,
    pub mac_address: Option<String>,
    pub vendor: Option<String>,
    pub os_name: String,
}

// ── Ports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = HostwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(HostwatchError::InvalidValue {
                kind: "protocol",
                value: s.to_string(),
            }),
        }
    }
}

/// An open port recorded by the most recent service probe of its host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkPort {
    pub host_id: HostId,
    pub host_ip: IpAddr,
    pub port_number: u16,
    pub protocol: Protocol,
    pub service_name: String,
    pub discovered_at: DateTime<Utc>,
}

// ── Vulnerabilities ───────────────────────────────────────────────

/// Severity tier derived from the score leading a vulnerability line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Map a numeric score onto a tier. NaN falls through to `Low`.
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Self::Critical
        } else if score >= 7.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = HostwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Critical" => Ok(Self::Critical),
            "High" => Ok(Self::High),
            "Medium" => Ok(Self::Medium),
            "Low" => Ok(Self::Low),
            "Info" => Ok(Self::Info),
            other => Err(HostwatchError::InvalidValue {
                kind: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// A vulnerability finding attributed to a host and port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vulnerability {
    pub host_id: HostId,
    pub host_ip: IpAddr,
    pub port: u16,
    pub service: String,
    pub severity: Severity,
    pub cve: String,
    pub description: String,
    /// Which scanner produced the row; replacement is scoped by this tag.
    pub source: String,
    pub discovered_at: DateTime<Utc>,
}
