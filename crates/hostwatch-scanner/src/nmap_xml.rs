//! Nmap XML output deserialization.
//!
//! Every scan mode runs nmap with `-oX -`; the XML on stdout is deserialized
//! into these structs with `quick-xml` + serde and then converted into the
//! probe-level `HostScan` shape. Elements not modelled here are ignored.

use std::net::IpAddr;

use serde::Deserialize;

use crate::error::{Result, ScanError};

/// Root element: `<nmaprun>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "host", default)]
    pub hosts: Vec<NmapHost>,
}

/// A single host from scan results.
#[derive(Debug, Clone, Deserialize)]
pub struct NmapHost {
    pub status: Option<HostStatus>,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub hostnames: Option<Hostnames>,
    pub ports: Option<Ports>,
    pub os: Option<OsMatches>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostStatus {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: String,
    #[serde(rename = "@vendor")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostnames {
    #[serde(rename = "hostname", default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostname {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<NmapPort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapPort {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "@portid")]
    pub port_id: u16,
    pub state: PortState,
    pub service: Option<NmapService>,
    #[serde(rename = "script", default)]
    pub scripts: Vec<NmapScript>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortState {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapService {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "@product")]
    pub product: Option<String>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
}

/// NSE script output attached to a port, e.g. `<script id="vulners" output="..."/>`.
#[derive(Debug, Clone, Deserialize)]
pub struct NmapScript {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@output", default)]
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsMatches {
    #[serde(rename = "osmatch", default)]
    pub matches: Vec<OsMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsMatch {
    #[serde(rename = "@name")]
    pub name: String,
}

impl NmapHost {
    /// The host's IP address: IPv4 if reported, otherwise IPv6.
    pub fn ip(&self) -> Option<IpAddr> {
        ["ipv4", "ipv6"].iter().find_map(|kind| {
            self.addresses
                .iter()
                .find(|a| a.addr_type == *kind)
                .and_then(|a| a.addr.parse().ok())
        })
    }

    /// Extract the MAC address, if present.
    pub fn mac(&self) -> Option<&str> {
        self.mac_entry().map(|a| a.addr.as_str())
    }

    /// Vendor nmap attributes to the MAC address, if any.
    pub fn vendor(&self) -> Option<&str> {
        self.mac_entry().and_then(|a| a.vendor.as_deref())
    }

    /// Extract the first non-empty hostname, if present.
    pub fn hostname(&self) -> Option<&str> {
        self.hostnames
            .as_ref()
            .and_then(|hn| hn.hostnames.iter().find(|h| !h.name.is_empty()))
            .map(|h| h.name.as_str())
    }

    /// Check if the host is up.
    pub fn is_up(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.state == "up")
    }

    /// OS match names in the order nmap ranked them.
    pub fn os_names(&self) -> Vec<String> {
        self.os
            .as_ref()
            .map(|os| os.matches.iter().map(|m| m.name.clone()).collect())
            .unwrap_or_default()
    }

    fn mac_entry(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.addr_type == "mac")
    }
}

/// Parse nmap XML bytes into a structured `NmapRun`.
pub fn parse_nmap_xml(xml: &[u8]) -> Result<NmapRun> {
    quick_xml::de::from_reader(xml).map_err(|e| ScanError::XmlParse(format!("{e}")))
}
