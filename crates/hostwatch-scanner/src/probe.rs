//! The port-scan probe boundary.
//!
//! `PortScanProbe` is the seam between the pipeline and the scanning tool.
//! Results cross it as `HostScan` values (protocol -> port -> fields), so
//! the stages and the vulnerability parser never see nmap's XML. A host that
//! stopped answering between calls is reported as `None`, never an error.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use hostwatch_core::Protocol;

use crate::config::ScanMode;
use crate::error::{Result, ScanError};
use crate::nmap_xml::{self, NmapHost, NmapRun};
use crate::target::ScanTarget;

/// Service name recorded when nmap reports neither product nor name.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// One port as reported by a service or vulnerability scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortScan {
    pub state: String,
    pub name: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    /// Raw NSE output keyed by script id.
    pub scripts: BTreeMap<String, String>,
}

impl PortScan {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    /// "product version" trimmed, else the service name, else "unknown".
    pub fn service_name(&self) -> String {
        let banner = format!(
            "{} {}",
            self.product.as_deref().unwrap_or_default(),
            self.version.as_deref().unwrap_or_default()
        );
        let banner = banner.trim();
        if !banner.is_empty() {
            return banner.to_string();
        }
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNKNOWN_SERVICE.to_string(),
        }
    }
}

/// Everything a deep scan learned about one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostScan {
    pub ip: IpAddr,
    pub hostname: Option<String>,
    pub mac: Option<String>,
    pub vendor: Option<String>,
    /// OS match names, best first.
    pub os_matches: Vec<String>,
    pub protocols: BTreeMap<Protocol, BTreeMap<u16, PortScan>>,
}

impl HostScan {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            hostname: None,
            mac: None,
            vendor: None,
            os_matches: Vec::new(),
            protocols: BTreeMap::new(),
        }
    }

    /// Open ports in protocol then port order.
    pub fn open_ports(&self) -> impl Iterator<Item = (Protocol, u16, &PortScan)> {
        self.protocols.iter().flat_map(|(proto, ports)| {
            ports
                .iter()
                .filter(|(_, p)| p.is_open())
                .map(move |(number, p)| (*proto, *number, p))
        })
    }

    /// Convert an nmap host entry. Ports on protocols other than tcp/udp are dropped.
    pub fn from_nmap(host: &NmapHost) -> Option<Self> {
        let ip = host.ip()?;
        let mut scan = Self::new(ip);
        scan.hostname = host.hostname().map(String::from);
        scan.mac = host.mac().map(String::from);
        scan.vendor = host.vendor().map(String::from);
        scan.os_matches = host.os_names();

        for np in host.ports.iter().flat_map(|p| p.ports.iter()) {
            let Ok(protocol) = np.protocol.parse::<Protocol>() else {
                continue;
            };
            let service = np.service.as_ref();
            let port = PortScan {
                state: np.state.state.clone(),
                name: service.and_then(|s| s.name.clone()),
                product: service.and_then(|s| s.product.clone()),
                version: service.and_then(|s| s.version.clone()),
                scripts: np
                    .scripts
                    .iter()
                    .map(|s| (s.id.clone(), s.output.clone()))
                    .collect(),
            };
            scan.protocols
                .entry(protocol)
                .or_default()
                .insert(np.port_id, port);
        }

        Some(scan)
    }
}

/// The three scan modes the pipeline needs from a scanning tool.
#[async_trait]
pub trait PortScanProbe: Send + Sync {
    /// Ping sweep: the set of responsive addresses in `target`.
    async fn sweep(&self, target: &ScanTarget) -> Result<BTreeSet<IpAddr>>;

    /// Service version and OS fingerprint of one host.
    async fn service_scan(&self, ip: IpAddr) -> Result<Option<HostScan>>;

    /// Vulnerability-script scan of one host.
    async fn vuln_scan(&self, ip: IpAddr) -> Result<Option<HostScan>>;
}

#[async_trait]
impl<T: PortScanProbe + ?Sized> PortScanProbe for &T {
    async fn sweep(&self, target: &ScanTarget) -> Result<BTreeSet<IpAddr>> {
        (**self).sweep(target).await
    }

    async fn service_scan(&self, ip: IpAddr) -> Result<Option<HostScan>> {
        (**self).service_scan(ip).await
    }

    async fn vuln_scan(&self, ip: IpAddr) -> Result<Option<HostScan>> {
        (**self).vuln_scan(ip).await
    }
}

/// Up hosts in a sweep result.
pub fn live_addresses(run: &NmapRun) -> BTreeSet<IpAddr> {
    run.hosts
        .iter()
        .filter(|h| h.is_up())
        .filter_map(NmapHost::ip)
        .collect()
}

/// The entry for `ip` in a single-host scan, if nmap reported it up.
pub fn find_host(run: &NmapRun, ip: IpAddr) -> Option<HostScan> {
    run.hosts
        .iter()
        .filter(|h| h.is_up())
        .find(|h| h.ip() == Some(ip))
        .and_then(HostScan::from_nmap)
}

/// Wrapper around the nmap binary.
pub struct NmapProbe {
    nmap_path: String,
}

impl NmapProbe {
    pub fn new(nmap_path: &str) -> Self {
        Self {
            nmap_path: nmap_path.to_string(),
        }
    }

    /// Verify nmap is installed and accessible, returning its version banner.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ScanError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ScanError::XmlParse(e.to_string()))
    }

    /// A missing binary is `NmapNotFound`; anything else keeps its io error.
    fn spawn_error(&self, e: std::io::Error) -> ScanError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScanError::NmapNotFound {
                path: self.nmap_path.clone(),
            }
        } else {
            ScanError::Io(e)
        }
    }

    /// Execute nmap against `target` in the given mode and parse its XML.
    ///
    /// The process runs under `tokio::process::Command`; the call blocks the
    /// pipeline (not the runtime) until nmap exits. No timeout is applied.
    pub async fn run(&self, mode: ScanMode, target: &str) -> Result<NmapRun> {
        let scan_id = Uuid::new_v4();
        let start = Instant::now();

        tracing::info!(
            scan_id = %scan_id,
            target = %target,
            mode = ?mode,
            "Starting nmap scan"
        );

        let output = Command::new(&self.nmap_path)
            .args(mode.nmap_flags())
            .arg("-oX")
            .arg("-")
            .arg("--noninteractive")
            .arg(target)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let duration = start.elapsed();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(ScanError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let nmap_run = nmap_xml::parse_nmap_xml(&output.stdout)?;

        tracing::info!(
            scan_id = %scan_id,
            target = %target,
            hosts_up = nmap_run.hosts.iter().filter(|h| h.is_up()).count(),
            duration_ms = duration.as_millis(),
            "Nmap scan complete"
        );

        Ok(nmap_run)
    }
}

#[async_trait]
impl PortScanProbe for NmapProbe {
    async fn sweep(&self, target: &ScanTarget) -> Result<BTreeSet<IpAddr>> {
        let run = self.run(ScanMode::Sweep, &target.to_string()).await?;
        Ok(live_addresses(&run))
    }

    async fn service_scan(&self, ip: IpAddr) -> Result<Option<HostScan>> {
        let run = self.run(ScanMode::Service, &ip.to_string()).await?;
        Ok(find_host(&run, ip))
    }

    async fn vuln_scan(&self, ip: IpAddr) -> Result<Option<HostScan>> {
        let run = self.run(ScanMode::Vulnerability, &ip.to_string()).await?;
        Ok(find_host(&run, ip))
    }
}
