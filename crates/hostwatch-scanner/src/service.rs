//! Stage 2: service and OS fingerprinting of a single host.

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use hostwatch_core::{HostDetails, HostId, NetworkPort, PLACEHOLDER_HOSTNAME, UNKNOWN_OS};
use hostwatch_store::{InventoryStore, InventoryTxn, StoreError};

use crate::error::Result;
use crate::persist;
use crate::probe::{HostScan, PortScanProbe};

/// What a per-host stage did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The host answered; this many rows now make up its inventory.
    Recorded(usize),
    /// The host was absent from the scan result; nothing was written.
    Offline,
}

/// Deep-scan `ip`, refresh its fingerprint and replace its port inventory.
pub async fn probe_services<P, S>(probe: &P, store: &S, ip: IpAddr) -> Result<ProbeOutcome>
where
    P: PortScanProbe,
    S: InventoryStore,
{
    tracing::info!(ip = %ip, "Stage 2: service and OS scan");

    let Some(scan) = probe.service_scan(ip).await? else {
        tracing::warn!(ip = %ip, "Host went offline during service scan, skipping");
        return Ok(ProbeOutcome::Offline);
    };

    let mut txn = store.begin().await?;
    let outcome = replace_ports(&mut txn, ip, &scan, Utc::now()).await;
    let recorded = persist::finish(txn, outcome).await?;

    if recorded > 0 {
        tracing::info!(ip = %ip, open_ports = recorded, "Recorded open ports");
    }
    Ok(ProbeOutcome::Recorded(recorded))
}

async fn replace_ports<T: InventoryTxn>(
    txn: &mut T,
    ip: IpAddr,
    scan: &HostScan,
    now: DateTime<Utc>,
) -> Result<usize> {
    let host = txn
        .find_host_by_ip(ip)
        .await?
        .ok_or_else(|| StoreError::HostNotFound {
            host: ip.to_string(),
        })?;

    txn.update_host_details(host.id, &host_details(scan)).await?;

    let removed = txn.delete_ports(host.id).await?;
    tracing::debug!(ip = %ip, removed, "Cleared previous port inventory");

    let ports = network_ports(scan, host.id, now);
    txn.insert_ports(&ports).await?;
    Ok(ports.len())
}

/// Fingerprint fields with their fallbacks applied.
pub fn host_details(scan: &HostScan) -> HostDetails {
    HostDetails {
        hostname: scan
            .hostname
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_HOSTNAME.to_string()),
        mac_address: scan.mac.clone(),
        vendor: scan.vendor.clone(),
        os_name: scan
            .os_matches
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_OS.to_string()),
    }
}

/// One row per open tcp/udp port in the scan.
pub fn network_ports(scan: &HostScan, host_id: HostId, now: DateTime<Utc>) -> Vec<NetworkPort> {
    scan.open_ports()
        .map(|(protocol, port_number, port)| NetworkPort {
            host_id,
            host_ip: scan.ip,
            port_number,
            protocol,
            service_name: port.service_name(),
            discovered_at: now,
        })
        .collect()
}
