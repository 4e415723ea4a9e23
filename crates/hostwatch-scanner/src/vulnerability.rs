//! Stage 3: vulnerability-script scan of a single host.

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use hostwatch_store::{InventoryStore, InventoryTxn, StoreError};

use crate::error::Result;
use crate::persist;
use crate::probe::{HostScan, PortScanProbe};
use crate::service::ProbeOutcome;
use crate::vulners;

/// Scan `ip` with vulnerability scripts and replace its `source` findings.
pub async fn probe_vulnerabilities<P, S>(
    probe: &P,
    store: &S,
    ip: IpAddr,
    source: &str,
) -> Result<ProbeOutcome>
where
    P: PortScanProbe,
    S: InventoryStore,
{
    tracing::info!(ip = %ip, "Stage 3: vulnerability scan");

    let Some(scan) = probe.vuln_scan(ip).await? else {
        tracing::warn!(ip = %ip, "Host went offline during vulnerability scan, skipping");
        return Ok(ProbeOutcome::Offline);
    };

    let mut txn = store.begin().await?;
    let outcome = replace_vulnerabilities(&mut txn, ip, &scan, source, Utc::now()).await;
    let recorded = persist::finish(txn, outcome).await?;

    if recorded > 0 {
        tracing::info!(ip = %ip, vulnerabilities = recorded, "Recorded potential vulnerabilities");
    }
    Ok(ProbeOutcome::Recorded(recorded))
}

async fn replace_vulnerabilities<T: InventoryTxn>(
    txn: &mut T,
    ip: IpAddr,
    scan: &HostScan,
    source: &str,
    now: DateTime<Utc>,
) -> Result<usize> {
    let host = txn
        .find_host_by_ip(ip)
        .await?
        .ok_or_else(|| StoreError::HostNotFound {
            host: ip.to_string(),
        })?;

    let removed = txn.delete_vulnerabilities(host.id, source).await?;
    tracing::debug!(ip = %ip, source, removed, "Cleared previous findings");

    let records = vulners::parse_vulnerabilities(scan, ip, host.id, source, now);
    txn.insert_vulnerabilities(&records).await?;
    Ok(records.len())
}
