//! Stage 1: host discovery.
//!
//! A ping sweep of the target produces the live set, which is reconciled
//! into the Host collection in a single transaction: every host is marked
//! down, then live hosts are marked up or created. Any failure rolls the
//! whole reconciliation back.

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use hostwatch_core::{Host, HostStatus};
use hostwatch_store::{InventoryStore, InventoryTxn};

use crate::error::Result;
use crate::persist;
use crate::probe::PortScanProbe;
use crate::target::ScanTarget;

/// The outcome of one discovery stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Responsive addresses, sorted.
    pub live: Vec<IpAddr>,
    /// Addresses seen for the first time.
    pub new_hosts: Vec<IpAddr>,
    /// Hosts marked down before live hosts were marked up again.
    pub marked_down: u64,
}

/// Sweep `target` and reconcile the result into the store.
pub async fn discover_hosts<P, S>(probe: &P, store: &S, target: &ScanTarget) -> Result<Discovery>
where
    P: PortScanProbe,
    S: InventoryStore,
{
    tracing::info!(target = %target, "Stage 1: host discovery");

    let live: Vec<IpAddr> = probe.sweep(target).await?.into_iter().collect();
    tracing::info!(target = %target, live_hosts = live.len(), "Discovery sweep complete");

    let mut txn = store.begin().await?;
    let outcome = reconcile(&mut txn, live, Utc::now()).await;
    let discovery = persist::finish(txn, outcome).await?;

    tracing::info!(
        live_hosts = discovery.live.len(),
        new_hosts = discovery.new_hosts.len(),
        "Host inventory reconciled"
    );
    Ok(discovery)
}

async fn reconcile<T: InventoryTxn>(
    txn: &mut T,
    live: Vec<IpAddr>,
    now: DateTime<Utc>,
) -> Result<Discovery> {
    let marked_down = txn.mark_all_hosts_down().await?;
    let mut new_hosts = Vec::new();

    for ip in &live {
        match txn.find_host_by_ip(*ip).await? {
            Some(host) => txn.set_host_status(host.id, HostStatus::Up, now).await?,
            None => {
                tracing::info!(ip = %ip, "New host found, creating record");
                txn.insert_host(&Host::discovered(*ip, now)).await?;
                new_hosts.push(*ip);
            }
        }
    }

    Ok(Discovery {
        live,
        new_hosts,
        marked_down,
    })
}
