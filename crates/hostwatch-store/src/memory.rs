//! In-process inventory store.
//!
//! Transactions work on a private copy of the inventory taken at `begin` and
//! publish it on `commit`; rollback simply drops the copy. Hosts are unique
//! by IP, matching the Neo4j constraint. Failure switches let callers
//! simulate a store that is not ready or that rejects writes.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hostwatch_core::{Host, HostDetails, HostId, HostStatus, NetworkPort, Vulnerability};

use crate::client::StoreError;
use crate::gateway::{InventoryStore, InventoryTxn};

/// Snapshot of every collection in the store.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub hosts: Vec<Host>,
    pub ports: Vec<NetworkPort>,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl Inventory {
    pub fn host_by_ip(&self, ip: IpAddr) -> Option<&Host> {
        self.hosts.iter().find(|h| h.ip == ip)
    }

    fn host_mut(&mut self, host_id: HostId) -> Result<&mut Host, StoreError> {
        self.hosts
            .iter_mut()
            .find(|h| h.id == host_id)
            .ok_or_else(|| StoreError::HostNotFound {
                host: host_id.to_string(),
            })
    }
}

/// Transaction writes that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    MarkAllHostsDown,
    SetHostStatus,
    InsertHost,
    UpdateHostDetails,
    DeletePorts,
    InsertPorts,
    DeleteVulnerabilities,
    InsertVulnerabilities,
}

/// A write that fails, optionally only for one host.
#[derive(Debug, Clone, Copy)]
struct FailPoint {
    op: WriteOp,
    host: Option<HostId>,
}

#[derive(Debug, Default)]
struct Shared {
    inventory: Mutex<Inventory>,
    schema_ready: AtomicBool,
    reject_writes: AtomicBool,
    fail_points: Mutex<Vec<FailPoint>>,
    readiness_probes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// In-memory `InventoryStore`. Clones share the same inventory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store whose schema is already in place.
    pub fn new() -> Self {
        let store = Self {
            shared: Arc::new(Shared::default()),
        };
        store.set_schema_ready(true);
        store
    }

    pub fn set_schema_ready(&self, ready: bool) {
        self.shared.schema_ready.store(ready, Ordering::SeqCst);
    }

    /// When set, every write issued through a transaction fails.
    pub fn set_reject_writes(&self, reject: bool) {
        self.shared.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Make `op` fail from now on, for `host` only or for every host when `None`.
    ///
    /// Writes issued earlier in the same transaction still land in its
    /// working copy, so the failure exercises a real rollback.
    pub fn fail_on(&self, op: WriteOp, host: Option<HostId>) {
        self.fail_points_mut().push(FailPoint { op, host });
    }

    pub fn readiness_probes(&self) -> usize {
        self.shared.readiness_probes.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }

    /// Copy of the committed inventory.
    pub fn snapshot(&self) -> Inventory {
        self.lock().clone()
    }

    pub fn host(&self, ip: IpAddr) -> Option<Host> {
        self.lock().host_by_ip(ip).cloned()
    }

    pub fn ports_for(&self, ip: IpAddr) -> Vec<NetworkPort> {
        self.lock()
            .ports
            .iter()
            .filter(|p| p.host_ip == ip)
            .cloned()
            .collect()
    }

    pub fn vulnerabilities_for(&self, ip: IpAddr) -> Vec<Vulnerability> {
        self.lock()
            .vulnerabilities
            .iter()
            .filter(|v| v.host_ip == ip)
            .cloned()
            .collect()
    }

    /// Seed committed state directly, bypassing transactions.
    pub fn seed_host(&self, host: Host) {
        self.lock().hosts.push(host);
    }

    pub fn seed_ports(&self, ports: impl IntoIterator<Item = NetworkPort>) {
        self.lock().ports.extend(ports);
    }

    pub fn seed_vulnerabilities(&self, vulnerabilities: impl IntoIterator<Item = Vulnerability>) {
        self.lock().vulnerabilities.extend(vulnerabilities);
    }

    fn fail_points_mut(&self) -> MutexGuard<'_, Vec<FailPoint>> {
        self.shared
            .fail_points
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, Inventory> {
        // A poisoned lock only means a test thread panicked mid-write.
        self.shared
            .inventory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    type Txn = MemoryTxn;

    async fn schema_ready(&self) -> Result<(), StoreError> {
        self.shared.readiness_probes.fetch_add(1, Ordering::SeqCst);
        if self.shared.schema_ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::SchemaMissing("hosts".to_string()))
        }
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.set_schema_ready(true);
        Ok(())
    }

    async fn begin(&self) -> Result<MemoryTxn, StoreError> {
        Ok(MemoryTxn {
            store: self.clone(),
            working: self.snapshot(),
        })
    }
}

/// A transaction over a private copy of the inventory.
#[derive(Debug)]
pub struct MemoryTxn {
    store: MemoryStore,
    working: Inventory,
}

impl MemoryTxn {
    fn check_writable(&self, op: WriteOp, host: Option<HostId>) -> Result<(), StoreError> {
        if self.store.shared.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes rejected".to_string()));
        }
        let tripped = self.store.fail_points_mut().iter().any(|fp| {
            fp.op == op && (fp.host.is_none() || (host.is_some() && fp.host == host))
        });
        if tripped {
            return Err(StoreError::Unavailable(format!("{op:?} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryTxn for MemoryTxn {
    async fn mark_all_hosts_down(&mut self) -> Result<u64, StoreError> {
        self.check_writable(WriteOp::MarkAllHostsDown, None)?;
        for host in &mut self.working.hosts {
            host.status = HostStatus::Down;
        }
        Ok(self.working.hosts.len() as u64)
    }

    async fn find_host_by_ip(&mut self, ip: IpAddr) -> Result<Option<Host>, StoreError> {
        Ok(self.working.host_by_ip(ip).cloned())
    }

    async fn set_host_status(
        &mut self,
        host_id: HostId,
        status: HostStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_writable(WriteOp::SetHostStatus, Some(host_id))?;
        let host = self.working.host_mut(host_id)?;
        host.status = status;
        host.last_seen = seen_at;
        Ok(())
    }

    async fn insert_host(&mut self, host: &Host) -> Result<(), StoreError> {
        self.check_writable(WriteOp::InsertHost, Some(host.id))?;
        if self.working.host_by_ip(host.ip).is_some() {
            return Err(StoreError::Constraint(format!(
                "host with ip {} already exists",
                host.ip
            )));
        }
        self.working.hosts.push(host.clone());
        Ok(())
    }

    async fn update_host_details(
        &mut self,
        host_id: HostId,
        details: &HostDetails,
    ) -> Result<(), StoreError> {
        self.check_writable(WriteOp::UpdateHostDetails, Some(host_id))?;
        let host = self.working.host_mut(host_id)?;
        host.hostname = details.hostname.clone();
        host.mac_address = details.mac_address.clone();
        host.vendor = details.vendor.clone();
        host.os_name = details.os_name.clone();
        Ok(())
    }

    async fn delete_ports(&mut self, host_id: HostId) -> Result<u64, StoreError> {
        self.check_writable(WriteOp::DeletePorts, Some(host_id))?;
        let before = self.working.ports.len();
        self.working.ports.retain(|p| p.host_id != host_id);
        Ok((before - self.working.ports.len()) as u64)
    }

    async fn insert_ports(&mut self, ports: &[NetworkPort]) -> Result<(), StoreError> {
        self.check_writable(WriteOp::InsertPorts, ports.first().map(|p| p.host_id))?;
        self.working.ports.extend_from_slice(ports);
        Ok(())
    }

    async fn delete_vulnerabilities(
        &mut self,
        host_id: HostId,
        source: &str,
    ) -> Result<u64, StoreError> {
        self.check_writable(WriteOp::DeleteVulnerabilities, Some(host_id))?;
        let before = self.working.vulnerabilities.len();
        self.working
            .vulnerabilities
            .retain(|v| !(v.host_id == host_id && v.source == source));
        Ok((before - self.working.vulnerabilities.len()) as u64)
    }

    async fn insert_vulnerabilities(
        &mut self,
        vulnerabilities: &[Vulnerability],
    ) -> Result<(), StoreError> {
        self.check_writable(
            WriteOp::InsertVulnerabilities,
            vulnerabilities.first().map(|v| v.host_id),
        )?;
        self.working.vulnerabilities.extend_from_slice(vulnerabilities);
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        *self.store.lock() = self.working;
        self.store.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.store.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
