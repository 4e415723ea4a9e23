//! The persistence seam the scan engine is written against.
//!
//! A store hands out transactions; every write the engine makes goes through
//! an `InventoryTxn` and becomes visible only on `commit`. Dropping or
//! rolling back a transaction discards everything written through it.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hostwatch_core::{Host, HostDetails, HostId, HostStatus, NetworkPort, Vulnerability};

use crate::client::StoreError;

/// Transactional access to the Host, NetworkPort and Vulnerability collections.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    type Txn: InventoryTxn;

    /// Cheap existence probe for the schema the engine depends on.
    ///
    /// Returns `StoreError::SchemaMissing` while the schema has not been
    /// created yet; any other error means the store itself is unreachable.
    async fn schema_ready(&self) -> Result<(), StoreError>;

    /// Create the schema objects probed by `schema_ready`. Idempotent.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Open a new transaction scope.
    async fn begin(&self) -> Result<Self::Txn, StoreError>;
}

/// One unit of work against the inventory.
#[async_trait]
pub trait InventoryTxn: Send {
    /// Set every host's status to down. Returns the number of hosts touched.
    async fn mark_all_hosts_down(&mut self) -> Result<u64, StoreError>;

    async fn find_host_by_ip(&mut self, ip: IpAddr) -> Result<Option<Host>, StoreError>;

    async fn set_host_status(
        &mut self,
        host_id: HostId,
        status: HostStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn insert_host(&mut self, host: &Host) -> Result<(), StoreError>;

    async fn update_host_details(
        &mut self,
        host_id: HostId,
        details: &HostDetails,
    ) -> Result<(), StoreError>;

    /// Delete every port owned by the host. Returns the number removed.
    async fn delete_ports(&mut self, host_id: HostId) -> Result<u64, StoreError>;

    async fn insert_ports(&mut self, ports: &[NetworkPort]) -> Result<(), StoreError>;

    /// Delete the host's vulnerabilities carrying `source`; other sources stay.
    async fn delete_vulnerabilities(
        &mut self,
        host_id: HostId,
        source: &str,
    ) -> Result<u64, StoreError>;

    async fn insert_vulnerabilities(
        &mut self,
        vulnerabilities: &[Vulnerability],
    ) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
