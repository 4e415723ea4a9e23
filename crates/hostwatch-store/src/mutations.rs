//! Transactional write operations for the Neo4j inventory.
//!
//! Every statement runs inside an explicit `neo4rs::Txn`; statements are
//! applied in order on the server, so a delete issued before an insert is
//! already in effect when the insert runs.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use neo4rs::{query, Query, Txn};

use hostwatch_core::{Host, HostDetails, HostId, HostStatus, NetworkPort, Vulnerability};

use crate::client::{Neo4jStore, StoreError};
use crate::gateway::{InventoryStore, InventoryTxn};
use crate::queries::{node_to_host, opt_string, row_count, row_node};

/// Name of the uniqueness constraint on `Host.ip`, doubling as the readiness marker.
pub const HOST_IP_CONSTRAINT: &str = "host_ip_unique";

#[async_trait]
impl InventoryStore for Neo4jStore {
    type Txn = Neo4jTxn;

    async fn schema_ready(&self) -> Result<(), StoreError> {
        let q = query("SHOW CONSTRAINTS YIELD name WHERE name = $name RETURN name")
            .param("name", HOST_IP_CONSTRAINT.to_string());

        match self.query_one(q).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::SchemaMissing(format!(
                "constraint {HOST_IP_CONSTRAINT}"
            ))),
        }
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let statements = [
            format!(
                "CREATE CONSTRAINT {HOST_IP_CONSTRAINT} IF NOT EXISTS
                 FOR (h:Host) REQUIRE h.ip IS UNIQUE"
            ),
            "CREATE INDEX host_id_index IF NOT EXISTS FOR (h:Host) ON (h.id)".to_string(),
            "CREATE INDEX vulnerability_source_index IF NOT EXISTS
             FOR (v:Vulnerability) ON (v.source)"
                .to_string(),
        ];

        for cypher in &statements {
            self.run(query(cypher)).await?;
        }

        tracing::info!(constraint = HOST_IP_CONSTRAINT, "Inventory schema ensured");
        Ok(())
    }

    async fn begin(&self) -> Result<Neo4jTxn, StoreError> {
        let txn = self.inner().start_txn().await?;
        Ok(Neo4jTxn { txn })
    }
}

/// An open Neo4j transaction scoped to one unit of inventory work.
pub struct Neo4jTxn {
    txn: Txn,
}

impl Neo4jTxn {
    /// Execute a query inside the transaction and collect all rows.
    async fn fetch_rows(&mut self, q: Query) -> Result<Vec<neo4rs::Row>, StoreError> {
        let mut stream = self.txn.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a query whose single row carries a count under `key`.
    async fn fetch_count(&mut self, q: Query, key: &str) -> Result<u64, StoreError> {
        let rows = self.fetch_rows(q).await?;
        match rows.first() {
            Some(row) => row_count(row, key),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl InventoryTxn for Neo4jTxn {
    async fn mark_all_hosts_down(&mut self) -> Result<u64, StoreError> {
        let q = query("MATCH (h:Host) SET h.status = $status RETURN count(h) AS updated")
            .param("status", HostStatus::Down.as_str().to_string());
        self.fetch_count(q, "updated").await
    }

    async fn find_host_by_ip(&mut self, ip: IpAddr) -> Result<Option<Host>, StoreError> {
        let q = query("MATCH (h:Host {ip: $ip}) RETURN h LIMIT 1").param("ip", ip.to_string());
        let rows = self.fetch_rows(q).await?;
        match rows.first() {
            Some(row) => Ok(Some(node_to_host(&row_node(row, "h")?)?)),
            None => Ok(None),
        }
    }

    async fn set_host_status(
        &mut self,
        host_id: HostId,
        status: HostStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let q = query(
            "MATCH (h:Host {id: $id})
             SET h.status = $status, h.last_seen = $seen_at
             RETURN count(h) AS updated",
        )
        .param("id", host_id.0.to_string())
        .param("status", status.as_str().to_string())
        .param("seen_at", seen_at.to_rfc3339());

        match self.fetch_count(q, "updated").await? {
            0 => Err(StoreError::HostNotFound {
                host: host_id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn insert_host(&mut self, host: &Host) -> Result<(), StoreError> {
        let q = query(
            "CREATE (h:Host {
               id: $id, ip: $ip, hostname: $hostname, mac_address: $mac_address,
               vendor: $vendor, os_name: $os_name, status: $status, last_seen: $last_seen
             })",
        )
        .param("id", host.id.0.to_string())
        .param("ip", host.ip.to_string())
        .param("hostname", host.hostname.clone())
        .param("mac_address", opt_string(&host.mac_address))
        .param("vendor", opt_string(&host.vendor))
        .param("os_name", host.os_name.clone())
        .param("status", host.status.as_str().to_string())
        .param("last_seen", host.last_seen.to_rfc3339());

        self.txn.run(q).await?;
        Ok(())
    }

    async fn update_host_details(
        &mut self,
        host_id: HostId,
        details: &HostDetails,
    ) -> Result<(), StoreError> {
        let q = query(
            "MATCH (h:Host {id: $id})
             SET h.hostname = $hostname, h.mac_address = $mac_address,
                 h.vendor = $vendor, h.os_name = $os_name
             RETURN count(h) AS updated",
        )
        .param("id", host_id.0.to_string())
        .param("hostname", details.hostname.clone())
        .param("mac_address", opt_string(&details.mac_address))
        .param("vendor", opt_string(&details.vendor))
        .param("os_name", details.os_name.clone());

        match self.fetch_count(q, "updated").await? {
            0 => Err(StoreError::HostNotFound {
                host: host_id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn delete_ports(&mut self, host_id: HostId) -> Result<u64, StoreError> {
        let q = query(
            "MATCH (:Host {id: $id})-[:HAS_PORT]->(p:NetworkPort)
             DETACH DELETE p
             RETURN count(p) AS deleted",
        )
        .param("id", host_id.0.to_string());
        self.fetch_count(q, "deleted").await
    }

    async fn insert_ports(&mut self, ports: &[NetworkPort]) -> Result<(), StoreError> {
        let queries: Vec<Query> = ports
            .iter()
            .map(|p| {
                query(
                    "MATCH (h:Host {id: $host_id})
                     CREATE (h)-[:HAS_PORT]->(:NetworkPort {
                       host_ip: $host_ip, port_number: $port_number, protocol: $protocol,
                       service_name: $service_name, discovered_at: $discovered_at
                     })",
                )
                .param("host_id", p.host_id.0.to_string())
                .param("host_ip", p.host_ip.to_string())
                .param("port_number", p.port_number as i64)
                .param("protocol", p.protocol.as_str().to_string())
                .param("service_name", p.service_name.clone())
                .param("discovered_at", p.discovered_at.to_rfc3339())
            })
            .collect();

        if !queries.is_empty() {
            self.txn.run_queries(queries).await?;
        }
        Ok(())
    }

    async fn delete_vulnerabilities(
        &mut self,
        host_id: HostId,
        source: &str,
    ) -> Result<u64, StoreError> {
        let q = query(
            "MATCH (:Host {id: $id})-[:HAS_VULNERABILITY]->(v:Vulnerability {source: $source})
             DETACH DELETE v
             RETURN count(v) AS deleted",
        )
        .param("id", host_id.0.to_string())
        .param("source", source.to_string());
        self.fetch_count(q, "deleted").await
    }

    async fn insert_vulnerabilities(
        &mut self,
        vulnerabilities: &[Vulnerability],
    ) -> Result<(), StoreError> {
        let queries: Vec<Query> = vulnerabilities
            .iter()
            .map(|v| {
                query(
                    "MATCH (h:Host {id: $host_id})
                     CREATE (h)-[:HAS_VULNERABILITY]->(:Vulnerability {
                       host_ip: $host_ip, port: $port, service: $service,
                       severity: $severity, cve: $cve, description: $description,
                       source: $source, discovered_at: $discovered_at
                     })",
                )
                .param("host_id", v.host_id.0.to_string())
                .param("host_ip", v.host_ip.to_string())
                .param("port", v.port as i64)
                .param("service", v.service.clone())
                .param("severity", v.severity.as_str().to_string())
                .param("cve", v.cve.clone())
                .param("description", v.description.clone())
                .param("source", v.source.clone())
                .param("discovered_at", v.discovered_at.to_rfc3339())
            })
            .collect();

        if !queries.is_empty() {
            self.txn.run_queries(queries).await?;
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.txn.rollback().await?;
        Ok(())
    }
}
