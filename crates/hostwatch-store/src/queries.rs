//! Read operations and record decoding for the Neo4j inventory.
//!
//! Hosts, ports and vulnerabilities are stored as nodes:
//! `(:Host)-[:HAS_PORT]->(:NetworkPort)` and
//! `(:Host)-[:HAS_VULNERABILITY]->(:Vulnerability)`. Optional strings are
//! stored as empty strings and timestamps as RFC 3339 text.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use neo4rs::query;
use uuid::Uuid;

use hostwatch_core::{Host, HostId, HostwatchError, NetworkPort, Vulnerability};

use crate::client::{Neo4jStore, StoreError};

impl Neo4jStore {
    /// Find a single host by IP address.
    pub async fn find_host(&self, ip: IpAddr) -> Result<Option<Host>, StoreError> {
        let q = query("MATCH (h:Host {ip: $ip}) RETURN h LIMIT 1").param("ip", ip.to_string());
        match self.query_one(q).await? {
            Some(row) => Ok(Some(node_to_host(&row_node(&row, "h")?)?)),
            None => Ok(None),
        }
    }

    /// List the ports currently owned by a host.
    pub async fn list_ports(&self, host_id: HostId) -> Result<Vec<NetworkPort>, StoreError> {
        let q = query(
            "MATCH (:Host {id: $id})-[:HAS_PORT]->(p:NetworkPort)
             RETURN p ORDER BY p.protocol, p.port_number",
        )
        .param("id", host_id.0.to_string());

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| node_to_port(&row_node(row, "p")?, host_id))
            .collect()
    }

    /// List the vulnerabilities currently owned by a host, across all sources.
    pub async fn list_vulnerabilities(
        &self,
        host_id: HostId,
    ) -> Result<Vec<Vulnerability>, StoreError> {
        let q = query(
            "MATCH (:Host {id: $id})-[:HAS_VULNERABILITY]->(v:Vulnerability)
             RETURN v ORDER BY v.port, v.cve",
        )
        .param("id", host_id.0.to_string());

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| node_to_vulnerability(&row_node(row, "v")?, host_id))
            .collect()
    }
}

// ── Decoding ─────────────────────────────────────────────────────

pub(crate) fn row_node(row: &neo4rs::Row, key: &str) -> Result<neo4rs::Node, StoreError> {
    row.get(key)
        .map_err(|e| StoreError::Decode(format!("Failed to deserialize node: {e}")))
}

pub(crate) fn row_count(row: &neo4rs::Row, key: &str) -> Result<u64, StoreError> {
    let n: i64 = row
        .get(key)
        .map_err(|e| StoreError::Decode(format!("{key}: {e}")))?;
    Ok(n.max(0) as u64)
}

pub(crate) fn node_to_host(node: &neo4rs::Node) -> Result<Host, StoreError> {
    Ok(Host {
        id: HostId(parse_uuid(&prop_string(node, "id")?)?),
        ip: prop_ip(node, "ip")?,
        hostname: prop_string(node, "hostname")?,
        mac_address: non_empty(prop_string(node, "mac_address")?),
        vendor: non_empty(prop_string(node, "vendor")?),
        os_name: prop_string(node, "os_name")?,
        status: prop_string(node, "status")?.parse()?,
        last_seen: parse_time(&prop_string(node, "last_seen")?)?,
    })
}

fn node_to_port(node: &neo4rs::Node, host_id: HostId) -> Result<NetworkPort, StoreError> {
    Ok(NetworkPort {
        host_id,
        host_ip: prop_ip(node, "host_ip")?,
        port_number: prop_port(node, "port_number")?,
        protocol: prop_string(node, "protocol")?.parse()?,
        service_name: prop_string(node, "service_name")?,
        discovered_at: parse_time(&prop_string(node, "discovered_at")?)?,
    })
}

fn node_to_vulnerability(
    node: &neo4rs::Node,
    host_id: HostId,
) -> Result<Vulnerability, StoreError> {
    Ok(Vulnerability {
        host_id,
        host_ip: prop_ip(node, "host_ip")?,
        port: prop_port(node, "port")?,
        service: prop_string(node, "service")?,
        severity: prop_string(node, "severity")?.parse()?,
        cve: prop_string(node, "cve")?,
        description: prop_string(node, "description")?,
        source: prop_string(node, "source")?,
        discovered_at: parse_time(&prop_string(node, "discovered_at")?)?,
    })
}

fn prop_string(node: &neo4rs::Node, key: &str) -> Result<String, StoreError> {
    node.get::<String>(key)
        .map_err(|e| StoreError::Decode(format!("{key}: {e}")))
}

fn prop_ip(node: &neo4rs::Node, key: &str) -> Result<IpAddr, StoreError> {
    let raw = prop_string(node, key)?;
    raw.parse()
        .map_err(|e| StoreError::Value(HostwatchError::InvalidAddress(e)))
}

fn prop_port(node: &neo4rs::Node, key: &str) -> Result<u16, StoreError> {
    let raw: i64 = node
        .get(key)
        .map_err(|e| StoreError::Decode(format!("{key}: {e}")))?;
    u16::try_from(raw).map_err(|_| StoreError::Decode(format!("{key} out of range: {raw}")))
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Decode(format!("id: {e}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp {s}: {e}")))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub(crate) fn opt_string(opt: &Option<String>) -> String {
    opt.clone().unwrap_or_default()
}
