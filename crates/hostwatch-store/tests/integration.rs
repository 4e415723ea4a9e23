//! Integration tests for hostwatch-store against a live Neo4j instance.
//!
//! These tests require a Neo4j server on bolt://localhost:7687.
//! Run with: cargo test --package hostwatch-store --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available.

use std::net::IpAddr;

use chrono::Utc;
use hostwatch_core::{Host, HostDetails, HostStatus, NetworkPort, Protocol, Severity, Vulnerability};
use hostwatch_store::{InventoryStore, InventoryTxn, Neo4jStore, StoreConfig};

async fn connect_or_skip() -> Option<Neo4jStore> {
    let config = StoreConfig::default();
    match Neo4jStore::connect(&config).await {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

/// Each test works in its own documentation range (RFC 5737) so runs don't collide.
async fn cleanup(store: &Neo4jStore, prefix: &str) {
    let q = neo4rs::query("MATCH (h:Host) WHERE h.ip STARTS WITH $prefix DETACH DELETE h")
        .param("prefix", prefix.to_string());
    let _ = store.run(q).await;
    let q = neo4rs::query("MATCH (n) WHERE n.host_ip STARTS WITH $prefix DETACH DELETE n")
        .param("prefix", prefix.to_string());
    let _ = store.run(q).await;
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package hostwatch-store --test integration -- --ignored"]
async fn test_schema_ready_after_ensure() {
    let Some(store) = connect_or_skip().await else {
        return;
    };

    store.ensure_schema().await.unwrap();
    store.schema_ready().await.unwrap();

    // Idempotent.
    store.ensure_schema().await.unwrap();
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package hostwatch-store --test integration -- --ignored"]
async fn test_insert_and_find_host() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    store.ensure_schema().await.unwrap();
    cleanup(&store, "192.0.2.").await;

    let host = Host::discovered(ip("192.0.2.10"), Utc::now());
    let mut txn = store.begin().await.unwrap();
    txn.insert_host(&host).await.unwrap();
    txn.commit().await.unwrap();

    let found = store.find_host(ip("192.0.2.10")).await.unwrap().unwrap();
    assert_eq!(found.id, host.id);
    assert_eq!(found.status, HostStatus::Up);
    assert_eq!(found.hostname, "N/A");
    assert!(found.mac_address.is_none());

    cleanup(&store, "192.0.2.").await;
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package hostwatch-store --test integration -- --ignored"]
async fn test_rollback_discards_host() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    store.ensure_schema().await.unwrap();
    cleanup(&store, "198.51.100.").await;

    let mut txn = store.begin().await.unwrap();
    txn.insert_host(&Host::discovered(ip("198.51.100.7"), Utc::now()))
        .await
        .unwrap();
    txn.rollback().await.unwrap();

    assert!(store.find_host(ip("198.51.100.7")).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package hostwatch-store --test integration -- --ignored"]
async fn test_replace_ports_and_vulnerabilities() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    store.ensure_schema().await.unwrap();
    cleanup(&store, "203.0.113.").await;

    let host_ip = ip("203.0.113.5");
    let host = Host::discovered(host_ip, Utc::now());
    let host_id = host.id;

    let port = |number: u16| NetworkPort {
        host_id,
        host_ip,
        port_number: number,
        protocol: Protocol::Tcp,
        service_name: "OpenSSH 9.6".to_string(),
        discovered_at: Utc::now(),
    };
    let vuln = |source: &str| Vulnerability {
        host_id,
        host_ip,
        port: 22,
        service: "OpenSSH 9.6".to_string(),
        severity: Severity::High,
        cve: "CVE-2024-6387".to_string(),
        description: "CVE-2024-6387 regreSSHion".to_string(),
        source: source.to_string(),
        discovered_at: Utc::now(),
    };

    let mut txn = store.begin().await.unwrap();
    txn.insert_host(&host).await.unwrap();
    txn.insert_ports(&[port(22), port(80)]).await.unwrap();
    txn.insert_vulnerabilities(&[vuln("scan-engine"), vuln("manual")])
        .await
        .unwrap();
    txn.commit().await.unwrap();

    let mut txn = store.begin().await.unwrap();
    txn.update_host_details(
        host_id,
        &HostDetails {
            hostname: "bastion.local".to_string(),
            mac_address: Some("AA:BB:CC:DD:EE:05".to_string()),
            vendor: None,
            os_name: "Linux 6.1".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(txn.delete_ports(host_id).await.unwrap(), 2);
    txn.insert_ports(&[port(443)]).await.unwrap();
    assert_eq!(
        txn.delete_vulnerabilities(host_id, "scan-engine").await.unwrap(),
        1
    );
    txn.commit().await.unwrap();

    let ports = store.list_ports(host_id).await.unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port_number, 443);

    let vulns = store.list_vulnerabilities(host_id).await.unwrap();
    assert_eq!(vulns.len(), 1);
    assert_eq!(vulns[0].source, "manual");

    let found = store.find_host(host_ip).await.unwrap().unwrap();
    assert_eq!(found.hostname, "bastion.local");
    assert_eq!(found.mac_address.as_deref(), Some("AA:BB:CC:DD:EE:05"));

    cleanup(&store, "203.0.113.").await;
}
