//! Extraction of vulnerability records from `vulners` script output.
//!
//! Each line mentioning a CVE becomes one record. The line's first token is
//! read as the score; anything non-numeric there yields `Severity::Info`.
//! Lines are never merged, so a CVE listed twice yields two records.

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use hostwatch_core::{HostId, Severity, Vulnerability};

use crate::probe::HostScan;

/// NSE script whose output carries the vulnerability feed.
pub const VULNERS_SCRIPT: &str = "vulners";

const CVE_PREFIX: &str = "CVE-";

/// A single classified line of script output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub cve: String,
    pub severity: Severity,
    /// Every token after the first, single-space joined. Includes the CVE id.
    pub description: String,
}

/// Classify one line of script output; `None` if it names no CVE.
pub fn parse_line(line: &str) -> Option<Finding> {
    if !line.contains(CVE_PREFIX) {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let cve = parts.iter().find(|p| p.starts_with(CVE_PREFIX))?;

    let severity = parts
        .first()
        .and_then(|first| first.parse::<f64>().ok())
        .map(Severity::from_score)
        .unwrap_or(Severity::Info);

    Some(Finding {
        cve: cve.to_string(),
        severity,
        description: parts[1..].join(" "),
    })
}

/// All findings in a script output blob, in line order.
pub fn parse_output(output: &str) -> Vec<Finding> {
    output.lines().filter_map(parse_line).collect()
}

/// Build vulnerability records for every open tcp/udp port carrying vulners output.
pub fn parse_vulnerabilities(
    scan: &HostScan,
    host_ip: IpAddr,
    host_id: HostId,
    source: &str,
    now: DateTime<Utc>,
) -> Vec<Vulnerability> {
    let mut records = Vec::new();

    for (_, port, port_scan) in scan.open_ports() {
        let Some(output) = port_scan.scripts.get(VULNERS_SCRIPT) else {
            continue;
        };
        let service = port_scan.service_name();

        records.extend(parse_output(output).into_iter().map(|f| Vulnerability {
            host_id,
            host_ip,
            port,
            service: service.clone(),
            severity: f.severity,
            cve: f.cve,
            description: f.description,
            source: source.to_string(),
            discovered_at: now,
        }));
    }

    records
}
