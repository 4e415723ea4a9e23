//! Scan scheduling engine.
//!
//! One loop, one cycle at a time: discover the live set, then service-probe
//! and vulnerability-probe each live host in turn. Hosts are processed
//! sequentially, each in its own transactions, so a failing host is rolled
//! back and logged while the cycle moves on. A cycle-level failure (no
//! usable target, discovery error) abandons that cycle only; the next one
//! starts after the usual interval.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use hostwatch_store::InventoryStore;

use crate::clock::Sleeper;
use crate::config::ScannerConfig;
use crate::discovery;
use crate::error::{Result, ScanError};
use crate::gate;
use crate::probe::PortScanProbe;
use crate::service::{self, ProbeOutcome};
use crate::target::ScanTarget;
use crate::vulnerability;

/// Per-host result of one pass through stages 2 and 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostReport {
    pub services: ProbeOutcome,
    pub vulnerabilities: ProbeOutcome,
}

/// Summary of one full cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub live_hosts: usize,
    pub new_hosts: usize,
    /// Hosts whose service scan found them online.
    pub scanned: usize,
    pub offline: usize,
    pub failed: Vec<IpAddr>,
    pub ports: usize,
    pub vulnerabilities: usize,
    pub duration: Duration,
}

/// Drives warm-up, the startup gate and the scan loop.
pub struct ScanScheduler<P, S, Z> {
    config: ScannerConfig,
    probe: P,
    store: S,
    sleeper: Z,
}

impl<P, S, Z> ScanScheduler<P, S, Z>
where
    P: PortScanProbe,
    S: InventoryStore,
    Z: Sleeper,
{
    pub fn new(config: ScannerConfig, probe: P, store: S, sleeper: Z) -> Self {
        Self {
            config,
            probe,
            store,
            sleeper,
        }
    }

    /// Warm up, pass the startup gate, then run cycles forever.
    ///
    /// Only returns if the gate gives up.
    pub async fn run(&self) -> Result<()> {
        self.warm_up().await;
        self.wait_for_store().await?;

        tracing::info!(
            interval_secs = self.config.interval_secs,
            "Scheduler started"
        );

        loop {
            if let Err(e) = self.run_cycle().await {
                tracing::error!(error = %e, "Scan cycle aborted");
            }

            tracing::info!(
                interval_secs = self.config.interval_secs,
                "Scanner sleeping until next cycle"
            );
            self.sleeper.sleep(self.config.interval()).await;
        }
    }

    /// Warm up, pass the startup gate, then run exactly one cycle.
    pub async fn run_once(&self) -> Result<CycleReport> {
        self.warm_up().await;
        self.wait_for_store().await?;
        self.run_cycle().await
    }

    async fn warm_up(&self) {
        let warmup = self.config.warmup();
        if warmup.is_zero() {
            return;
        }
        tracing::info!(
            warmup_secs = self.config.warmup_secs,
            "Waiting for dependent services"
        );
        self.sleeper.sleep(warmup).await;
    }

    /// Block until the inventory schema exists or the retry budget runs out.
    pub async fn wait_for_store(&self) -> Result<()> {
        gate::wait_until_ready(
            &self.store,
            self.config.gate_max_retries,
            self.config.gate_delay(),
            &self.sleeper,
        )
        .await
    }

    /// The configured target, validated.
    pub fn target(&self) -> Result<ScanTarget> {
        self.config
            .target
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ScanError::MissingTarget)?
            .parse()
    }

    /// Run one full cycle: discovery, then stages 2 and 3 for every live host.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let start = Instant::now();
        tracing::info!("Starting new scan cycle");

        let result = self.cycle(start).await;
        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            ok = result.is_ok(),
            "Scan cycle complete"
        );
        result
    }

    async fn cycle(&self, start: Instant) -> Result<CycleReport> {
        let target = self.target()?;
        let discovery = discovery::discover_hosts(&self.probe, &self.store, &target).await?;

        let mut report = CycleReport {
            live_hosts: discovery.live.len(),
            new_hosts: discovery.new_hosts.len(),
            ..Default::default()
        };

        for ip in &discovery.live {
            match self.scan_host(*ip).await {
                Ok(host) => {
                    match host.services {
                        ProbeOutcome::Recorded(n) => {
                            report.scanned += 1;
                            report.ports += n;
                        }
                        ProbeOutcome::Offline => report.offline += 1,
                    }
                    if let ProbeOutcome::Recorded(n) = host.vulnerabilities {
                        report.vulnerabilities += n;
                    }
                    tracing::info!(ip = %ip, "Completed all scans for host");
                }
                Err(e) => {
                    tracing::error!(
                        ip = %ip,
                        error = %e,
                        "Scanning host failed, its changes were rolled back"
                    );
                    report.failed.push(*ip);
                }
            }
        }

        report.duration = start.elapsed();
        tracing::info!(
            target = %target,
            live_hosts = report.live_hosts,
            new_hosts = report.new_hosts,
            scanned = report.scanned,
            offline = report.offline,
            failed = report.failed.len(),
            ports = report.ports,
            vulnerabilities = report.vulnerabilities,
            duration_ms = report.duration.as_millis(),
            "Cycle report"
        );
        Ok(report)
    }

    /// Stage 2 then stage 3 for one host. A stage 2 error skips stage 3.
    pub async fn scan_host(&self, ip: IpAddr) -> Result<HostReport> {
        let services = service::probe_services(&self.probe, &self.store, ip).await?;
        let vulnerabilities = vulnerability::probe_vulnerabilities(
            &self.probe,
            &self.store,
            ip,
            &self.config.source_tag,
        )
        .await?;

        Ok(HostReport {
            services,
            vulnerabilities,
        })
    }
}
