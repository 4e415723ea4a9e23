//! Configuration for the hostwatch scanner daemon.

use std::time::Duration;

use serde::Deserialize;

use hostwatch_store::StoreConfig;

use crate::error::{Result, ScanError};

/// Source tag written on every vulnerability this scanner produces.
pub const DEFAULT_SOURCE_TAG: &str = "scan-engine";

/// Environment variable honoured when `scanner.target` is not configured.
pub const LEGACY_TARGET_ENV: &str = "SCAN_TARGET_CIDR";

/// Whole-process configuration.
///
/// Loaded from `hostwatch.toml` (`[scanner]` and `[neo4j]` sections) layered
/// under `HOSTWATCH__SCANNER__*` / `HOSTWATCH__NEO4J__*` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub neo4j: StoreConfig,
}

/// Scanner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Path to the nmap binary (default: "nmap").
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Address range to inventory (CIDR or single IP). No default.
    #[serde(default)]
    pub target: Option<String>,

    /// Delay before the first readiness probe, giving dependencies time to start.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,

    /// Readiness probes attempted before giving up.
    #[serde(default = "default_gate_max_retries")]
    pub gate_max_retries: u32,

    /// Fixed delay between readiness probes.
    #[serde(default = "default_gate_delay_secs")]
    pub gate_delay_secs: u64,

    /// Sleep between the end of one cycle and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Source tag scoping vulnerability replacement.
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
}

/// The three nmap invocations the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Ping sweep, no port detail: `-sn`
    Sweep,
    /// Service versions and OS fingerprint, no ping gating: `-sV -O -Pn`
    Service,
    /// Vulnerability scripts on detected services: `-sV --script vuln -Pn`
    Vulnerability,
}

impl ScanMode {
    /// Return the nmap flags for this mode.
    pub fn nmap_flags(&self) -> Vec<&'static str> {
        match self {
            Self::Sweep => vec!["-sn", "-T4"],
            Self::Service => vec!["-sV", "-O", "-T4", "-Pn"],
            Self::Vulnerability => vec!["-sV", "--script", "vuln", "-T4", "-Pn"],
        }
    }
}

impl ScannerConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn gate_delay(&self) -> Duration {
        Duration::from_secs(self.gate_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Fill `target` from the legacy environment variable if unset.
    pub fn with_legacy_target(mut self) -> Self {
        if self.target.is_none() {
            self.target = std::env::var(LEGACY_TARGET_ENV)
                .ok()
                .filter(|t| !t.trim().is_empty());
        }
        self
    }
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_warmup_secs() -> u64 {
    15
}

fn default_gate_max_retries() -> u32 {
    15
}

fn default_gate_delay_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    1800
}

fn default_source_tag() -> String {
    DEFAULT_SOURCE_TAG.to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            target: None,
            warmup_secs: default_warmup_secs(),
            gate_max_retries: default_gate_max_retries(),
            gate_delay_secs: default_gate_delay_secs(),
            interval_secs: default_interval_secs(),
            source_tag: default_source_tag(),
        }
    }
}

/// Load configuration from `<file_prefix>.toml` (optional) and the environment.
pub fn load(file_prefix: &str) -> Result<AppConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("HOSTWATCH")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ScanError::Config(e.to_string()))?;

    let mut app: AppConfig = cfg
        .try_deserialize()
        .map_err(|e| ScanError::Config(e.to_string()))?;
    app.scanner = app.scanner.with_legacy_target();
    Ok(app)
}
