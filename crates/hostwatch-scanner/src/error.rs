//! Error types for the hostwatch-scanner crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Nmap not found at path: {path}")]
    NmapNotFound { path: String },

    #[error("Nmap exited with code {code}: {stderr}")]
    NmapFailed { code: i32, stderr: String },

    #[error("Failed to parse nmap XML output: {0}")]
    XmlParse(String),

    #[error("Store error: {0}")]
    Store(#[from] hostwatch_store::StoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("No scan target configured (set scanner.target or SCAN_TARGET_CIDR)")]
    MissingTarget,

    #[error("Invalid scan target {target:?}: expected a CIDR network or IP address")]
    InvalidTarget { target: String },

    #[error("Inventory store not ready after {attempts} attempts")]
    StoreNotReady { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
