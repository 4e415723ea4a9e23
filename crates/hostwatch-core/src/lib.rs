//! hostwatch-core: Shared inventory types and error handling.
//!
//! This crate provides the records every hostwatch component agrees on:
//! - `Host`, identified by IP, with its liveness status and fingerprint
//! - `NetworkPort` and `Vulnerability`, both owned by a host
//! - `Severity` tiers and their score thresholds

pub mod error;
pub mod types;

pub use error::HostwatchError;
pub use types::{
    Host, HostDetails, HostId, HostStatus, NetworkPort, Protocol, Severity, Vulnerability,
    PLACEHOLDER_HOSTNAME, UNKNOWN_OS,
};
