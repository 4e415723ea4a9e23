//! hostwatch-scanner: continuous network inventory.
//!
//! Wraps nmap to sweep a target range, fingerprint each live host and pull
//! vulnerability findings from script output, reconciling all three into
//! the inventory store on a fixed schedule.

pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gate;
pub mod nmap_xml;
pub mod persist;
pub mod probe;
pub mod scheduler;
pub mod service;
pub mod target;
pub mod vulnerability;
pub mod vulners;
