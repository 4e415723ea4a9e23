//! hostwatch-store: transactional persistence for the host inventory.
//!
//! The scan engine is written against the `InventoryStore` / `InventoryTxn`
//! traits. `Neo4jStore` is the production backend; `MemoryStore` keeps the
//! same semantics in process.

pub mod client;
pub mod gateway;
pub mod memory;
pub mod mutations;
pub mod queries;

pub use client::{Neo4jStore, StoreConfig, StoreError};
pub use gateway::{InventoryStore, InventoryTxn};
pub use memory::{Inventory, MemoryStore, MemoryTxn, WriteOp};
pub use mutations::{Neo4jTxn, HOST_IP_CONSTRAINT};
