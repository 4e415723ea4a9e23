//! Neo4j connection management and the shared store client.

use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

use hostwatch_core::HostwatchError;

/// Errors from inventory store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Schema object not present yet: {0}")]
    SchemaMissing(String),

    #[error("Host not found: {host}")]
    HostNotFound { host: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode stored record: {0}")]
    Decode(String),

    #[error(transparent)]
    Value(#[from] HostwatchError),
}

impl StoreError {
    /// True when the store answered but the schema has not been created.
    pub fn is_schema_missing(&self) -> bool {
        matches!(self, Self::SchemaMissing(_))
    }
}

/// Configuration for connecting to Neo4j.
///
/// Loaded from the `[neo4j]` section of `hostwatch.toml` or `HOSTWATCH__NEO4J__*`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "hostwatch-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Neo4j-backed inventory store with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect to Neo4j with the given configuration.
    ///
    /// Only the connection pool is established here; whether the schema
    /// exists is checked separately through `schema_ready`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Get a reference to the underlying neo4rs Graph for direct operations.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Execute a write-only query outside any explicit transaction.
    pub async fn run(&self, query: Query) -> Result<(), StoreError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, StoreError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, StoreError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }
}
