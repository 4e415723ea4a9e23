//! Startup gate: wait for the inventory schema before scanning.

use std::time::Duration;

use hostwatch_store::InventoryStore;

use crate::clock::Sleeper;
use crate::error::{Result, ScanError};

/// Probe the store until its schema exists, at most `max_retries` times.
///
/// A missing schema and any other store error are retried alike, with the
/// same fixed `delay` between attempts. Returns `ScanError::StoreNotReady`
/// once the attempts are exhausted; callers treat that as fatal.
pub async fn wait_until_ready<S, Z>(
    store: &S,
    max_retries: u32,
    delay: Duration,
    sleeper: &Z,
) -> Result<()>
where
    S: InventoryStore,
    Z: Sleeper,
{
    tracing::info!(max_retries, "Verifying that the inventory schema is ready");

    for attempt in 1..=max_retries {
        match store.schema_ready().await {
            Ok(()) => {
                tracing::info!(attempt, "Inventory schema is ready");
                return Ok(());
            }
            Err(e) if e.is_schema_missing() => {
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_secs = delay.as_secs(),
                    reason = %e,
                    "Inventory schema not ready yet"
                );
            }
            Err(e) => {
                tracing::error!(
                    attempt,
                    max_retries,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Unexpected store error while waiting for schema"
                );
            }
        }

        if attempt < max_retries {
            sleeper.sleep(delay).await;
        }
    }

    tracing::error!(
        attempts = max_retries,
        "Inventory schema did not become available, giving up"
    );
    Err(ScanError::StoreNotReady {
        attempts: max_retries,
    })
}
