//! Transaction scope helpers shared by the pipeline stages.
//!
//! Each stage opens exactly one transaction, does its writes, and hands the
//! outcome to `finish`: success commits, failure rolls back and returns the
//! original error.

use hostwatch_store::InventoryTxn;

use crate::error::Result;

/// Commit `txn` if `outcome` is Ok, otherwise roll it back.
pub async fn finish<T, R>(txn: T, outcome: Result<R>) -> Result<R>
where
    T: InventoryTxn,
{
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}
