//! Services - stock sync logic
//!
//! - `inventory` - store interface consumed by the reconciler
//! - `reconciler` - per-row lookup/read/write and tally
//! - `sync_run` - one full run from uploaded bytes to report

pub mod inventory;
pub mod reconciler;
pub mod sync_run;

#[cfg(test)]
pub(crate) mod fake;

// Re-export commonly used types
pub use inventory::{InventoryService, ServiceError};
pub use reconciler::{resolve_default_location, InventoryReconciler, SyncError};
pub use sync_run::{run_sync, SyncReport, ABORTED_MESSAGE};
