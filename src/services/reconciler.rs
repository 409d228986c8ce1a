//! Row reconciliation - decrements remote stock for each sold row
//!
//! A run resolves one location, then walks the rows strictly in order:
//! variant lookup by barcode, read of the current level, write of the
//! clamped new level. Row-level misses are tallied; transport faults abort
//! the run without a partial result.

use crate::domain::types::{
    new_available, InventoryItemId, Location, ReconciliationResult, SaleRow, SetOutcome,
};
use crate::io::sales_sheet::SheetError;
use crate::services::inventory::{InventoryService, ServiceError};
use tracing::{debug, info, warn};

/// Run-level failure. No tally is produced when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("store has no locations")]
    NoLocations,
    #[error(transparent)]
    Transport(#[from] ServiceError),
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// What happened to a single row
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowOutcome {
    Updated { item: InventoryItemId, from: i64, to: i64 },
    NoVariant,
    NoLevel { item: InventoryItemId },
    Rejected { item: InventoryItemId, status: u16, reason: String },
}

/// Pick the location every row of the run is written against.
///
/// Lists locations once and takes the first one.
pub async fn resolve_default_location<S>(service: &S) -> Result<Location, SyncError>
where
    S: InventoryService + ?Sized,
{
    let location =
        service.list_locations().await?.into_iter().next().ok_or(SyncError::NoLocations)?;
    info!(location_id = %location.id, name = ?location.name, "location_resolved");
    Ok(location)
}

pub struct InventoryReconciler<'a, S: InventoryService + ?Sized> {
    service: &'a S,
}

impl<'a, S: InventoryService + ?Sized> InventoryReconciler<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Apply every row against `location`, one at a time.
    ///
    /// Every row lands in exactly one of the two counters.
    pub async fn reconcile(
        &self,
        rows: &[SaleRow],
        location: &Location,
    ) -> Result<ReconciliationResult, SyncError> {
        let mut result = ReconciliationResult::default();

        for row in rows {
            match self.process_row(row, location).await? {
                RowOutcome::Updated { item, from, to } => {
                    result.success_count += 1;
                    debug!(
                        barcode = %row.barcode,
                        inventory_item_id = %item,
                        sold = row.sold_quantity,
                        from = from,
                        to = to,
                        "row_updated"
                    );
                }
                RowOutcome::NoVariant => {
                    result.error_count += 1;
                    warn!(barcode = %row.barcode, "row_lookup_miss");
                }
                RowOutcome::NoLevel { item } => {
                    result.error_count += 1;
                    warn!(
                        barcode = %row.barcode,
                        inventory_item_id = %item,
                        location_id = %location.id,
                        "row_not_stocked_at_location"
                    );
                }
                RowOutcome::Rejected { item, status, reason } => {
                    result.error_count += 1;
                    warn!(
                        barcode = %row.barcode,
                        inventory_item_id = %item,
                        status = status,
                        reason = %reason,
                        "row_write_rejected"
                    );
                }
            }
        }

        info!(
            rows = rows.len(),
            updated = result.success_count,
            failed = result.error_count,
            "reconcile_finished"
        );
        Ok(result)
    }

    async fn process_row(
        &self,
        row: &SaleRow,
        location: &Location,
    ) -> Result<RowOutcome, ServiceError> {
        let Some(variant) =
            self.service.find_variants_by_barcode(&row.barcode).await?.into_iter().next()
        else {
            return Ok(RowOutcome::NoVariant);
        };
        let item = variant.inventory_item_id;

        let Some(level) = self.service.read_available(item, location.id).await?.into_iter().next()
        else {
            return Ok(RowOutcome::NoLevel { item });
        };

        let target = new_available(level.available, row.sold_quantity);
        match self.service.set_available(item, location.id, target).await? {
            SetOutcome::Applied { available } => {
                Ok(RowOutcome::Updated { item, from: level.available, to: available })
            }
            SetOutcome::Rejected { status, reason } => {
                Ok(RowOutcome::Rejected { item, status, reason })
            }
        }
    }
}
