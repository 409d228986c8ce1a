//! One stock sync run: parse the sheet, resolve the location, reconcile

use crate::domain::types::{ReconciliationResult, RowError};
use crate::infra::metrics::Metrics;
use crate::io::sales_sheet::{parse_sales_sheet, SheetLayout};
use crate::services::inventory::InventoryService;
use crate::services::reconciler::{resolve_default_location, InventoryReconciler, SyncError};
use std::fmt;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Shown to the operator when a run aborts. Partial counts are never reported.
pub const ABORTED_MESSAGE: &str = "Stock update failed; no results were recorded for this upload.";

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub result: ReconciliationResult,
    /// Rows the sheet parser turned away before reconciliation
    pub rejected: Vec<RowError>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)?;
        match self.rejected.len() {
            0 => Ok(()),
            1 => write!(f, ", 1 row rejected"),
            n => write!(f, ", {n} rows rejected"),
        }
    }
}

/// Execute one run against `service`.
///
/// Returns `Err` when the sheet is unreadable, the store has no locations,
/// or any store call fails at the transport level.
pub async fn run_sync<S>(
    service: &S,
    sheet_bytes: &[u8],
    layout: &SheetLayout,
    metrics: &Metrics,
) -> Result<SyncReport, SyncError>
where
    S: InventoryService + ?Sized,
{
    let run_id = Uuid::now_v7();
    let span = info_span!("sync_run", run_id = %run_id);

    async move {
        let start = Instant::now();
        metrics.record_run_started();
        info!(bytes = sheet_bytes.len(), "run_started");

        match execute(service, sheet_bytes, layout).await {
            Ok((result, rejected)) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                metrics.record_run_completed(&result, rejected.len(), duration_ms);
                info!(
                    updated = result.success_count,
                    failed = result.error_count,
                    rejected = rejected.len(),
                    duration_ms = duration_ms,
                    "run_completed"
                );
                Ok(SyncReport { run_id, result, rejected })
            }
            Err(e) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                metrics.record_run_aborted(duration_ms);
                error!(error = %e, duration_ms = duration_ms, "run_aborted");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

async fn execute<S>(
    service: &S,
    sheet_bytes: &[u8],
    layout: &SheetLayout,
) -> Result<(ReconciliationResult, Vec<RowError>), SyncError>
where
    S: InventoryService + ?Sized,
{
    let sheet = parse_sales_sheet(sheet_bytes, layout)?;
    for rejected in &sheet.rejected {
        info!(line = rejected.line, reason = %rejected.kind, "sheet_row_rejected");
    }

    let location = resolve_default_location(service).await?;
    let result = InventoryReconciler::new(service).reconcile(&sheet.rows, &location).await?;
    Ok((result, sheet.rejected))
}
