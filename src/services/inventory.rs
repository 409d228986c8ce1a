//! Remote inventory interface consumed by the reconciler

use crate::domain::types::{
    Barcode, InventoryItemId, InventoryLevel, Location, LocationId, SetOutcome, Variant,
};
use async_trait::async_trait;

/// Transport-level failure talking to the inventory service.
///
/// Any of these aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("could not decode {endpoint} response: {reason}")]
    Decode { endpoint: &'static str, reason: String },
}

/// Inventory operations the reconciler needs from the store.
///
/// All list-returning calls follow a "take first" policy on the caller side.
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn list_locations(&self) -> Result<Vec<Location>, ServiceError>;

    async fn find_variants_by_barcode(
        &self,
        barcode: &Barcode,
    ) -> Result<Vec<Variant>, ServiceError>;

    async fn read_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
    ) -> Result<Vec<InventoryLevel>, ServiceError>;

    async fn set_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
        available: i64,
    ) -> Result<SetOutcome, ServiceError>;
}
