//! In-memory inventory service for unit tests

use crate::domain::types::{
    Barcode, InventoryItemId, InventoryLevel, Location, LocationId, SetOutcome, Variant,
};
use crate::services::inventory::{InventoryService, ServiceError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Recorded `set_available` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCall {
    pub item: InventoryItemId,
    pub location: LocationId,
    pub available: i64,
}

#[derive(Default)]
pub struct FakeStore {
    pub locations: Vec<Location>,
    /// barcode -> (inventory item, available at the default location)
    stock: HashMap<String, (InventoryItemId, i64)>,
    /// barcode -> item with a variant but no level at any location
    unstocked: HashMap<String, InventoryItemId>,
    /// barcodes whose lookup raises a transport fault
    broken: Vec<String>,
    /// items whose write is rejected with 422
    reject_writes: Vec<InventoryItemId>,
    /// items whose level read raises a transport fault
    broken_reads: Vec<InventoryItemId>,
    /// items whose write raises a transport fault
    broken_writes: Vec<InventoryItemId>,
    pub list_locations_calls: Mutex<u32>,
    pub set_calls: Mutex<Vec<SetCall>>,
}

impl FakeStore {
    pub fn with_location(id: i64) -> Self {
        Self {
            locations: vec![Location { id: LocationId(id), name: Some("Main".to_string()) }],
            ..Default::default()
        }
    }

    pub fn without_locations() -> Self {
        Self::default()
    }

    pub fn with_stock(mut self, barcode: &str, item: i64, available: i64) -> Self {
        self.stock.insert(barcode.to_string(), (InventoryItemId(item), available));
        self
    }

    pub fn with_unstocked(mut self, barcode: &str, item: i64) -> Self {
        self.unstocked.insert(barcode.to_string(), InventoryItemId(item));
        self
    }

    pub fn with_broken_lookup(mut self, barcode: &str) -> Self {
        self.broken.push(barcode.to_string());
        self
    }

    pub fn with_rejected_write(mut self, item: i64) -> Self {
        self.reject_writes.push(InventoryItemId(item));
        self
    }

    pub fn with_broken_read(mut self, item: i64) -> Self {
        self.broken_reads.push(InventoryItemId(item));
        self
    }

    pub fn with_broken_write(mut self, item: i64) -> Self {
        self.broken_writes.push(InventoryItemId(item));
        self
    }

    pub fn set_calls(&self) -> Vec<SetCall> {
        self.set_calls.lock().clone()
    }

    pub fn list_locations_calls(&self) -> u32 {
        *self.list_locations_calls.lock()
    }
}

#[async_trait]
impl InventoryService for FakeStore {
    async fn list_locations(&self) -> Result<Vec<Location>, ServiceError> {
        *self.list_locations_calls.lock() += 1;
        Ok(self.locations.clone())
    }

    async fn find_variants_by_barcode(
        &self,
        barcode: &Barcode,
    ) -> Result<Vec<Variant>, ServiceError> {
        if self.broken.iter().any(|b| b == barcode.as_str()) {
            return Err(ServiceError::Status { endpoint: "variants", status: 503 });
        }
        let item = self
            .stock
            .get(barcode.as_str())
            .map(|(item, _)| *item)
            .or_else(|| self.unstocked.get(barcode.as_str()).copied());
        Ok(item
            .map(|item| Variant {
                id: item.0 + 1000,
                barcode: Some(barcode.to_string()),
                inventory_item_id: item,
            })
            .into_iter()
            .collect())
    }

    async fn read_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
    ) -> Result<Vec<InventoryLevel>, ServiceError> {
        if self.broken_reads.contains(&item) {
            return Err(ServiceError::Decode {
                endpoint: "inventory_levels",
                reason: "unexpected end of input".to_string(),
            });
        }
        Ok(self
            .stock
            .values()
            .filter(|(id, _)| *id == item)
            .map(|(id, available)| InventoryLevel {
                inventory_item_id: *id,
                location_id: location,
                available: *available,
            })
            .collect())
    }

    async fn set_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
        available: i64,
    ) -> Result<SetOutcome, ServiceError> {
        self.set_calls.lock().push(SetCall { item, location, available });
        if self.broken_writes.contains(&item) {
            return Err(ServiceError::Status { endpoint: "inventory_levels/set", status: 503 });
        }
        if self.reject_writes.contains(&item) {
            return Ok(SetOutcome::Rejected { status: 422, reason: "not stocked".to_string() });
        }
        Ok(SetOutcome::Applied { available })
    }
}
