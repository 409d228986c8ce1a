//! Domain models - sale rows, store entities and run results
//!
//! - `SaleRow` - one validated line of the daily sales sheet
//! - `Location`, `Variant`, `InventoryLevel` - store entities, request-scoped
//! - `ReconciliationResult` - per-run tally

pub mod types;

pub use types::{
    Barcode, InventoryItemId, InventoryLevel, Location, LocationId, ReconciliationResult,
    RowError, RowErrorKind, SaleRow, SetOutcome, Variant,
};
