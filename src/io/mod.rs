//! IO modules - external system interfaces
//!
//! - `sales_sheet` - workbook/CSV parsing of the daily sales export
//! - `shopify` - Admin REST client for the store
//! - `upload` - HTTP upload gateway (hyper)

pub mod sales_sheet;
pub mod shopify;
pub mod upload;

// Re-export commonly used types
pub use sales_sheet::{parse_sales_sheet, SalesSheet, SheetError, SheetLayout};
pub use shopify::ShopifyClient;
pub use upload::{serve, start_upload_server, GatewayState};
