//! Shared types for stock sync runs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical digit-string form of a product barcode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Barcode(String);

impl Barcode {
    /// Canonicalize a raw spreadsheet cell into a barcode.
    ///
    /// Numeric cells often come out of spreadsheet exports as floats
    /// (`7290001234567.0`, `7.290001234567E+12`). Those are read back as the
    /// whole number they denote. Otherwise every non-digit character is
    /// stripped; plain digit strings keep their leading zeros. Returns `None`
    /// when no digits are left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits = whole_number(trimmed)
            .unwrap_or_else(|| trimmed.chars().filter(char::is_ascii_digit).collect());

        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Float notation (`123.0`, `1.23E+2`) denoting a non-negative whole number
fn whole_number(text: &str) -> Option<String> {
    if let Some((int, frac)) = text.split_once('.') {
        let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if is_digits(int) && frac.bytes().all(|b| b == b'0') {
            return Some(int.to_string());
        }
    }
    if !text.contains(|c| c == 'e' || c == 'E') {
        return None;
    }

    let value = text.parse::<f64>().ok()?;
    // Above 2^53 the float no longer pins down a single integer
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < 9_007_199_254_740_992.0
    {
        Some((value as u64).to_string())
    } else {
        None
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Newtype wrapper for remote location IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub i64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for remote inventory item IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(pub i64);

impl fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One line of the daily sales sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRow {
    pub barcode: Barcode,
    pub sold_quantity: u64,
}

impl SaleRow {
    pub fn new(barcode: Barcode, sold_quantity: u64) -> Self {
        Self { barcode, sold_quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    #[serde(default)]
    pub barcode: Option<String>,
    pub inventory_item_id: InventoryItemId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub inventory_item_id: InventoryItemId,
    pub location_id: LocationId,
    /// `null` on the wire when the item is not tracked; read as zero
    #[serde(default, deserialize_with = "deserialize_available")]
    pub available: i64,
}

fn deserialize_available<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Result of an inventory-level write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// Remote accepted the write; carries the level it now reports
    Applied { available: i64 },
    /// Remote answered with a non-success status
    Rejected { status: u16, reason: String },
}

impl SetOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SetOutcome::Applied { .. })
    }
}

/// Stock level after a sale. Never negative: overselling clamps to zero.
#[inline]
pub fn new_available(current: i64, sold: u64) -> i64 {
    let sold = i64::try_from(sold).unwrap_or(i64::MAX);
    current.saturating_sub(sold).max(0)
}

/// Per-run tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub success_count: u64,
    pub error_count: u64,
}

impl ReconciliationResult {
    pub fn rows_processed(&self) -> u64 {
        self.success_count + self.error_count
    }
}

impl fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} updated, {} failed", self.success_count, self.error_count)
    }
}

/// Why the sheet parser rejected a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowErrorKind {
    MissingBarcode,
    MissingQuantity,
    InvalidBarcode(String),
    InvalidQuantity(String),
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowErrorKind::MissingBarcode => f.write_str("missing barcode"),
            RowErrorKind::MissingQuantity => f.write_str("missing quantity"),
            RowErrorKind::InvalidBarcode(raw) => write!(f, "invalid barcode {raw:?}"),
            RowErrorKind::InvalidQuantity(raw) => write!(f, "invalid quantity {raw:?}"),
        }
    }
}

/// A sheet row that never reached reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line number in the uploaded file
    pub line: usize,
    pub kind: RowErrorKind,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}
