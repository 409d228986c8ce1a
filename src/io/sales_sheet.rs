//! Daily sales sheet parsing
//!
//! The point-of-sale export comes either as an Excel workbook (first
//! worksheet) or as a CSV file, with a few banner lines above the header
//! row. Only two columns matter: the barcode and the quantity sold.
//! Rows are validated into typed `SaleRow`s; anything that does not validate
//! is reported back as a `RowError` instead of being dropped.
//!
//! `skip_rows` counts physical rows of the file, blank ones included.

use crate::domain::types::{Barcode, RowError, RowErrorKind, SaleRow};
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;
use tracing::debug;

/// Header of the barcode column in the store's export
pub const DEFAULT_BARCODE_COLUMN: &str = "ברקוד";
/// Header of the quantity column in the store's export
pub const DEFAULT_QUANTITY_COLUMN: &str = "כמות פריטים שנמכרו";
/// Banner lines above the header row in the store's export
pub const DEFAULT_SKIP_ROWS: usize = 4;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
/// Local file header of a zip archive, which every .xlsx is
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Where to find the data in an uploaded sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub skip_rows: usize,
    pub barcode_column: String,
    pub quantity_column: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            skip_rows: DEFAULT_SKIP_ROWS,
            barcode_column: DEFAULT_BARCODE_COLUMN.to_string(),
            quantity_column: DEFAULT_QUANTITY_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("sheet is not readable CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook is not readable: {0}")]
    Workbook(String),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("sheet ended before the header row (expected after {skip_rows} skipped rows)")]
    MissingHeader { skip_rows: usize },
    #[error("header row has no {0:?} column")]
    MissingColumn(String),
}

/// Validated content of one uploaded sheet
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SalesSheet {
    pub rows: Vec<SaleRow>,
    pub rejected: Vec<RowError>,
}

/// One physical row of the file, cells as text
struct SheetRow {
    /// 1-based line (CSV) or row number (workbook)
    line: usize,
    cells: Vec<String>,
}

impl SheetRow {
    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    fn cell(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(|c| c.trim()).filter(|v| !v.is_empty())
    }
}

/// Parse an uploaded sheet into sale rows and rejected rows.
///
/// Workbooks are recognized by their zip signature; anything else is read
/// as CSV.
pub fn parse_sales_sheet(bytes: &[u8], layout: &SheetLayout) -> Result<SalesSheet, SheetError> {
    let rows = if bytes.starts_with(ZIP_MAGIC) { workbook_rows(bytes)? } else { csv_rows(bytes)? };
    collect_sales(rows, layout)
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<SheetRow>, SheetError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader =
        csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(bytes);

    // The reader drops empty lines, but positions keep counting them
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or_default();
        rows.push(SheetRow { line, cells: record.iter().map(str::to_string).collect() });
    }
    Ok(rows)
}

fn workbook_rows(bytes: &[u8]) -> Result<Vec<SheetRow>, SheetError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| SheetError::Workbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)?
        .map_err(|e| SheetError::Workbook(e.to_string()))?;

    // The range starts at the first used cell, not at A1
    let Some((first_row, _)) = range.start() else {
        return Ok(Vec::new());
    };
    Ok(range
        .rows()
        .enumerate()
        .map(|(i, cells)| SheetRow {
            line: first_row as usize + i + 1,
            cells: cells.iter().map(cell_text).collect(),
        })
        .collect())
}

/// Whole numbers print without a fraction so barcodes and quantities
/// stored as numeric cells read the same as their CSV form
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e18 => {
            (*f as i64).to_string()
        }
        other => other.to_string(),
    }
}

fn collect_sales(rows: Vec<SheetRow>, layout: &SheetLayout) -> Result<SalesSheet, SheetError> {
    let mut rows = rows.into_iter().filter(|row| row.line > layout.skip_rows);

    let header = rows
        .find(|row| !row.is_blank())
        .ok_or(SheetError::MissingHeader { skip_rows: layout.skip_rows })?;
    let barcode_idx = column_index(&header, &layout.barcode_column)?;
    let quantity_idx = column_index(&header, &layout.quantity_column)?;

    let mut sheet = SalesSheet::default();
    for row in rows {
        match parse_row(row.cell(barcode_idx), row.cell(quantity_idx)) {
            Ok(Some(sale)) => sheet.rows.push(sale),
            Ok(None) => {}
            Err(kind) => {
                debug!(line = row.line, reason = %kind, "sheet_row_rejected");
                sheet.rejected.push(RowError { line: row.line, kind });
            }
        }
    }

    debug!(rows = sheet.rows.len(), rejected = sheet.rejected.len(), "sheet_parsed");
    Ok(sheet)
}

fn column_index(header: &SheetRow, name: &str) -> Result<usize, SheetError> {
    header
        .cells
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        .ok_or_else(|| SheetError::MissingColumn(name.to_string()))
}

/// `Ok(None)` for a blank row, which is skipped without a report
fn parse_row(
    barcode: Option<&str>,
    quantity: Option<&str>,
) -> Result<Option<SaleRow>, RowErrorKind> {
    let (barcode, quantity) = match (barcode, quantity) {
        (None, None) => return Ok(None),
        (None, Some(_)) => return Err(RowErrorKind::MissingBarcode),
        (Some(_), None) => return Err(RowErrorKind::MissingQuantity),
        (Some(b), Some(q)) => (b, q),
    };

    let barcode =
        Barcode::parse(barcode).ok_or_else(|| RowErrorKind::InvalidBarcode(barcode.to_string()))?;
    let sold_quantity = parse_quantity(quantity)
        .ok_or_else(|| RowErrorKind::InvalidQuantity(quantity.to_string()))?;

    Ok(Some(SaleRow::new(barcode, sold_quantity)))
}

/// Accepts plain integers and whole floats such as `3.0`
fn parse_quantity(raw: &str) -> Option<u64> {
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> SheetLayout {
        SheetLayout {
            skip_rows: 2,
            barcode_column: "Barcode".to_string(),
            quantity_column: "Sold".to_string(),
        }
    }

    #[test]
    fn test_parse_skips_banner_rows() {
        let csv = "Daily sales report\nBranch 3\nName,Barcode,Sold\nShirt,111,2\nHat,222.0,1\n";

        let sheet = parse_sales_sheet(csv.as_bytes(), &layout()).unwrap();

        assert_eq!(
            sheet.rows,
            vec![
                SaleRow::new(Barcode::parse("111").unwrap(), 2),
                SaleRow::new(Barcode::parse("222").unwrap(), 1),
            ]
        );
        assert!(sheet.rejected.is_empty());
    }

    #[test]
    fn test_parse_default_layout_headers() {
        let csv = "a\nb\nc\nd\nשם,ברקוד,כמות פריטים שנמכרו\nחולצה,7290001234567,3\n";

        let sheet = parse_sales_sheet(csv.as_bytes(), &SheetLayout::default()).unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].barcode.as_str(), "7290001234567");
        assert_eq!(sheet.rows[0].sold_quantity, 3);
    }

    #[test]
    fn test_parse_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"Barcode,Sold\n333,4\n");
        let layout = SheetLayout { skip_rows: 0, ..layout() };

        let sheet = parse_sales_sheet(&bytes, &layout).unwrap();

        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_rows_with_line_numbers() {
        let csv = "x\ny\nBarcode,Sold\n111,2\n,3\n222,\n333,abc\n444,-1\n555,2.5\n---,1\n";

        let sheet = parse_sales_sheet(csv.as_bytes(), &layout()).unwrap();

        assert_eq!(sheet.rows.len(), 1);
        let kinds: Vec<(usize, RowErrorKind)> =
            sheet.rejected.iter().map(|e| (e.line, e.kind.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (5, RowErrorKind::MissingBarcode),
                (6, RowErrorKind::MissingQuantity),
                (7, RowErrorKind::InvalidQuantity("abc".to_string())),
                (8, RowErrorKind::InvalidQuantity("-1".to_string())),
                (9, RowErrorKind::InvalidQuantity("2.5".to_string())),
                (10, RowErrorKind::InvalidBarcode("---".to_string())),
            ]
        );
    }

    #[test]
    fn test_parse_skips_blank_rows() {
        let csv = "x\ny\nBarcode,Sold\n111,2\n,\n , \n";

        let sheet = parse_sales_sheet(csv.as_bytes(), &layout()).unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert!(sheet.rejected.is_empty());
    }

    #[test]
    fn test_parse_short_rows() {
        // Flexible records: a trailing total line with fewer cells is blank for us
        let csv = "x\ny\nName,Barcode,Sold\nShirt,111,2\nTotal\n";

        let sheet = parse_sales_sheet(csv.as_bytes(), &layout()).unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert!(sheet.rejected.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let csv = "x\ny\nBarcode,Qty\n111,2\n";

        let err = parse_sales_sheet(csv.as_bytes(), &layout()).unwrap_err();

        assert!(matches!(err, SheetError::MissingColumn(ref c) if c == "Sold"));
    }

    #[test]
    fn test_missing_header() {
        let err = parse_sales_sheet(b"only one line\n", &layout()).unwrap_err();

        assert!(matches!(err, SheetError::MissingHeader { skip_rows: 2 }));
    }

    #[test]
    fn test_blank_banner_line_counts_as_skipped_row() {
        let csv = "Daily report\n\nBarcode,Sold\n111,2\n";

        let sheet = parse_sales_sheet(csv.as_bytes(), &layout()).unwrap();

        assert_eq!(sheet.rows, vec![SaleRow::new(Barcode::parse("111").unwrap(), 2)]);
    }

    #[test]
    fn test_blank_lines_between_banner_and_header() {
        let csv = "Daily report\nBranch 3\n\n\nBarcode,Sold\n111,2\n,\n222,x\n";

        let sheet = parse_sales_sheet(csv.as_bytes(), &layout()).unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rejected[0].line, 8);
    }

    #[test]
    fn test_non_workbook_zip_is_rejected() {
        let err = parse_sales_sheet(b"PK\x03\x04not really a zip", &layout()).unwrap_err();

        assert!(matches!(err, SheetError::Workbook(_)));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(7290001234567.0)), "7290001234567");
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(12)), "12");
        assert_eq!(cell_text(&Data::String(" 111 ".to_string())), " 111 ");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("7"), Some(7));
        assert_eq!(parse_quantity("7.0"), Some(7));
        assert_eq!(parse_quantity("0"), Some(0));
        assert_eq!(parse_quantity("1e2"), Some(100));
        assert_eq!(parse_quantity("NaN"), None);
        assert_eq!(parse_quantity("-2"), None);
    }
}
