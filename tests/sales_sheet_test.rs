//! Sales sheet parsing from a workbook export

use stock_sync::domain::{Barcode, RowErrorKind, SaleRow};
use stock_sync::io::{parse_sales_sheet, SheetError, SheetLayout};

const DAILY_SALES: &[u8] = include_bytes!("fixtures/daily_sales.xlsx");

#[test]
fn test_workbook_rows_follow_default_layout() {
    // Banner on rows 1 and 3, blank rows 2 and 4, header on row 5
    let sheet = parse_sales_sheet(DAILY_SALES, &SheetLayout::default()).unwrap();

    assert_eq!(
        sheet.rows,
        vec![
            SaleRow::new(Barcode::parse("7290001234567").unwrap(), 3),
            SaleRow::new(Barcode::parse("7290009999999").unwrap(), 1),
        ]
    );
    assert_eq!(sheet.rejected.len(), 1);
    assert_eq!(sheet.rejected[0].line, 8);
    assert_eq!(sheet.rejected[0].kind, RowErrorKind::MissingBarcode);
}

#[test]
fn test_workbook_skip_counts_blank_rows() {
    // Skipping three rows lands on blank row 4, so the header is still row 5
    let layout = SheetLayout { skip_rows: 3, ..SheetLayout::default() };

    let sheet = parse_sales_sheet(DAILY_SALES, &layout).unwrap();

    assert_eq!(sheet.rows.len(), 2);
}

#[test]
fn test_workbook_header_past_skip_is_missing_column() {
    let layout = SheetLayout { skip_rows: 5, ..SheetLayout::default() };

    let err = parse_sales_sheet(DAILY_SALES, &layout).unwrap_err();

    assert!(matches!(err, SheetError::MissingColumn(_)));
}

#[test]
fn test_csv_export_reads_the_same() {
    let csv = "דוח מכירות יומי\n\nסניף 3\n\nשם,ברקוד,כמות פריטים שנמכרו\n\
               חולצה,7.290001234567E+12,3\nכובע,7290009999999,1.0\nגרב,,2\n";

    let sheet = parse_sales_sheet(csv.as_bytes(), &SheetLayout::default()).unwrap();
    let workbook = parse_sales_sheet(DAILY_SALES, &SheetLayout::default()).unwrap();

    assert_eq!(sheet, workbook);
}
