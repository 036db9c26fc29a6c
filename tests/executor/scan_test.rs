use std::collections::HashSet;

use jetdb::{
    ReaderConfig,
    executor::{
        data::collect_rows,
        scan::{ScanIterator, Scanner},
        table_scan::TableScanTask,
        task::execute,
    },
    storage::schema::{ColumnDef, ColumnType},
    types::{error::DatabaseError, row::Row, value::Value},
    utils::fixture::{JetImage, JetImageBuilder, TableBuilder},
};

fn people() -> TableBuilder {
    TableBuilder::new("people")
        .column(ColumnDef::new("id", ColumnType::LongInt))
        .column(ColumnDef::new("name", ColumnType::Text).compressed())
        .rows(
            [(1, "Alice"), (2, "Bob"), (3, "Charlie"), (4, "Diana"), (5, "Eve")]
                .into_iter()
                .map(|(id, name)| vec![Value::Int(id), Value::from(name)]),
        )
        .rows_per_page(2)
}

fn image() -> Result<JetImage, DatabaseError> {
    JetImageBuilder::jet4().table(people()).build()
}

fn ids(rows: &[Row]) -> Vec<i32> {
    rows.iter()
        .map(|row| match row.get_value(0) {
            Some(Value::Int(id)) => *id,
            other => panic!("Expected integer id, got {:?}", other),
        })
        .collect()
}

#[test]
fn test_sequential_scanner_basic_functionality() -> Result<(), DatabaseError> {
    let db = image()?.open(ReaderConfig::default())?;
    let table = db.table("people")?;
    let mut scanner = table.scanner();

    let mut scanned_rows = Vec::new();
    while let Some(row) = scanner.scan()? {
        scanned_rows.push(row);
    }
    assert_eq!(ids(&scanned_rows), vec![1, 2, 3, 4, 5]);
    assert_eq!(scanned_rows[2].get_value(1), Some(&Value::from("Charlie")));
    assert!(scanner.scan()?.is_none());
    Ok(())
}

#[test]
fn test_row_ids_follow_pages_and_slots() -> Result<(), DatabaseError> {
    let image = image()?;
    let layout = image.table("people").cloned().expect("people layout");
    assert_eq!(layout.data_pages.len(), 3);

    let db = image.open(ReaderConfig::default())?;
    let table = db.table("people")?;
    let rows: Vec<Row> = ScanIterator::new(table.scanner()).collect::<Result<_, _>>()?;

    let row_ids: Vec<u64> = rows.iter().filter_map(|r| r.row_id).collect();
    assert_eq!(row_ids.len(), 5);
    assert_eq!(row_ids[0], Row::make_row_id(layout.data_pages[0], 0));
    assert_eq!(row_ids[1], Row::make_row_id(layout.data_pages[0], 1));
    assert_eq!(row_ids[4], Row::make_row_id(layout.data_pages[2], 0));
    assert_eq!(row_ids.iter().collect::<HashSet<_>>().len(), 5);
    Ok(())
}

#[test]
fn test_scanner_reset_functionality() -> Result<(), DatabaseError> {
    let db = image()?.open(ReaderConfig::default())?;
    let table = db.table("people")?;
    let mut scanner = table.scanner();

    let first_row = scanner.scan()?;
    assert!(first_row.is_some());
    scanner.scan()?;
    scanner.scan()?;

    scanner.reset()?;
    assert_eq!(scanner.current_row_id(), None);
    assert!(scanner.holders().iter().all(|h| !h.is_valid()));

    let after_reset = scanner.scan()?;
    assert_eq!(first_row, after_reset);
    Ok(())
}

#[test]
fn test_scan_batch() -> Result<(), DatabaseError> {
    let db = image()?.open(ReaderConfig::default())?;
    let table = db.table("people")?;
    let mut scanner = table.scanner();

    assert_eq!(ids(&scanner.scan_batch(3)?), vec![1, 2, 3]);
    assert_eq!(ids(&scanner.scan_batch(3)?), vec![4, 5]);
    assert!(scanner.scan_batch(3)?.is_empty());
    Ok(())
}

#[test]
fn test_deleted_slots_are_skipped() -> Result<(), DatabaseError> {
    let image = JetImageBuilder::jet4()
        .table(
            TableBuilder::new("people")
                .column(ColumnDef::new("id", ColumnType::LongInt))
                .row(vec![Value::Int(1)])
                .deleted_row(vec![Value::Int(2)])
                .row(vec![Value::Int(3)])
                .deleted_row(vec![Value::Int(4)]),
        )
        .build()?;
    let db = image.open(ReaderConfig::default())?;
    let table = db.table("people")?;
    let rows: Vec<Row> = ScanIterator::new(table.scanner()).collect::<Result<_, _>>()?;
    assert_eq!(ids(&rows), vec![1, 3]);
    assert!(db.take_warnings().is_empty());
    Ok(())
}

#[test]
fn test_empty_table() -> Result<(), DatabaseError> {
    let image = JetImageBuilder::jet3()
        .table(TableBuilder::new("empty").column(ColumnDef::new("id", ColumnType::Int)))
        .build()?;
    let db = image.open(ReaderConfig::default())?;
    let table = db.table("empty")?;
    let mut scanner = table.scanner();
    assert!(scanner.scan()?.is_none());
    assert!(!scanner.advance()?);
    Ok(())
}

fn corrupted_image() -> Result<JetImage, DatabaseError> {
    let mut image = image()?;
    let last_page = image
        .table("people")
        .and_then(|t| t.data_pages.last().copied())
        .expect("people has data pages");
    // the last page holds a single row, Eve
    image.set_row_offset(last_page, 0, 0x1500)?;
    Ok(image)
}

#[test]
fn test_corrupt_row_is_skipped_with_warning() -> Result<(), DatabaseError> {
    let db = corrupted_image()?.open(ReaderConfig::default())?;
    let table = db.table("people")?;
    let rows: Vec<Row> = ScanIterator::new(table.scanner()).collect::<Result<_, _>>()?;
    assert_eq!(ids(&rows), vec![1, 2, 3, 4]);

    let warnings = db.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].table, "people");
    assert_eq!(warnings[0].row, 0);
    assert!(db.take_warnings().is_empty());
    Ok(())
}

#[test]
fn test_corrupt_row_fails_strict_scan() -> Result<(), DatabaseError> {
    let db = corrupted_image()?.open(ReaderConfig::default().strict())?;
    let table = db.table("people")?;
    let result: Result<Vec<Row>, _> = ScanIterator::new(table.scanner()).collect();
    assert!(matches!(result, Err(DatabaseError::RowDecode { row: 0, .. })));
    Ok(())
}

#[test]
fn test_table_scan_task_streams_rows() -> Result<(), DatabaseError> {
    let db = image()?.open(ReaderConfig::default())?;
    let table = db.table("people")?;
    let mut data = execute(Box::new(TableScanTask::new(&table)))?;

    assert_eq!(data.column_count(), 2);
    assert!(data.get(0).is_err());
    let rows = collect_rows(data.as_mut())?;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4], vec![Value::Int(5), Value::from("Eve")]);

    data.rewind()?;
    assert!(data.next()?);
    assert_eq!(data.get(1)?, &Value::from("Alice"));
    assert!(matches!(
        data.get(2),
        Err(DatabaseError::ColumnIndexOutOfBounds { index: 2 })
    ));
    Ok(())
}
