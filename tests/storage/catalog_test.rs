use jetdb::{
    Database, ReaderConfig,
    executor::{data::collect_rows, table_source::TableSource},
    storage::{
        catalog::{CATALOG_TABLE_NAME, ObjectType},
        schema::{ColumnDef, ColumnType},
    },
    types::{error::DatabaseError, value::Value},
    utils::fixture::{JetImage, JetImageBuilder, TableBuilder},
};

fn cars() -> TableBuilder {
    TableBuilder::new("cars")
        .column(ColumnDef::new("id", ColumnType::LongInt).not_null().autonumber())
        .column(ColumnDef::new("make", ColumnType::Text).compressed())
        .column(ColumnDef::new("model", ColumnType::Text).compressed())
        .index("PrimaryKey", true)
        .index("make_idx", false)
        .row(vec![Value::Int(1), Value::from("ford"), Value::from("contour")])
}

fn person() -> TableBuilder {
    TableBuilder::new("person")
        .column(ColumnDef::new("id", ColumnType::LongInt))
        .column(ColumnDef::new("name", ColumnType::Text))
        .row(vec![Value::Int(1), Value::from("billy")])
}

fn image() -> Result<JetImage, DatabaseError> {
    JetImageBuilder::jet4()
        .table(cars())
        .table(person())
        .object("qryFords", ObjectType::Query)
        .build()
}

fn wide_table(columns: usize) -> TableBuilder {
    let mut table = TableBuilder::new("wide");
    for i in 0..columns {
        table = table.column(ColumnDef::new(format!("column_{:03}", i), ColumnType::Int));
    }
    table.row((0..columns as i32).map(Value::Int).collect())
}

#[test]
fn test_catalog_lists_every_object() -> Result<(), DatabaseError> {
    let image = image()?;
    let db = image.open(ReaderConfig::default())?;

    let catalog = db.catalog();
    assert_eq!(catalog.len(), 4);
    assert_eq!(catalog[0].name, CATALOG_TABLE_NAME);
    assert_eq!(catalog[0].object_type, ObjectType::SystemTable);
    assert_eq!(catalog[0].definition_page, 2);

    let cars = catalog.iter().find(|e| e.name == "cars").expect("cars entry");
    assert_eq!(cars.object_type, ObjectType::Table);
    assert_eq!(cars.definition_page, image.table("cars").unwrap().definition_page());

    let query = catalog.iter().find(|e| e.name == "qryFords").expect("query entry");
    assert_eq!(query.object_type, ObjectType::Query);

    assert_eq!(db.table_names(), vec!["cars", "person"]);
    Ok(())
}

#[test]
fn test_catalog_entry_bound() -> Result<(), DatabaseError> {
    let image = image()?;
    assert!(image.open(ReaderConfig::default().with_max_catalog_entries(4)).is_ok());

    let err = image
        .open(ReaderConfig::default().with_max_catalog_entries(3))
        .err()
        .expect("catalog bound must trip");
    assert!(matches!(err, DatabaseError::CorruptCatalog { .. }));
    Ok(())
}

#[test]
fn test_table_definition() -> Result<(), DatabaseError> {
    let db = image()?.open(ReaderConfig::default())?;
    let def = db.table_def("CARS")?;

    assert_eq!(def.name, "cars");
    assert_eq!(def.row_count, 1);
    assert_eq!(def.column_names(), vec!["id", "make", "model"]);
    assert_eq!(def.column_index("Model"), Some(2));
    assert!(def.has_variable_columns());

    let id = &def.columns[0];
    assert_eq!(id.column_type, ColumnType::LongInt);
    assert!(id.is_fixed());
    assert!(!id.is_nullable());
    assert!(id.is_autonumber());
    assert!(def.columns[1].compressed_unicode);

    let names: Vec<(&str, bool)> = def
        .indexes
        .iter()
        .map(|i| (i.name.as_str(), i.primary))
        .collect();
    assert_eq!(names, vec![("PrimaryKey", true), ("make_idx", false)]);
    Ok(())
}

#[test]
fn test_usage_map_lists_data_pages() -> Result<(), DatabaseError> {
    let image = JetImageBuilder::jet4()
        .table(
            person()
                .rows((2..40).map(|i| vec![Value::Int(i), Value::from(format!("person {}", i))]))
                .rows_per_page(8),
        )
        .build()?;
    let db = image.open(ReaderConfig::default())?;
    let def = db.table_def("person")?;
    assert_eq!(def.data_pages, image.table("person").unwrap().data_pages);
    assert_eq!(def.data_pages.len(), 5);
    Ok(())
}

#[test]
fn test_usage_map_page_overflow_is_corrupt_page() -> Result<(), DatabaseError> {
    let mut image = JetImageBuilder::jet4()
        .table(
            person()
                .rows((2..40).map(|i| vec![Value::Int(i), Value::from(format!("person {}", i))]))
                .rows_per_page(8),
        )
        .build()?;
    let map_row = image.table("person").unwrap().usage_map_row;
    let map_start = (image.row_offset(1, map_row).unwrap() & 0x1FFF) as usize;
    // inline map: type byte, then the first page number
    image.page_mut(1).unwrap()[map_start + 1..map_start + 5]
        .copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());

    let db = image.open(ReaderConfig::default())?;
    assert!(matches!(
        db.table_def("person"),
        Err(DatabaseError::CorruptPage { page_id: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_definition_continuation_pages() -> Result<(), DatabaseError> {
    for (builder, columns) in [(JetImageBuilder::jet4(), 120), (JetImageBuilder::jet3(), 90)] {
        let image = builder.table(wide_table(columns)).build()?;
        assert!(image.table("wide").unwrap().definition_pages.len() >= 2);

        let db = image.open(ReaderConfig::default())?;
        let def = db.table_def("wide")?;
        assert_eq!(def.columns.len(), columns);
        assert_eq!(def.columns[columns - 1].name, format!("column_{:03}", columns - 1));

        let rows = collect_rows(db.table("wide")?.open()?.as_mut())?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][columns - 1], Value::Int(columns as i32 - 1));
    }
    Ok(())
}

#[test]
fn test_definition_chain_bound() -> Result<(), DatabaseError> {
    let image = JetImageBuilder::jet4().table(wide_table(120)).build()?;
    let db = image.open(ReaderConfig::default().with_max_tdef_pages(1))?;
    assert!(matches!(
        db.table_def("wide"),
        Err(DatabaseError::CorruptCatalog { .. })
    ));
    Ok(())
}

#[test]
fn test_missing_table() -> Result<(), DatabaseError> {
    let db: Database = image()?.open(ReaderConfig::default())?;
    assert!(matches!(
        db.table("trucks"),
        Err(DatabaseError::TableNotFound { ref name }) if name == "trucks"
    ));
    // queries are catalog entries but not tables
    assert!(db.table_def("qryFords").is_err());
    Ok(())
}

#[test]
fn test_system_table_is_readable() -> Result<(), DatabaseError> {
    let db = image()?.open(ReaderConfig::default())?;
    let msys = db.table(CATALOG_TABLE_NAME)?;
    assert_eq!(msys.column_names(), vec!["Id", "ParentId", "Name", "Type", "Flags"]);
    let rows = collect_rows(msys.open()?.as_mut())?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][2], Value::from("cars"));
    Ok(())
}
