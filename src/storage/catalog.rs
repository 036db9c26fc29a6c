use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    executor::{scan::Scanner, sequential_scan::SequentialScanner},
    storage::{database::Database, schema::TableDef},
    types::{
        CATALOG_DEFINITION_PAGE, PageId,
        error::{DatabaseError, Result},
        row::Row,
        value::Value,
    },
};

pub const CATALOG_TABLE_NAME: &str = "MSysObjects";

const SYSTEM_OBJECT_FLAGS: u32 = 0x8000_0002;
const DEFINITION_PAGE_MASK: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    Table,
    SystemTable,
    Query,
    LinkedTable,
    Relationship,
    Container,
    Form,
    Report,
    Macro,
    Module,
    Unknown(i16),
}

impl ObjectType {
    pub fn from_catalog(type_code: i16, flags: u32) -> Self {
        match type_code {
            1 if flags & SYSTEM_OBJECT_FLAGS != 0 => ObjectType::SystemTable,
            1 => ObjectType::Table,
            3 => ObjectType::Container,
            5 => ObjectType::Query,
            4 | 6 => ObjectType::LinkedTable,
            8 => ObjectType::Relationship,
            -32768 => ObjectType::Form,
            -32766 => ObjectType::Macro,
            -32764 => ObjectType::Report,
            -32761 => ObjectType::Module,
            other => ObjectType::Unknown(other),
        }
    }

    pub fn type_code(&self) -> i16 {
        match self {
            ObjectType::Table | ObjectType::SystemTable => 1,
            ObjectType::Container => 3,
            ObjectType::Query => 5,
            ObjectType::LinkedTable => 6,
            ObjectType::Relationship => 8,
            ObjectType::Form => -32768,
            ObjectType::Macro => -32766,
            ObjectType::Report => -32764,
            ObjectType::Module => -32761,
            ObjectType::Unknown(code) => *code,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, ObjectType::Table | ObjectType::SystemTable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub object_type: ObjectType,
    pub definition_page: PageId,
    pub parent_id: u32,
    pub flags: u32,
}

/// Column positions of the catalog fields inside `MSysObjects`.
struct CatalogColumns {
    id: usize,
    parent_id: Option<usize>,
    name: usize,
    type_code: usize,
    flags: Option<usize>,
}

impl CatalogColumns {
    fn resolve(def: &TableDef) -> Result<Self> {
        let required = |name: &str| {
            def.column_index(name).ok_or_else(|| DatabaseError::CorruptCatalog {
                reason: format!("{} has no '{}' column", CATALOG_TABLE_NAME, name),
            })
        };
        Ok(Self {
            id: required("Id")?,
            parent_id: def.column_index("ParentId"),
            name: required("Name")?,
            type_code: required("Type")?,
            flags: def.column_index("Flags"),
        })
    }
}

pub struct CatalogReader;

impl CatalogReader {
    pub fn load_definition(db: &Database) -> Result<Arc<TableDef>> {
        let def = TableDef::read(
            db.reader(),
            CATALOG_DEFINITION_PAGE,
            CATALOG_TABLE_NAME,
            db.config(),
        )?;
        Ok(Arc::new(def))
    }

    /// Scans `MSysObjects` into catalog entries, failing with
    /// `CorruptCatalog` once more than `max_catalog_entries` rows appear.
    pub fn read(db: &Database, def: Arc<TableDef>) -> Result<Vec<CatalogEntry>> {
        let columns = CatalogColumns::resolve(&def)?;
        let limit = db.config().max_catalog_entries;
        let mut scanner = SequentialScanner::new(db, def);
        let mut entries = Vec::new();

        while let Some(row) = scanner.scan()? {
            if entries.len() >= limit {
                return Err(DatabaseError::CorruptCatalog {
                    reason: format!("catalog exceeds {} entries", limit),
                });
            }
            match Self::entry_from_row(&row, &columns) {
                Some(entry) => entries.push(entry),
                None => tracing::debug!("Skipping catalog row {:?} without name or id", row.row_id),
            }
        }
        Ok(entries)
    }

    fn entry_from_row(row: &Row, columns: &CatalogColumns) -> Option<CatalogEntry> {
        let int_at = |index: usize| row.get_value(index).and_then(Value::as_i64);
        let name = row.get_value(columns.name)?.as_text()?.to_string();
        let id = int_at(columns.id)? as u32;
        let type_code = int_at(columns.type_code).unwrap_or(0) as i16;
        let flags = columns.flags.and_then(int_at).unwrap_or(0) as u32;
        let parent_id = columns.parent_id.and_then(int_at).unwrap_or(0) as u32;

        Some(CatalogEntry {
            name,
            object_type: ObjectType::from_catalog(type_code, flags),
            definition_page: id & DEFINITION_PAGE_MASK,
            parent_id,
            flags,
        })
    }
}
