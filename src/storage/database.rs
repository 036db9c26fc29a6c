use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::{
    config::ReaderConfig,
    executor::table_source::JetTable,
    storage::{
        catalog::{CatalogEntry, CatalogReader},
        format::JetVersion,
        page_reader::PageReader,
        schema::TableDef,
        source::{ByteSource, FileSource, MemorySource},
    },
    types::{
        PageId,
        error::{DatabaseError, Result},
    },
};

/// A row skipped by a non-strict scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeWarning {
    pub table: String,
    pub page_id: PageId,
    pub row: usize,
    pub reason: String,
}

/// Warnings not yet taken, plus the rows they name so rescans of the same
/// table do not record a row twice.
#[derive(Default)]
struct WarningLog {
    pending: Vec<DecodeWarning>,
    seen: HashSet<(String, PageId, usize)>,
}

/// An open, read-only Jet database.
///
/// Table definitions load lazily on first use and are shared as
/// `Arc<TableDef>`. The byte source is released exactly once, by `close`
/// or on drop.
pub struct Database {
    reader: PageReader,
    config: ReaderConfig,
    catalog: Vec<CatalogEntry>,
    tables: RwLock<HashMap<String, Arc<TableDef>>>,
    warnings: Mutex<WarningLog>,
}

impl Database {
    pub fn open(source: Box<dyn ByteSource>, config: ReaderConfig) -> Result<Self> {
        let reader = PageReader::open(source, &config)?;
        let mut db = Self {
            reader,
            config,
            catalog: Vec::new(),
            tables: RwLock::new(HashMap::new()),
            warnings: Mutex::new(WarningLog::default()),
        };

        let catalog_def = CatalogReader::load_definition(&db)?;
        db.catalog = CatalogReader::read(&db, Arc::clone(&catalog_def))?;
        db.tables
            .write()
            .insert(catalog_def.name.to_lowercase(), catalog_def);

        tracing::info!(
            "Opened {:?} database: {} catalog entries, {} tables",
            db.version(),
            db.catalog.len(),
            db.table_names().len()
        );
        Ok(db)
    }

    pub fn open_file(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        Self::open(Box::new(FileSource::open(path)?), config)
    }

    pub fn from_bytes(bytes: Vec<u8>, config: ReaderConfig) -> Result<Self> {
        Self::open(Box::new(MemorySource::new(bytes)), config)
    }

    pub fn version(&self) -> JetVersion {
        self.reader.format().version
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn reader(&self) -> &PageReader {
        &self.reader
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Names of user tables, in catalog order.
    pub fn table_names(&self) -> Vec<&str> {
        self.catalog
            .iter()
            .filter(|e| e.object_type == crate::storage::catalog::ObjectType::Table)
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn table_def(&self, name: &str) -> Result<Arc<TableDef>> {
        let key = name.to_lowercase();
        if let Some(def) = self.tables.read().get(&key) {
            return Ok(Arc::clone(def));
        }

        let entry = self
            .catalog
            .iter()
            .find(|e| e.object_type.is_table() && e.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })?;

        let def = Arc::new(TableDef::read(
            &self.reader,
            entry.definition_page,
            &entry.name,
            &self.config,
        )?);
        self.tables.write().insert(key, Arc::clone(&def));
        Ok(def)
    }

    pub fn table(&self, name: &str) -> Result<JetTable<'_>> {
        Ok(JetTable::new(self, self.table_def(name)?))
    }

    /// Records a skipped row once per `(table, page, row)`. Returns false
    /// when the row was already recorded, e.g. by an earlier pass of a join
    /// over the same table.
    pub fn record_warning(&self, warning: DecodeWarning) -> bool {
        let mut log = self.warnings.lock();
        let key = (warning.table.clone(), warning.page_id, warning.row);
        if !log.seen.insert(key) {
            return false;
        }
        log.pending.push(warning);
        true
    }

    /// Drains the warnings recorded by non-strict scans so far. A row already
    /// reported is not reported again.
    pub fn take_warnings(&self) -> Vec<DecodeWarning> {
        std::mem::take(&mut self.warnings.lock().pending)
    }

    pub fn close(self) -> Result<()> {
        self.reader.close()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.reader.close() {
            tracing::warn!("Failed to close database source: {}", e);
        }
    }
}
