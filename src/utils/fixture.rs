//! Writes small Jet3/Jet4 images for tests and benchmarks.
//!
//! Page plan of a built image:
//! - page 0: file header
//! - page 1: one usage map row per table, catalog first
//! - page 2: `MSysObjects` definition, then every other table definition
//!   (continuation pages follow their first page)
//! - one LVAL page per table storing memo/OLE values out of row
//! - data pages, table by table

use std::io::Write;

use tempfile::NamedTempFile;

use crate::{
    config::ReaderConfig,
    storage::{
        catalog::{CATALOG_TABLE_NAME, ObjectType},
        database::Database,
        format::{FormatConstants, JetVersion},
        header::DatabaseHeader,
        long_value::{inline_header, pointer_header},
        row_decoder::to_jet_datetime,
        row_offsets::ROW_FLAG_DELETED,
        schema::{
            COLUMN_MISC_COMPRESSED_UNICODE, ColumnDef, ColumnType, INDEX_TYPE_PRIMARY,
            encode_name,
        },
        text::encode_text,
        usage_map::encode_inline_map,
    },
    types::{
        CATALOG_DEFINITION_PAGE, PageId,
        error::{DatabaseError, Result},
        page::PageKind,
        value::Value,
    },
};

const USAGE_MAP_PAGE: PageId = 1;
const PAGE_OWNER_OFFSET: usize = 4;
const TDEF_NEXT_PAGE_OFFSET: usize = 4;
const TDEF_LENGTH_OFFSET: usize = 8;
const TDEF_CONTINUATION_HEADER: usize = 8;
const JET4_TABLE_TYPE_OFFSET: usize = 40;
const JET4_MAX_COLS_OFFSET: usize = 41;
const JET4_NUM_VAR_COLS_OFFSET: usize = 43;
const LVAL_SIGNATURE: &[u8] = b"LVAL";

const USER_TABLE_TYPE: u8 = 0x4E;
const SYSTEM_TABLE_TYPE: u8 = 0x53;
const SYSTEM_OBJECT_FLAGS: u32 = 0x8000_0002;
const OBJECT_ID_BASE: u32 = 0x0600_0000;

/// Where a table keeps its memo and OLE bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongValueStorage {
    Inline,
    SinglePage,
    /// Split over chained LVAL rows of at most `chunk_size` bytes.
    Chained { chunk_size: usize },
}

#[derive(Debug, Clone)]
struct FixtureRow {
    values: Vec<Value>,
    deleted: bool,
}

/// Schema and rows of one table in a fixture image. Columns are numbered in
/// the order they are added.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDef>,
    rows: Vec<FixtureRow>,
    indexes: Vec<(String, bool)>,
    rows_per_page: Option<usize>,
    long_values: LongValueStorage,
    declared_rows: Option<u32>,
    system: bool,
    fixed_len: usize,
    var_count: u16,
}

impl TableBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            indexes: Vec::new(),
            rows_per_page: None,
            long_values: LongValueStorage::Inline,
            declared_rows: None,
            system: false,
            fixed_len: 0,
            var_count: 0,
        }
    }

    pub fn column(mut self, mut column: ColumnDef) -> Self {
        let number = self.columns.len() as u16;
        column.number = number;
        column.row_column_number = number;
        if column.is_fixed() {
            column.fixed_offset = self.fixed_len as u16;
            self.fixed_len += column
                .column_type
                .fixed_size()
                .unwrap_or(column.size as usize);
        } else {
            column.var_column_number = self.var_count;
            self.var_count += 1;
        }
        self.columns.push(column);
        self
    }

    pub fn index(mut self, name: &str, primary: bool) -> Self {
        self.indexes.push((name.to_string(), primary));
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(FixtureRow {
            values,
            deleted: false,
        });
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        for values in rows {
            self = self.row(values);
        }
        self
    }

    /// A row whose slot is flagged deleted; its bytes stay on the page.
    pub fn deleted_row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(FixtureRow {
            values,
            deleted: true,
        });
        self
    }

    pub fn rows_per_page(mut self, rows: usize) -> Self {
        self.rows_per_page = Some(rows.max(1));
        self
    }

    pub fn long_values(mut self, storage: LongValueStorage) -> Self {
        self.long_values = storage;
        self
    }

    /// Overrides the row count written to the table definition.
    pub fn declared_row_count(mut self, rows: u32) -> Self {
        self.declared_rows = Some(rows);
        self
    }

    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    fn live_rows(&self) -> u32 {
        self.rows.iter().filter(|r| !r.deleted).count() as u32
    }

    fn has_long_values(&self) -> bool {
        self.columns.iter().any(|c| c.column_type.is_long_value())
    }
}

/// Pages the builder assigned to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub name: String,
    pub definition_pages: Vec<PageId>,
    pub data_pages: Vec<PageId>,
    pub lval_page: Option<PageId>,
    pub usage_map_row: usize,
}

impl TableLayout {
    pub fn definition_page(&self) -> PageId {
        self.definition_pages.first().copied().unwrap_or(0)
    }
}

pub struct JetImageBuilder {
    version: JetVersion,
    ace: bool,
    tables: Vec<TableBuilder>,
    objects: Vec<(String, ObjectType)>,
}

impl JetImageBuilder {
    pub fn new(version: JetVersion) -> Self {
        Self {
            version,
            ace: false,
            tables: Vec::new(),
            objects: Vec::new(),
        }
    }

    pub fn jet4() -> Self {
        Self::new(JetVersion::Jet4)
    }

    pub fn jet3() -> Self {
        Self::new(JetVersion::Jet3)
    }

    /// Writes the ACE signature and version used by Access 2007 files.
    pub fn ace(mut self) -> Self {
        self.ace = true;
        self
    }

    pub fn table(mut self, table: TableBuilder) -> Self {
        self.tables.push(table);
        self
    }

    /// Adds a non-table catalog entry (query, form, ...).
    pub fn object(mut self, name: &str, object_type: ObjectType) -> Self {
        self.objects.push((name.to_string(), object_type));
        self
    }

    pub fn build(self) -> Result<JetImage> {
        let format = FormatConstants::for_version(self.version);
        let page_size = format.page_size;
        let user_tables = self.tables.len();

        let catalog_rows = 1 + user_tables + self.objects.len();
        let mut tables = vec![catalog_table().declared_row_count(catalog_rows as u32)];
        tables.extend(self.tables);

        // Definitions first so catalog rows can point at them.
        let mut next_page: PageId = CATALOG_DEFINITION_PAGE;
        let mut definitions = Vec::with_capacity(tables.len());
        let mut layouts = Vec::with_capacity(tables.len());
        for (map_row, table) in tables.iter().enumerate() {
            let tdef = definition_bytes(table, &format, map_row)?;
            let count = definition_page_count(tdef.len(), page_size);
            let pages: Vec<PageId> = (next_page..next_page + count as PageId).collect();
            next_page += count as PageId;
            definitions.push(tdef);
            layouts.push(TableLayout {
                name: table.name.clone(),
                definition_pages: pages,
                data_pages: Vec::new(),
                lval_page: None,
                usage_map_row: map_row,
            });
        }

        let described: Vec<(PageId, &str, bool)> = tables
            .iter()
            .zip(&layouts)
            .map(|(t, l)| (l.definition_page(), t.name.as_str(), t.system))
            .collect();
        let catalog = catalog_entries(&described, &self.objects);
        tables[0].rows = catalog
            .into_iter()
            .map(|values| FixtureRow {
                values,
                deleted: false,
            })
            .collect();

        for (table, layout) in tables.iter().zip(layouts.iter_mut()) {
            if table.long_values != LongValueStorage::Inline && table.has_long_values() {
                layout.lval_page = Some(next_page);
                next_page += 1;
            }
        }

        let mut encoded_tables = Vec::with_capacity(tables.len());
        let mut lval_rows = Vec::with_capacity(tables.len());
        for (table, layout) in tables.iter().zip(layouts.iter()) {
            let mut lval = LvalWriter {
                page: layout.lval_page,
                storage: table.long_values,
                rows: Vec::new(),
            };
            let rows = table
                .rows
                .iter()
                .map(|row| Ok((encode_row(table, &format, &row.values, &mut lval)?, row.deleted)))
                .collect::<Result<Vec<_>>>()?;
            encoded_tables.push(pack_rows(rows, &format, table.rows_per_page, &table.name)?);
            lval_rows.push(lval.rows);
        }

        for (pages, layout) in encoded_tables.iter().zip(layouts.iter_mut()) {
            layout.data_pages = (next_page..next_page + pages.len() as PageId).collect();
            next_page += pages.len() as PageId;
        }

        let mut bytes = vec![0u8; next_page as usize * page_size];

        DatabaseHeader {
            version: self.version,
            raw_version: match (self.version, self.ace) {
                (JetVersion::Jet3, _) => 0,
                (JetVersion::Jet4, false) => 1,
                (JetVersion::Jet4, true) => 0x0103,
            },
            ace: self.ace,
        }
        .write_to(&mut bytes[page_range(0, page_size)]);

        let maps: Vec<(Vec<u8>, bool)> = layouts
            .iter()
            .map(|l| (encode_inline_map(&l.data_pages), false))
            .collect();
        let range = page_range(USAGE_MAP_PAGE, page_size);
        write_data_page(&mut bytes[range], &format, [0; 4], &maps)?;

        for (tdef, layout) in definitions.iter().zip(&layouts) {
            write_definition(&mut bytes, tdef, &layout.definition_pages, page_size);
        }

        for (rows, layout) in lval_rows.iter().zip(&layouts) {
            if let Some(lval_page) = layout.lval_page {
                let rows: Vec<(Vec<u8>, bool)> = rows.iter().map(|r| (r.clone(), false)).collect();
                let range = page_range(lval_page, page_size);
                let mut owner = [0u8; 4];
                owner.copy_from_slice(LVAL_SIGNATURE);
                write_data_page(&mut bytes[range], &format, owner, &rows)?;
            }
        }

        for (pages, layout) in encoded_tables.iter().zip(&layouts) {
            let owner = layout.definition_page().to_le_bytes();
            for (rows, page_id) in pages.iter().zip(&layout.data_pages) {
                let range = page_range(*page_id, page_size);
                write_data_page(&mut bytes[range], &format, owner, rows)?;
            }
        }

        Ok(JetImage {
            bytes,
            format,
            tables: layouts,
        })
    }
}

/// A finished image plus the page numbers of everything in it.
#[derive(Debug, Clone)]
pub struct JetImage {
    bytes: Vec<u8>,
    format: FormatConstants,
    tables: Vec<TableLayout>,
}

impl JetImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn page_size(&self) -> usize {
        self.format.page_size
    }

    pub fn page_count(&self) -> usize {
        self.bytes.len() / self.format.page_size
    }

    pub fn table(&self, name: &str) -> Option<&TableLayout> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn catalog(&self) -> Option<&TableLayout> {
        self.table(CATALOG_TABLE_NAME)
    }

    pub fn page_mut(&mut self, page_id: PageId) -> Option<&mut [u8]> {
        let start = page_id as usize * self.format.page_size;
        self.bytes.get_mut(start..start + self.format.page_size)
    }

    pub fn row_offset(&self, page_id: PageId, slot: usize) -> Option<u16> {
        let at = page_id as usize * self.format.page_size + self.format.row_count_offset + 2 + slot * 2;
        let raw = self.bytes.get(at..at + 2)?;
        Some(u16::from_le_bytes([raw[0], raw[1]]))
    }

    /// Overwrites one entry of a data page's row-offset table.
    pub fn set_row_offset(&mut self, page_id: PageId, slot: usize, raw: u16) -> Result<()> {
        let at = self.format.row_count_offset + 2 + slot * 2;
        let page = self
            .page_mut(page_id)
            .ok_or_else(|| DatabaseError::config(format!("image has no page {}", page_id)))?;
        page[at..at + 2].copy_from_slice(&raw.to_le_bytes());
        Ok(())
    }

    pub fn open(&self, config: ReaderConfig) -> Result<Database> {
        Database::from_bytes(self.bytes.clone(), config)
    }

    /// Writes the image to a temporary file, removed when the handle drops.
    pub fn write_temp(&self) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(&self.bytes)?;
        file.flush()?;
        Ok(file)
    }
}

fn catalog_table() -> TableBuilder {
    TableBuilder::new(CATALOG_TABLE_NAME)
        .system()
        .column(ColumnDef::new("Id", ColumnType::LongInt))
        .column(ColumnDef::new("ParentId", ColumnType::LongInt))
        .column(ColumnDef::new("Name", ColumnType::Text).compressed())
        .column(ColumnDef::new("Type", ColumnType::Int))
        .column(ColumnDef::new("Flags", ColumnType::LongInt))
}

fn catalog_entries(tables: &[(PageId, &str, bool)], objects: &[(String, ObjectType)]) -> Vec<Vec<Value>> {
    let entry = |id: u32, name: &str, type_code: i16, flags: u32| {
        vec![
            Value::Int(id as i32),
            Value::Int(0),
            Value::Text(name.to_string()),
            Value::Int(type_code as i32),
            Value::Int(flags as i32),
        ]
    };
    let table_code = ObjectType::Table.type_code();

    let mut rows: Vec<Vec<Value>> = tables
        .iter()
        .map(|(page, name, system)| {
            let flags = if *system { SYSTEM_OBJECT_FLAGS } else { 0 };
            entry(*page, name, table_code, flags)
        })
        .collect();
    rows.extend(objects.iter().enumerate().map(|(i, (name, object_type))| {
        entry(OBJECT_ID_BASE + i as u32, name, object_type.type_code(), 0)
    }));
    rows
}

fn page_range(page_id: PageId, page_size: usize) -> std::ops::Range<usize> {
    let start = page_id as usize * page_size;
    start..start + page_size
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn definition_bytes(table: &TableBuilder, format: &FormatConstants, map_row: usize) -> Result<Vec<u8>> {
    let num_cols = table.columns.len();
    let num_idxs = table.indexes.len();
    if map_row > u8::MAX as usize {
        return Err(DatabaseError::config("fixture images hold at most 256 tables"));
    }

    let mut buf = vec![0u8; format.tab_cols_start_offset];
    buf[0] = PageKind::TableDef.as_u8();
    buf[1] = 0x01;
    put_u32(
        &mut buf,
        format.tab_num_rows_offset,
        table.declared_rows.unwrap_or_else(|| table.live_rows()),
    );
    if format.is_jet4() {
        buf[JET4_TABLE_TYPE_OFFSET] = if table.system {
            SYSTEM_TABLE_TYPE
        } else {
            USER_TABLE_TYPE
        };
        put_u16(&mut buf, JET4_MAX_COLS_OFFSET, num_cols as u16);
        put_u16(&mut buf, JET4_NUM_VAR_COLS_OFFSET, table.var_count);
    }
    put_u16(&mut buf, format.tab_num_cols_offset, num_cols as u16);
    put_u32(&mut buf, format.tab_num_idxs_offset, num_idxs as u32);
    put_u32(&mut buf, format.tab_num_ridxs_offset, num_idxs as u32);
    buf[format.tab_usage_map_offset] = map_row as u8;
    buf[format.tab_first_dpg_offset..format.tab_first_dpg_offset + 3]
        .copy_from_slice(&USAGE_MAP_PAGE.to_le_bytes()[..3]);

    buf.resize(buf.len() + num_idxs * format.tab_ridx_entry_size, 0);

    for column in &table.columns {
        let mut entry = vec![0u8; format.tab_col_entry_size];
        entry[format.col_type_offset] = column.column_type.as_u8();
        put_u16(&mut entry, format.col_num_offset, column.number);
        put_u16(&mut entry, format.tab_col_offset_var, column.var_column_number);
        put_u16(&mut entry, format.tab_row_col_num_offset, column.row_column_number);
        entry[format.col_prec_offset] = column.precision;
        entry[format.col_scale_offset] = column.scale;
        entry[format.col_flags_offset] = column.flags;
        if let Some(misc) = format.col_misc_flags_offset {
            if column.compressed_unicode {
                entry[misc] |= COLUMN_MISC_COMPRESSED_UNICODE;
            }
        }
        put_u16(&mut entry, format.tab_col_offset_fixed, column.fixed_offset);
        put_u16(&mut entry, format.col_size_offset, column.size);
        buf.extend(entry);
    }
    for column in &table.columns {
        buf.extend(encode_name(&column.name, format));
    }

    buf.resize(buf.len() + num_idxs * format.real_idx_info_size, 0);

    let index_number_offset = if format.is_jet4() { 4 } else { 0 };
    for (number, (_, primary)) in table.indexes.iter().enumerate() {
        let mut entry = vec![0u8; format.tab_idx_entry_size];
        put_u32(&mut entry, index_number_offset, number as u32);
        if *primary {
            entry[format.tab_idx_type_offset] = INDEX_TYPE_PRIMARY;
        }
        buf.extend(entry);
    }
    for (name, _) in &table.indexes {
        buf.extend(encode_name(name, format));
    }

    let length = buf.len() as u32;
    put_u32(&mut buf, TDEF_LENGTH_OFFSET, length);
    Ok(buf)
}

fn definition_page_count(len: usize, page_size: usize) -> usize {
    if len <= page_size {
        1
    } else {
        1 + (len - page_size).div_ceil(page_size - TDEF_CONTINUATION_HEADER)
    }
}

/// The first page takes a full page of the definition; each continuation
/// page carries the next chunk after its own 8-byte header.
fn write_definition(bytes: &mut [u8], tdef: &[u8], pages: &[PageId], page_size: usize) {
    let chunk = page_size - TDEF_CONTINUATION_HEADER;
    for (i, page_id) in pages.iter().enumerate() {
        let start = *page_id as usize * page_size;
        let page = &mut bytes[start..start + page_size];
        let (from, to, at) = if i == 0 {
            (0, tdef.len().min(page_size), 0)
        } else {
            let from = page_size + (i - 1) * chunk;
            (from, tdef.len().min(from + chunk), TDEF_CONTINUATION_HEADER)
        };
        page[at..at + (to - from)].copy_from_slice(&tdef[from..to]);
        page[0] = PageKind::TableDef.as_u8();
        page[1] = 0x01;
        let next = pages.get(i + 1).copied().unwrap_or(0);
        put_u32(page, TDEF_NEXT_PAGE_OFFSET, next);
    }
}

/// Rows go in from the page end downwards, row 0 last in the page.
fn write_data_page(
    page: &mut [u8],
    format: &FormatConstants,
    owner: [u8; 4],
    rows: &[(Vec<u8>, bool)],
) -> Result<()> {
    let table_end = format.row_count_offset + 2 + rows.len() * 2;
    page[0] = PageKind::Data.as_u8();
    page[1] = 0x01;
    page[PAGE_OWNER_OFFSET..PAGE_OWNER_OFFSET + 4].copy_from_slice(&owner);
    put_u16(page, format.row_count_offset, rows.len() as u16);

    let mut end = page.len();
    for (slot, (row, deleted)) in rows.iter().enumerate() {
        let start = end
            .checked_sub(row.len())
            .filter(|s| *s >= table_end)
            .ok_or_else(|| DatabaseError::config("rows do not fit in one page"))?;
        page[start..end].copy_from_slice(row);
        let flags = if *deleted { ROW_FLAG_DELETED } else { 0 };
        put_u16(page, format.row_count_offset + 2 + slot * 2, start as u16 | flags);
        end = start;
    }
    put_u16(page, 2, (end - table_end) as u16);
    Ok(())
}

/// Greedy packing of encoded rows into page-sized groups.
fn pack_rows(
    rows: Vec<(Vec<u8>, bool)>,
    format: &FormatConstants,
    rows_per_page: Option<usize>,
    table: &str,
) -> Result<Vec<Vec<(Vec<u8>, bool)>>> {
    let header = format.row_count_offset + 2;
    let mut pages: Vec<Vec<(Vec<u8>, bool)>> = Vec::new();
    let mut current: Vec<(Vec<u8>, bool)> = Vec::new();
    let mut used = header;

    for row in rows {
        let cost = row.0.len() + 2;
        if header + cost > format.page_size {
            return Err(DatabaseError::config(format!(
                "row of {} bytes in '{}' does not fit a page",
                row.0.len(),
                table
            )));
        }
        let full = rows_per_page.is_some_and(|n| current.len() >= n);
        if !current.is_empty() && (full || used + cost > format.page_size) {
            pages.push(std::mem::take(&mut current));
            used = header;
        }
        used += cost;
        current.push(row);
    }
    if !current.is_empty() {
        pages.push(current);
    }
    Ok(pages)
}

/// Collects out-of-row long values for one table.
struct LvalWriter {
    page: Option<PageId>,
    storage: LongValueStorage,
    rows: Vec<Vec<u8>>,
}

impl LvalWriter {
    /// Returns the bytes stored in the row for a long value.
    fn store(&mut self, data: Vec<u8>) -> Result<Vec<u8>> {
        let page = match (self.storage, self.page) {
            (LongValueStorage::Inline, _) | (_, None) => None,
            (_, Some(page)) => Some(page),
        };
        let Some(page) = page.filter(|_| !data.is_empty()) else {
            let mut field = inline_header(data.len()).to_vec();
            field.extend(data);
            return Ok(field);
        };

        let first = self.rows.len();
        let header = match self.storage {
            LongValueStorage::Chained { chunk_size } => {
                let chunks: Vec<&[u8]> = data.chunks(chunk_size.max(1)).collect();
                for (k, chunk) in chunks.iter().enumerate() {
                    let mut row = vec![0u8; 4];
                    if k + 1 < chunks.len() {
                        row[0] = (first + k + 1) as u8;
                        row[1..4].copy_from_slice(&page.to_le_bytes()[..3]);
                    }
                    row.extend_from_slice(chunk);
                    self.rows.push(row);
                }
                pointer_header(data.len(), page, first as u8, false)
            }
            _ => {
                self.rows.push(data.clone());
                pointer_header(data.len(), page, first as u8, true)
            }
        };
        if self.rows.len() > u8::MAX as usize + 1 {
            return Err(DatabaseError::config("too many long values for one LVAL page"));
        }
        Ok(header.to_vec())
    }
}

fn encode_row(
    table: &TableBuilder,
    format: &FormatConstants,
    values: &[Value],
    lval: &mut LvalWriter,
) -> Result<Vec<u8>> {
    let columns = &table.columns;
    if values.len() != columns.len() {
        return Err(DatabaseError::config(format!(
            "table '{}' has {} columns, row has {} values",
            table.name,
            columns.len(),
            values.len()
        )));
    }

    let count_size = format.row_column_count_size();
    let mut row = Vec::new();
    if format.is_jet4() {
        row.extend((columns.len() as u16).to_le_bytes());
    } else {
        let count = u8::try_from(columns.len())
            .map_err(|_| DatabaseError::config("Jet3 rows hold at most 255 columns"))?;
        row.push(count);
    }
    row.resize(count_size + table.fixed_len, 0);

    let mut mask = vec![0u8; columns.len().div_ceil(8)];
    let mut var_fields = Vec::with_capacity(table.var_count as usize);
    for (column, value) in columns.iter().zip(values) {
        let bit = column.row_column_number as usize;
        if column.column_type == ColumnType::Bool {
            match value {
                Value::Bool(true) => mask[bit / 8] |= 1 << (bit % 8),
                Value::Bool(false) | Value::Null => {}
                other => return Err(mismatch(column, other)),
            }
            continue;
        }
        if value.is_null() {
            if !column.is_fixed() {
                var_fields.push(Vec::new());
            }
            continue;
        }
        mask[bit / 8] |= 1 << (bit % 8);
        let field = encode_field(column, value, format, lval)?;
        if column.is_fixed() {
            let start = count_size + column.fixed_offset as usize;
            row[start..start + field.len()].copy_from_slice(&field);
        } else {
            var_fields.push(field);
        }
    }

    if table.var_count > 0 {
        let mut offsets = Vec::with_capacity(var_fields.len() + 1);
        for field in &var_fields {
            offsets.push(row.len());
            row.extend(field);
        }
        offsets.push(row.len());

        if format.is_jet4() {
            for offset in offsets.iter().rev() {
                row.extend((*offset as u16).to_le_bytes());
            }
            row.extend(table.var_count.to_le_bytes());
        } else {
            for offset in offsets.iter().rev() {
                let offset = u8::try_from(*offset)
                    .map_err(|_| DatabaseError::config("Jet3 fixture rows must stay under 256 bytes"))?;
                row.push(offset);
            }
            row.push(table.var_count as u8);
        }
    }
    row.extend(mask);

    if !format.is_jet4() && row.len() > 256 {
        return Err(DatabaseError::config("Jet3 fixture rows must stay under 256 bytes"));
    }
    Ok(row)
}

fn mismatch(column: &ColumnDef, value: &Value) -> DatabaseError {
    DatabaseError::type_mismatch(
        format!("fixture column '{}'", column.name),
        format!("{:?}", column.column_type),
        value.data_type().to_string(),
    )
}

fn encode_field(
    column: &ColumnDef,
    value: &Value,
    format: &FormatConstants,
    lval: &mut LvalWriter,
) -> Result<Vec<u8>> {
    let bad = || mismatch(column, value);
    let field = match (column.column_type, value) {
        (ColumnType::Byte, Value::Int(v)) => vec![u8::try_from(*v).map_err(|_| bad())?],
        (ColumnType::Int, Value::Int(v)) => i16::try_from(*v).map_err(|_| bad())?.to_le_bytes().to_vec(),
        (ColumnType::LongInt, Value::Int(v)) => v.to_le_bytes().to_vec(),
        (ColumnType::LongInt, Value::Long(v)) => i32::try_from(*v).map_err(|_| bad())?.to_le_bytes().to_vec(),
        (ColumnType::Money, Value::Double(v)) => ((v * 10_000.0).round() as i64).to_le_bytes().to_vec(),
        (ColumnType::Float, Value::Double(v)) => (*v as f32).to_le_bytes().to_vec(),
        (ColumnType::Double, Value::Double(v)) => v.to_le_bytes().to_vec(),
        (ColumnType::DateTime, Value::DateTime(dt)) => to_jet_datetime(dt).ok_or_else(bad)?.to_le_bytes().to_vec(),
        (ColumnType::Guid, Value::Text(text)) => encode_guid(text).ok_or_else(bad)?,
        (ColumnType::Numeric, Value::Int(v)) => encode_numeric(*v as i128 * 10i128.pow(column.scale as u32)),
        (ColumnType::Numeric, Value::Long(v)) => encode_numeric(*v as i128 * 10i128.pow(column.scale as u32)),
        (ColumnType::Numeric, Value::Double(v)) => {
            encode_numeric((v * 10f64.powi(column.scale as i32)).round() as i128)
        }
        (ColumnType::Text, Value::Text(text)) => encode_text(text, format, column.compressed_unicode),
        (ColumnType::Binary | ColumnType::Unknown(_), Value::Binary(data)) => data.clone(),
        (ColumnType::Memo, Value::Text(text)) => {
            lval.store(encode_text(text, format, column.compressed_unicode))?
        }
        (ColumnType::Ole, Value::Binary(data)) => lval.store(data.clone())?,
        _ => return Err(bad()),
    };
    Ok(field)
}

/// Sign byte, then the magnitude as four little-endian words, most
/// significant word first.
fn encode_numeric(value: i128) -> Vec<u8> {
    let magnitude = value.unsigned_abs();
    let mut out = vec![if value < 0 { 0x80 } else { 0x00 }];
    for word in 0..4 {
        let shift = 32 * (3 - word);
        out.extend(((magnitude >> shift) as u32).to_le_bytes());
    }
    out
}

/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`; the first three groups are
/// stored little-endian.
fn encode_guid(text: &str) -> Option<Vec<u8>> {
    let hex: String = text.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if hex.len() != 32 {
        return None;
    }
    let mut raw = (0..16)
        .map(|i| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    raw[0..4].reverse();
    raw[4..6].reverse();
    raw[6..8].reverse();
    Some(raw)
}
