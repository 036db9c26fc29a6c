use serde::{Deserialize, Serialize};

use crate::{
    config::ReaderConfig,
    storage::{
        format::FormatConstants,
        page_reader::PageReader,
        text::{decode_latin1, decode_text},
        usage_map,
    },
    types::{
        PageId,
        error::{DatabaseError, Result},
        page::PageKind,
    },
    utils::bytes,
};

const TDEF_CONTINUATION_HEADER: usize = 8;
const TDEF_NEXT_PAGE_OFFSET: usize = 4;
const JET4_TABLE_TYPE_OFFSET: usize = 40;

pub const COLUMN_FLAG_FIXED: u8 = 0x01;
pub const COLUMN_FLAG_NULLABLE: u8 = 0x02;
pub const COLUMN_FLAG_AUTONUMBER: u8 = 0x04;
pub const COLUMN_MISC_COMPRESSED_UNICODE: u8 = 0x01;

pub const INDEX_TYPE_PRIMARY: u8 = 0x01;

/// On-disk column type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Byte,
    Int,
    LongInt,
    Money,
    Float,
    Double,
    DateTime,
    Binary,
    Text,
    Ole,
    Memo,
    Guid,
    Numeric,
    Unknown(u8),
}

impl ColumnType {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x01 => ColumnType::Bool,
            0x02 => ColumnType::Byte,
            0x03 => ColumnType::Int,
            0x04 => ColumnType::LongInt,
            0x05 => ColumnType::Money,
            0x06 => ColumnType::Float,
            0x07 => ColumnType::Double,
            0x08 => ColumnType::DateTime,
            0x09 => ColumnType::Binary,
            0x0A => ColumnType::Text,
            0x0B => ColumnType::Ole,
            0x0C => ColumnType::Memo,
            0x0F => ColumnType::Guid,
            0x10 => ColumnType::Numeric,
            other => ColumnType::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ColumnType::Bool => 0x01,
            ColumnType::Byte => 0x02,
            ColumnType::Int => 0x03,
            ColumnType::LongInt => 0x04,
            ColumnType::Money => 0x05,
            ColumnType::Float => 0x06,
            ColumnType::Double => 0x07,
            ColumnType::DateTime => 0x08,
            ColumnType::Binary => 0x09,
            ColumnType::Text => 0x0A,
            ColumnType::Ole => 0x0B,
            ColumnType::Memo => 0x0C,
            ColumnType::Guid => 0x0F,
            ColumnType::Numeric => 0x10,
            ColumnType::Unknown(code) => *code,
        }
    }

    /// Storage width of fixed-length types. Booleans live in the null mask
    /// and take no row space.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            ColumnType::Bool => Some(0),
            ColumnType::Byte => Some(1),
            ColumnType::Int => Some(2),
            ColumnType::LongInt | ColumnType::Float => Some(4),
            ColumnType::Money | ColumnType::Double | ColumnType::DateTime => Some(8),
            ColumnType::Guid => Some(16),
            ColumnType::Numeric => Some(17),
            _ => None,
        }
    }

    pub fn is_long_value(&self) -> bool {
        matches!(self, ColumnType::Memo | ColumnType::Ole)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    /// Ordinal position in the table.
    pub number: u16,
    /// Index of the column's bit in a row's null mask.
    pub row_column_number: u16,
    /// Slot in the variable-offset table; meaningful for variable columns.
    pub var_column_number: u16,
    /// Offset within the fixed area; meaningful for fixed columns.
    pub fixed_offset: u16,
    pub size: u16,
    pub precision: u8,
    pub scale: u8,
    pub flags: u8,
    pub compressed_unicode: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let size = column_type.fixed_size().unwrap_or(255) as u16;
        let flags = if column_type.fixed_size().is_some() {
            COLUMN_FLAG_FIXED | COLUMN_FLAG_NULLABLE
        } else {
            COLUMN_FLAG_NULLABLE
        };
        Self {
            name: name.into(),
            column_type,
            number: 0,
            row_column_number: 0,
            var_column_number: 0,
            fixed_offset: 0,
            size,
            precision: 0,
            scale: 0,
            flags,
            compressed_unicode: false,
        }
    }

    pub fn with_size(mut self, size: u16) -> Self {
        self.size = size;
        self
    }

    pub fn with_scale(mut self, precision: u8, scale: u8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compressed_unicode = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.flags &= !COLUMN_FLAG_NULLABLE;
        self
    }

    pub fn autonumber(mut self) -> Self {
        self.flags |= COLUMN_FLAG_AUTONUMBER;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.flags & COLUMN_FLAG_FIXED != 0
    }

    pub fn is_nullable(&self) -> bool {
        self.flags & COLUMN_FLAG_NULLABLE != 0
    }

    pub fn is_autonumber(&self) -> bool {
        self.flags & COLUMN_FLAG_AUTONUMBER != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub number: u32,
    pub primary: bool,
}

/// Schema of one table plus the data pages its usage map lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub definition_page: PageId,
    pub table_type: u8,
    pub row_count: u32,
    pub columns: Vec<ColumnDef>,
    pub indexes: Vec<IndexDef>,
    pub data_pages: Vec<PageId>,
}

impl TableDef {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_variable_columns(&self) -> bool {
        self.columns.iter().any(|c| !c.is_fixed())
    }

    /// Loads a table definition starting at `page_id`, following the
    /// continuation chain and resolving the usage map.
    pub fn read(
        reader: &PageReader,
        page_id: PageId,
        name: &str,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let format = reader.format();
        let buffer = read_definition_chain(reader, page_id, config)?;
        let mut def = parse_definition(&buffer, format, page_id, name)?;

        let map_row = bytes::u8_at(&buffer, format.tab_usage_map_offset)
            .ok_or_else(|| truncated(page_id, "usage map pointer"))?;
        let map_page = bytes::u24_le(&buffer, format.tab_first_dpg_offset)
            .ok_or_else(|| truncated(page_id, "usage map pointer"))?;
        def.data_pages = usage_map::read_usage_map(reader, map_page, map_row as usize)?;

        tracing::debug!(
            "Loaded table '{}' from page {}: {} columns, {} rows, {} data pages",
            def.name,
            page_id,
            def.columns.len(),
            def.row_count,
            def.data_pages.len()
        );
        Ok(def)
    }
}

fn truncated(page_id: PageId, what: &str) -> DatabaseError {
    DatabaseError::corrupt_page(page_id, format!("table definition truncated at {}", what))
}

/// Concatenates the first page with every continuation page minus its
/// 8-byte header.
fn read_definition_chain(
    reader: &PageReader,
    first_page: PageId,
    config: &ReaderConfig,
) -> Result<Vec<u8>> {
    let page = reader.read_page_of_kind(first_page, PageKind::TableDef)?;
    let mut buffer = page.data.clone();
    let mut next = page.u32_at(TDEF_NEXT_PAGE_OFFSET)?;
    let mut followed = 1;

    while next != 0 {
        if followed >= config.max_tdef_pages {
            return Err(DatabaseError::CorruptCatalog {
                reason: format!(
                    "table definition at page {} spans more than {} pages",
                    first_page, config.max_tdef_pages
                ),
            });
        }
        let page = reader.read_page_of_kind(next, PageKind::TableDef)?;
        buffer.extend_from_slice(&page.data[TDEF_CONTINUATION_HEADER..]);
        next = page.u32_at(TDEF_NEXT_PAGE_OFFSET)?;
        followed += 1;
    }
    Ok(buffer)
}

fn parse_definition(
    buf: &[u8],
    format: &FormatConstants,
    page_id: PageId,
    name: &str,
) -> Result<TableDef> {
    let u8_field = |offset: usize, what: &str| {
        bytes::u8_at(buf, offset).ok_or_else(|| truncated(page_id, what))
    };
    let u16_field = |offset: usize, what: &str| {
        bytes::u16_le(buf, offset).ok_or_else(|| truncated(page_id, what))
    };
    let u32_field = |offset: usize, what: &str| {
        bytes::u32_le(buf, offset).ok_or_else(|| truncated(page_id, what))
    };

    let row_count = u32_field(format.tab_num_rows_offset, "row count")?;
    let num_cols = u16_field(format.tab_num_cols_offset, "column count")? as usize;
    let num_idxs = u32_field(format.tab_num_idxs_offset, "index count")? as usize;
    let num_ridxs = u32_field(format.tab_num_ridxs_offset, "real index count")? as usize;
    let table_type = if format.is_jet4() {
        u8_field(JET4_TABLE_TYPE_OFFSET, "table type")?
    } else {
        0
    };

    if num_ridxs > buf.len() || num_idxs > buf.len() || num_cols > buf.len() {
        return Err(DatabaseError::corrupt_page(
            page_id,
            "implausible column or index count",
        ));
    }

    let mut pos = format.tab_cols_start_offset + num_ridxs * format.tab_ridx_entry_size;
    let mut columns = Vec::with_capacity(num_cols);
    for _ in 0..num_cols {
        let entry = bytes::slice(buf, pos, format.tab_col_entry_size)
            .ok_or_else(|| truncated(page_id, "column entry"))?;
        columns.push(parse_column_entry(entry, format, page_id)?);
        pos += format.tab_col_entry_size;
    }

    for column in columns.iter_mut() {
        let (name, next) = read_name(buf, pos, format)
            .ok_or_else(|| truncated(page_id, "column name"))?;
        column.name = name;
        pos = next;
    }
    columns.sort_by_key(|c| c.number);

    // Real-index column descriptors carry nothing a full scan needs.
    pos += num_ridxs * format.real_idx_info_size;

    let index_number_offset = if format.is_jet4() { 4 } else { 0 };
    let mut indexes = Vec::with_capacity(num_idxs);
    for _ in 0..num_idxs {
        let entry = bytes::slice(buf, pos, format.tab_idx_entry_size)
            .ok_or_else(|| truncated(page_id, "index entry"))?;
        let number = bytes::u32_le(entry, index_number_offset)
            .ok_or_else(|| truncated(page_id, "index entry"))?;
        let primary = entry[format.tab_idx_type_offset] == INDEX_TYPE_PRIMARY;
        indexes.push(IndexDef {
            name: String::new(),
            number,
            primary,
        });
        pos += format.tab_idx_entry_size;
    }
    for index in indexes.iter_mut() {
        let (name, next) = read_name(buf, pos, format)
            .ok_or_else(|| truncated(page_id, "index name"))?;
        index.name = name;
        pos = next;
    }

    Ok(TableDef {
        name: name.to_string(),
        definition_page: page_id,
        table_type,
        row_count,
        columns,
        indexes,
        data_pages: Vec::new(),
    })
}

fn parse_column_entry(entry: &[u8], format: &FormatConstants, page_id: PageId) -> Result<ColumnDef> {
    let field16 = |offset: usize| bytes::u16_le(entry, offset).unwrap_or(0);
    let column_type = ColumnType::from_u8(entry[format.col_type_offset]);
    let flags = entry[format.col_flags_offset];
    let compressed_unicode = format
        .col_misc_flags_offset
        .map(|offset| entry[offset] & COLUMN_MISC_COMPRESSED_UNICODE != 0)
        .unwrap_or(false);

    let column = ColumnDef {
        name: String::new(),
        column_type,
        number: field16(format.col_num_offset),
        row_column_number: field16(format.tab_row_col_num_offset),
        var_column_number: field16(format.tab_col_offset_var),
        fixed_offset: field16(format.tab_col_offset_fixed),
        size: field16(format.col_size_offset),
        precision: entry[format.col_prec_offset],
        scale: entry[format.col_scale_offset],
        flags,
        compressed_unicode,
    };

    if column.is_fixed() {
        if let Some(width) = column_type.fixed_size() {
            if width > 0 && column.size as usize != width {
                return Err(DatabaseError::corrupt_page(
                    page_id,
                    format!(
                        "column {} of type {:?} declares width {}, expected {}",
                        column.number, column_type, column.size, width
                    ),
                ));
            }
        }
    }
    Ok(column)
}

/// Jet4 names are a u16 byte length followed by UCS-2; Jet3 names are a u8
/// length followed by single-byte text.
fn read_name(buf: &[u8], pos: usize, format: &FormatConstants) -> Option<(String, usize)> {
    if format.is_jet4() {
        let len = bytes::u16_le(buf, pos)? as usize;
        let raw = bytes::slice(buf, pos + 2, len)?;
        Some((decode_text(raw, format).ok()?, pos + 2 + len))
    } else {
        let len = bytes::u8_at(buf, pos)? as usize;
        let raw = bytes::slice(buf, pos + 1, len)?;
        Some((decode_latin1(raw), pos + 1 + len))
    }
}

/// Serialized name in the layout `read_name` expects.
pub fn encode_name(name: &str, format: &FormatConstants) -> Vec<u8> {
    if format.is_jet4() {
        let raw: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let mut out = (raw.len() as u16).to_le_bytes().to_vec();
        out.extend(raw);
        out
    } else {
        let raw: Vec<u8> = name.chars().map(|c| c as u8).collect();
        let mut out = vec![raw.len() as u8];
        out.extend(raw);
        out
    }
}
