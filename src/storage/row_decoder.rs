use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::{
    storage::{
        format::FormatConstants,
        long_value,
        page_reader::PageReader,
        row_offsets,
        schema::{ColumnDef, ColumnType, TableDef},
        text::decode_column_text,
    },
    types::{
        error::{DatabaseError, Result},
        holder::{Holder, snapshot},
        page::Page,
        row::Row,
        value::Value,
    },
    utils::bytes,
};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/*
 * Jet4 row layout (Jet3 uses one-byte counts and offsets)
 * ┌────────────┬──────────────────┬────────────────┬──────────────────────┐
 * │ ncols (2)  │ fixed columns    │ variable data  │ trailer              │
 * └────────────┴──────────────────┴────────────────┴──────────────────────┘
 * trailer, read backwards from the row end:
 *   null mask (ceil(ncols / 8) bytes, set bit = value present)
 *   var_count (2)
 *   var offsets (2 each), offset[0] nearest the count, then end-of-data
 */

/// Decodes row slots of one table's data pages.
pub struct RowDecoder<'a> {
    table: &'a TableDef,
    reader: &'a PageReader,
    max_lval_chain: usize,
}

/// Row-relative layout of the variable-length area.
struct RowLayout {
    num_cols: usize,
    null_mask: std::ops::Range<usize>,
    var_offsets: Vec<usize>,
    data_end: usize,
}

impl<'a> RowDecoder<'a> {
    pub fn new(table: &'a TableDef, reader: &'a PageReader, max_lval_chain: usize) -> Self {
        Self {
            table,
            reader,
            max_lval_chain,
        }
    }

    fn format(&self) -> &FormatConstants {
        self.reader.format()
    }

    /// Decodes `slot` into a fresh row; `None` for deleted slots.
    pub fn decode_row(&self, page: &Page, slot: usize) -> Result<Option<Row>> {
        let mut holders = Holder::with_columns(self.table.columns.len());
        if !self.decode_into(page, slot, &mut holders)? {
            return Ok(None);
        }
        Ok(Some(Row::with_row_id(
            Row::make_row_id(page.id, slot),
            snapshot(&holders),
        )))
    }

    /// Writes the values of `slot` into `holders` (one per table column).
    /// Returns false, leaving the holders untouched, for deleted slots.
    pub fn decode_into(&self, page: &Page, slot: usize, holders: &mut [Holder]) -> Result<bool> {
        if holders.len() != self.table.columns.len() {
            return Err(DatabaseError::ColumnIndexOutOfBounds {
                index: holders.len(),
            });
        }
        let row_slot = row_offsets::row_slot(page, self.format(), slot)?;
        if row_slot.deleted {
            return Ok(false);
        }

        let row = &page.data[row_slot.range];
        let fail = |reason: String| DatabaseError::RowDecode {
            page_id: page.id,
            row: slot,
            reason,
        };
        let layout = self.layout(row).map_err(&fail)?;

        let mut values = Vec::with_capacity(self.table.columns.len());
        for column in &self.table.columns {
            values.push(self.decode_column(row, &layout, column).map_err(&fail)?);
        }
        for (holder, value) in holders.iter_mut().zip(values) {
            holder.set(value);
        }
        Ok(true)
    }

    fn layout(&self, row: &[u8]) -> std::result::Result<RowLayout, String> {
        let format = self.format();
        let count_size = format.row_column_count_size();
        let num_cols = if format.is_jet4() {
            bytes::u16_le(row, 0).map(|n| n as usize)
        } else {
            bytes::u8_at(row, 0).map(|n| n as usize)
        }
        .ok_or("row shorter than its column count")?;

        let bitmask_size = num_cols.div_ceil(8);
        if row.len() < count_size + bitmask_size {
            return Err(format!(
                "row of {} bytes cannot hold a {}-byte null mask",
                row.len(),
                bitmask_size
            ));
        }
        let null_mask = row.len() - bitmask_size..row.len();

        if !self.table.has_variable_columns() {
            return Ok(RowLayout {
                num_cols,
                null_mask: null_mask.clone(),
                var_offsets: Vec::new(),
                data_end: null_mask.start,
            });
        }

        let (var_offsets, trailer_start) = if format.is_jet4() {
            jet4_var_offsets(row, bitmask_size)?
        } else {
            jet3_var_offsets(row, bitmask_size)?
        };

        let mut previous = count_size;
        for offset in &var_offsets {
            if *offset < previous || *offset > trailer_start {
                return Err(format!(
                    "variable column offset {} outside data area {}..{}",
                    offset, count_size, trailer_start
                ));
            }
            previous = *offset;
        }

        Ok(RowLayout {
            num_cols,
            null_mask,
            var_offsets,
            data_end: trailer_start,
        })
    }

    fn is_present(&self, row: &[u8], layout: &RowLayout, column: &ColumnDef) -> bool {
        let bit = column.row_column_number as usize;
        if bit >= layout.num_cols {
            return false;
        }
        let mask = &row[layout.null_mask.clone()];
        mask[bit / 8] & (1 << (bit % 8)) != 0
    }

    fn decode_column(
        &self,
        row: &[u8],
        layout: &RowLayout,
        column: &ColumnDef,
    ) -> std::result::Result<Value, String> {
        if column.column_type == ColumnType::Bool {
            if column.row_column_number as usize >= layout.num_cols {
                return Ok(Value::Null);
            }
            return Ok(Value::Bool(self.is_present(row, layout, column)));
        }
        if !self.is_present(row, layout, column) {
            return Ok(Value::Null);
        }

        let field = if column.is_fixed() {
            let width = column
                .column_type
                .fixed_size()
                .unwrap_or(column.size as usize);
            let start = self.format().row_column_count_size() + column.fixed_offset as usize;
            if start + width > layout.data_end {
                return Err(format!(
                    "fixed column '{}' at {}..{} runs past row data end {}",
                    column.name,
                    start,
                    start + width,
                    layout.data_end
                ));
            }
            &row[start..start + width]
        } else {
            let index = column.var_column_number as usize;
            match (layout.var_offsets.get(index), layout.var_offsets.get(index + 1)) {
                (Some(&start), Some(&end)) => &row[start..end],
                // Rows written before the column was added carry no slot for it.
                _ => return Ok(Value::Null),
            }
        };

        self.decode_field(field, column)
    }

    fn decode_field(&self, field: &[u8], column: &ColumnDef) -> std::result::Result<Value, String> {
        let short = || format!("column '{}' truncated", column.name);
        let value = match column.column_type {
            ColumnType::Bool => Value::Bool(true),
            ColumnType::Byte => Value::Int(bytes::u8_at(field, 0).ok_or_else(short)? as i32),
            ColumnType::Int => Value::Int(bytes::i16_le(field, 0).ok_or_else(short)? as i32),
            ColumnType::LongInt => Value::Int(bytes::i32_le(field, 0).ok_or_else(short)?),
            ColumnType::Money => {
                Value::Double(bytes::i64_le(field, 0).ok_or_else(short)? as f64 / 10_000.0)
            }
            ColumnType::Float => Value::Double(bytes::f32_le(field, 0).ok_or_else(short)? as f64),
            ColumnType::Double => Value::Double(bytes::f64_le(field, 0).ok_or_else(short)?),
            ColumnType::DateTime => {
                Value::DateTime(jet_datetime(bytes::f64_le(field, 0).ok_or_else(short)?)?)
            }
            ColumnType::Guid => Value::Text(format_guid(field).ok_or_else(short)?),
            ColumnType::Numeric => decode_numeric(field, column.scale).ok_or_else(short)??,
            ColumnType::Text => {
                Value::Text(decode_column_text(field, self.format(), column.compressed_unicode)?)
            }
            ColumnType::Binary | ColumnType::Unknown(_) => Value::Binary(field.to_vec()),
            ColumnType::Memo => {
                let data = self.long_value(field)?;
                Value::Text(decode_column_text(&data, self.format(), column.compressed_unicode)?)
            }
            ColumnType::Ole => Value::Binary(self.long_value(field)?),
        };
        Ok(value)
    }

    fn long_value(&self, field: &[u8]) -> std::result::Result<Vec<u8>, String> {
        if field.is_empty() {
            return Ok(Vec::new());
        }
        long_value::read_long_value(self.reader, field, self.max_lval_chain)
    }
}

/// Jet4 trailer: `var_count: u16` just before the null mask, then one more
/// `u16` offset than there are variable columns, growing towards the front.
fn jet4_var_offsets(row: &[u8], bitmask_size: usize) -> std::result::Result<(Vec<usize>, usize), String> {
    let truncated = || "variable offset table truncated".to_string();
    let count_at = row
        .len()
        .checked_sub(bitmask_size + 2)
        .ok_or_else(truncated)?;
    let var_count = bytes::u16_le(row, count_at).ok_or_else(truncated)? as usize;

    let mut offsets = Vec::with_capacity(var_count + 1);
    for i in 0..=var_count {
        let at = count_at.checked_sub(2 * (i + 1)).ok_or_else(truncated)?;
        offsets.push(bytes::u16_le(row, at).ok_or_else(truncated)? as usize);
    }
    let trailer_start = count_at - 2 * (var_count + 1);
    Ok((offsets, trailer_start))
}

/// Jet3 trailer: `var_count: u8` before the null mask, one-byte offsets and
/// a jump table whose entries name the first column past each 256-byte
/// boundary.
fn jet3_var_offsets(row: &[u8], bitmask_size: usize) -> std::result::Result<(Vec<usize>, usize), String> {
    let truncated = || "variable offset table truncated".to_string();
    let row_end = row.len() - 1;
    let count_at = row_end.checked_sub(bitmask_size).ok_or_else(truncated)?;
    let var_count = bytes::u8_at(row, count_at).ok_or_else(truncated)? as usize;

    let mut num_jumps = (row.len() - 1) / 256;
    let col_ptr = count_at.checked_sub(num_jumps + 1).ok_or_else(truncated)?;
    if num_jumps > 0 && col_ptr.saturating_sub(var_count) / 256 < num_jumps {
        num_jumps -= 1;
    }

    let mut offsets = Vec::with_capacity(var_count + 1);
    let mut jumps_used = 0;
    for i in 0..=var_count {
        while jumps_used < num_jumps {
            let jump_at = count_at.checked_sub(jumps_used + 1).ok_or_else(truncated)?;
            if row[jump_at] as usize != i {
                break;
            }
            jumps_used += 1;
        }
        let at = col_ptr.checked_sub(i).ok_or_else(truncated)?;
        offsets.push(row[at] as usize + jumps_used * 256);
    }
    let trailer_start = col_ptr - var_count;
    Ok((offsets, trailer_start))
}

fn jet_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Jet dates are days since 1899-12-30; the fraction is the time of day and
/// is positive even for dates before the epoch.
pub fn jet_datetime(raw: f64) -> std::result::Result<NaiveDateTime, String> {
    if !raw.is_finite() {
        return Err(format!("invalid date value {}", raw));
    }
    let epoch = jet_epoch().ok_or("date epoch out of range")?;
    let days = raw.trunc();
    let millis = ((raw - days).abs() * MILLIS_PER_DAY).round() as i64;
    let offset = TimeDelta::try_days(days as i64)
        .and_then(|d| d.checked_add(&TimeDelta::try_milliseconds(millis)?))
        .ok_or_else(|| format!("date value {} out of range", raw))?;
    epoch
        .checked_add_signed(offset)
        .ok_or_else(|| format!("date value {} out of range", raw))
}

/// Inverse of `jet_datetime`.
pub fn to_jet_datetime(value: &NaiveDateTime) -> Option<f64> {
    let total = value.signed_duration_since(jet_epoch()?).num_milliseconds();
    let day = total.div_euclid(MILLIS_PER_DAY as i64);
    let fraction = total.rem_euclid(MILLIS_PER_DAY as i64) as f64 / MILLIS_PER_DAY;
    Some(if day < 0 {
        day as f64 - fraction
    } else {
        day as f64 + fraction
    })
}

fn format_guid(field: &[u8]) -> Option<String> {
    let b = bytes::slice(field, 0, 16)?;
    Some(format!(
        "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
        bytes::u32_le(b, 0)?,
        bytes::u16_le(b, 4)?,
        bytes::u16_le(b, 6)?,
        b[8],
        b[9],
        b[10],
        b[11],
        b[12],
        b[13],
        b[14],
        b[15]
    ))
}

/// Numeric columns: sign byte (0x80 = negative) then a 128-bit magnitude as
/// four little-endian `u32` words, most significant word first.
fn decode_numeric(field: &[u8], scale: u8) -> Option<std::result::Result<Value, String>> {
    let sign = bytes::u8_at(field, 0)?;
    let mut magnitude: u128 = 0;
    for word in 0..4 {
        magnitude = (magnitude << 32) | bytes::u32_le(field, 1 + word * 4)? as u128;
    }
    let negative = sign & 0x80 != 0;
    if scale == 0 {
        return Some(match i64::try_from(magnitude) {
            Ok(v) => Ok(Value::Long(if negative { -v } else { v })),
            Err(_) => Err(format!("numeric value {} exceeds 64 bits", magnitude)),
        });
    }
    let v = magnitude as f64 / 10f64.powi(scale as i32);
    Some(Ok(Value::Double(if negative { -v } else { v })))
}
