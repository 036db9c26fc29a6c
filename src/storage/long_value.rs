//! Memo and OLE values ("long values").
//!
//! The row holds a 12-byte header: a `u32` whose low 30 bits give the value
//! length and whose top bits select the storage, then a 4-byte row pointer
//! (`row: u8`, `page: u24`) and 4 unused bytes.
//! - `0x80` flag: the data follows the header inside the row;
//! - `0x40` flag: the data is one row on an LVAL page;
//! - no flag: a chain of LVAL rows, each starting with the pointer to the
//!   next row (page 0 ends the chain).

use crate::{
    storage::{page_reader::PageReader, row_offsets},
    types::{PageId, error::Result},
    utils::bytes,
};

pub const LVAL_HEADER_SIZE: usize = 12;
pub const LVAL_INLINE: u32 = 0x8000_0000;
pub const LVAL_SINGLE_PAGE: u32 = 0x4000_0000;
const LVAL_LENGTH_MASK: u32 = 0x3FFF_FFFF;

/// Failure reasons become row-level decode errors in the caller.
pub fn read_long_value(
    reader: &PageReader,
    field: &[u8],
    max_chain: usize,
) -> std::result::Result<Vec<u8>, String> {
    let header = bytes::u32_le(field, 0)
        .filter(|_| field.len() >= LVAL_HEADER_SIZE)
        .ok_or_else(|| format!("long value header needs {} bytes", LVAL_HEADER_SIZE))?;
    let length = (header & LVAL_LENGTH_MASK) as usize;

    if header & LVAL_INLINE != 0 {
        let data = &field[LVAL_HEADER_SIZE..];
        if data.len() < length {
            return Err(format!(
                "inline long value declares {} bytes, row holds {}",
                length,
                data.len()
            ));
        }
        return Ok(data[..length].to_vec());
    }

    let (mut row, mut page) = row_pointer(field, 4)?;
    let mut out = Vec::with_capacity(length);

    if header & LVAL_SINGLE_PAGE != 0 {
        let data = lval_row(reader, page, row).map_err(|e| e.to_string())?;
        out.extend_from_slice(&data);
    } else {
        let mut hops = 0;
        while page != 0 && out.len() < length {
            hops += 1;
            if hops > max_chain {
                return Err(format!("long value chain exceeds {} pages", max_chain));
            }
            let data = lval_row(reader, page, row).map_err(|e| e.to_string())?;
            let (next_row, next_page) = row_pointer(&data, 0)?;
            out.extend_from_slice(&data[4..]);
            row = next_row;
            page = next_page;
        }
    }

    if out.len() < length {
        return Err(format!(
            "long value declares {} bytes, found {}",
            length,
            out.len()
        ));
    }
    out.truncate(length);
    Ok(out)
}

fn row_pointer(buf: &[u8], at: usize) -> std::result::Result<(usize, PageId), String> {
    let row = bytes::u8_at(buf, at).ok_or("truncated long value pointer")?;
    let page = bytes::u24_le(buf, at + 1).ok_or("truncated long value pointer")?;
    Ok((row as usize, page))
}

fn lval_row(reader: &PageReader, page_id: PageId, row: usize) -> Result<Vec<u8>> {
    let page = reader.read_page_of_kind(page_id, crate::types::page::PageKind::Data)?;
    let slot = row_offsets::row_slot(&page, reader.format(), row)?;
    Ok(page.data[slot.range].to_vec())
}

/// Header for an inline value of `length` bytes.
pub fn inline_header(length: usize) -> [u8; LVAL_HEADER_SIZE] {
    let mut header = [0u8; LVAL_HEADER_SIZE];
    header[..4].copy_from_slice(&(length as u32 | LVAL_INLINE).to_le_bytes());
    header
}

/// Header pointing at `row` on `page`, single-page or chained.
pub fn pointer_header(length: usize, page: PageId, row: u8, single: bool) -> [u8; LVAL_HEADER_SIZE] {
    let flags = if single { LVAL_SINGLE_PAGE } else { 0 };
    let mut header = [0u8; LVAL_HEADER_SIZE];
    header[..4].copy_from_slice(&(length as u32 | flags).to_le_bytes());
    header[4] = row;
    header[5..8].copy_from_slice(&page.to_le_bytes()[..3]);
    header
}
