//! Usage maps record which pages belong to a table.
//!
//! A map is stored as a row on a data page. Its first byte selects the
//! layout:
//! - type 0: `start_page: u32` followed by a bitmap; bit `i` marks page
//!   `start_page + i`.
//! - type 1: a list of `u32` map-page numbers. Map page `j` holds a bitmap
//!   from byte 4 covering pages `j * (page_size - 4) * 8` onwards.

use crate::{
    storage::{page_reader::PageReader, row_offsets},
    types::{
        PageId,
        error::{DatabaseError, Result},
        page::PageKind,
    },
    utils::bytes,
};

pub const MAP_INLINE: u8 = 0x00;
pub const MAP_REFERENCE: u8 = 0x01;

const MAP_PAGE_BITMAP_OFFSET: usize = 4;
const PAGE_OVERFLOW: &str = "usage map page number overflows";

pub fn read_usage_map(reader: &PageReader, map_page: PageId, map_row: usize) -> Result<Vec<PageId>> {
    let page = reader.read_page_of_kind(map_page, PageKind::Data)?;
    let slot = row_offsets::row_slot(&page, reader.format(), map_row).map_err(|e| {
        DatabaseError::corrupt_page(map_page, format!("usage map row unreadable: {}", e))
    })?;
    let map = &page.data[slot.range];
    decode_usage_map(reader, map_page, map)
}

fn decode_usage_map(reader: &PageReader, map_page: PageId, map: &[u8]) -> Result<Vec<PageId>> {
    let map_type = *map
        .first()
        .ok_or_else(|| DatabaseError::corrupt_page(map_page, "empty usage map"))?;

    match map_type {
        MAP_INLINE => {
            let start = bytes::u32_le(map, 1)
                .ok_or_else(|| DatabaseError::corrupt_page(map_page, "usage map too short"))?;
            pages_from_bitmap(&map[5..], start)
                .ok_or_else(|| DatabaseError::corrupt_page(map_page, PAGE_OVERFLOW))
        }
        MAP_REFERENCE => {
            let bits_per_page = (reader.page_size() - MAP_PAGE_BITMAP_OFFSET) as u32 * 8;
            let mut pages = Vec::new();
            for (j, entry) in map[1..].chunks_exact(4).enumerate() {
                let map_page_id = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]);
                if map_page_id == 0 {
                    continue;
                }
                let bitmap_page = reader.read_page_of_kind(map_page_id, PageKind::UsageMap)?;
                let overflow = || DatabaseError::corrupt_page(map_page, PAGE_OVERFLOW);
                let base = u32::try_from(j)
                    .ok()
                    .and_then(|j| j.checked_mul(bits_per_page))
                    .ok_or_else(overflow)?;
                pages.extend(
                    pages_from_bitmap(&bitmap_page.data[MAP_PAGE_BITMAP_OFFSET..], base)
                        .ok_or_else(overflow)?,
                );
            }
            Ok(pages)
        }
        other => Err(DatabaseError::corrupt_page(
            map_page,
            format!("unknown usage map type {}", other),
        )),
    }
}

/// Page numbers of the set bits, or `None` when one of them does not fit a
/// `PageId`.
pub fn pages_from_bitmap(bitmap: &[u8], first_page: PageId) -> Option<Vec<PageId>> {
    let mut pages = Vec::new();
    for (byte_index, byte) in bitmap.iter().enumerate() {
        if *byte == 0 {
            continue;
        }
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                let offset = PageId::try_from(byte_index * 8 + bit).ok()?;
                pages.push(first_page.checked_add(offset)?);
            }
        }
    }
    Some(pages)
}

/// Builds an inline (type 0) map covering `pages`.
pub fn encode_inline_map(pages: &[PageId]) -> Vec<u8> {
    let start = pages.iter().copied().min().unwrap_or(0);
    let span = pages.iter().map(|p| p - start + 1).max().unwrap_or(0) as usize;
    let mut map = vec![MAP_INLINE];
    map.extend_from_slice(&start.to_le_bytes());
    let mut bitmap = vec![0u8; span.div_ceil(8)];
    for page in pages {
        let bit = (page - start) as usize;
        bitmap[bit / 8] |= 1 << (bit % 8);
    }
    map.extend(bitmap);
    map
}
