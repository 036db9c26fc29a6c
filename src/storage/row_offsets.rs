use std::ops::Range;

use crate::{
    storage::format::FormatConstants,
    types::{
        error::{DatabaseError, Result},
        page::Page,
    },
};

pub const ROW_FLAG_LOOKUP: u16 = 0x8000;
pub const ROW_FLAG_DELETED: u16 = 0x4000;

/// One entry of a data page's row-offset table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSlot {
    pub range: Range<usize>,
    pub deleted: bool,
    pub lookup: bool,
}

pub fn row_count(page: &Page, format: &FormatConstants) -> Result<usize> {
    Ok(page.u16_at(format.row_count_offset)? as usize)
}

fn raw_offset(page: &Page, format: &FormatConstants, slot: usize) -> Result<u16> {
    let at = format.row_count_offset + 2 + slot * 2;
    page.u16_at(at).map_err(|_| DatabaseError::RowDecode {
        page_id: page.id,
        row: slot,
        reason: format!("row-offset entry at {} lies outside the page", at),
    })
}

/// Resolves the byte range of `slot`. A row ends where the previous slot's
/// row starts; row 0 ends at the end of the page. Deleted slots are reported
/// without validating their range.
pub fn row_slot(page: &Page, format: &FormatConstants, slot: usize) -> Result<RowSlot> {
    let raw = raw_offset(page, format, slot)?;
    let deleted = raw & ROW_FLAG_DELETED != 0;
    let lookup = raw & ROW_FLAG_LOOKUP != 0;
    let start = (raw & format.row_offset_mask) as usize;

    let end = if slot == 0 {
        page.size()
    } else {
        (raw_offset(page, format, slot - 1)? & format.row_offset_mask) as usize
    };

    if deleted {
        return Ok(RowSlot {
            range: start..start,
            deleted,
            lookup,
        });
    }

    let table_end = format.row_count_offset + 2 + row_count(page, format)? * 2;
    let fail = |reason: String| DatabaseError::RowDecode {
        page_id: page.id,
        row: slot,
        reason,
    };
    if start >= page.size() || end > page.size() {
        return Err(fail(format!(
            "row offset {} past page boundary {}",
            start,
            page.size()
        )));
    }
    if start < table_end {
        return Err(fail(format!(
            "row offset {} overlaps the row-offset table",
            start
        )));
    }
    if start >= end {
        return Err(fail(format!(
            "row offset {} not below previous row start {}",
            start, end
        )));
    }

    Ok(RowSlot {
        range: start..end,
        deleted,
        lookup,
    })
}
