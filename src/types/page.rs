use crate::{
    types::{
        PageId,
        error::{DatabaseError, Result},
    },
    utils::bytes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Header = 0x00,
    Data = 0x01,
    TableDef = 0x02,
    IndexNode = 0x03,
    IndexLeaf = 0x04,
    UsageMap = 0x05,
}

impl PageKind {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(PageKind::Header),
            0x01 => Ok(PageKind::Data),
            0x02 => Ok(PageKind::TableDef),
            0x03 => Ok(PageKind::IndexNode),
            0x04 => Ok(PageKind::IndexLeaf),
            0x05 => Ok(PageKind::UsageMap),
            _ => Err(DatabaseError::InvalidPageType(value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/*
 * Data page layout (Jet4 offsets, Jet3 in brackets)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │ kind(1)=0x01 | unknown(1) | free_space(2) | tdef_page(4)        │
 * │ [Jet4 only: unknown(4)] | row_count(2) @0x0C [@0x08]            │
 * │ row offsets: [slot0(2)] [slot1(2)] ...                          │
 * │   bit 0x8000 = lookup, bit 0x4000 = deleted                     │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    FREE SPACE                                   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  [...row N...] [...row 1...] [...row 0...]        <- page end   │
 * └─────────────────────────────────────────────────────────────────┘
 * Row i occupies [offset(i), offset(i-1) - 1]; row 0 ends at the last
 * byte of the page.
 */

/// A raw page as read from the file. Pages are shared through `Arc` once
/// read and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: PageId,
    pub kind: PageKind,
    pub data: Vec<u8>,
}

impl Page {
    pub fn from_bytes(id: PageId, data: Vec<u8>) -> Result<Self> {
        let tag = *data
            .first()
            .ok_or_else(|| DatabaseError::corrupt_page(id, "empty page"))?;
        let kind = PageKind::from_u8(tag).map_err(|_| {
            DatabaseError::corrupt_page(id, format!("unknown page type 0x{:02x}", tag))
        })?;
        Ok(Self { id, kind, data })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn expect_kind(&self, kind: PageKind) -> Result<()> {
        if self.kind != kind {
            return Err(DatabaseError::corrupt_page(
                self.id,
                format!("expected {:?} page, found {:?}", kind, self.kind),
            ));
        }
        Ok(())
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        bytes::u8_at(&self.data, offset).ok_or_else(|| self.out_of_bounds(offset, 1))
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        bytes::u16_le(&self.data, offset).ok_or_else(|| self.out_of_bounds(offset, 2))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        bytes::u32_le(&self.data, offset).ok_or_else(|| self.out_of_bounds(offset, 4))
    }

    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<&[u8]> {
        bytes::slice(&self.data, offset, len).ok_or_else(|| self.out_of_bounds(offset, len))
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> DatabaseError {
        DatabaseError::corrupt_page(
            self.id,
            format!(
                "field of {} bytes at offset {} exceeds page size {}",
                len,
                offset,
                self.data.len()
            ),
        )
    }
}
