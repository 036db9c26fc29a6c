use crate::{
    storage::format::JetVersion,
    types::{
        error::{DatabaseError, Result},
        page::PageKind,
    },
    utils::bytes,
};

pub const JET_MAGIC: &[u8] = b"Standard Jet DB";
pub const ACE_MAGIC: &[u8] = b"Standard ACE DB";

const MAGIC_OFFSET: usize = 4;
const VERSION_OFFSET: usize = 0x14;

/// The parts of page 0 this reader relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHeader {
    pub version: JetVersion,
    pub raw_version: u32,
    pub ace: bool,
}

impl DatabaseHeader {
    /// Page 0 is decoded before the page size is known; only the leading
    /// signature and version fields are required.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < VERSION_OFFSET + 4 {
            return Err(DatabaseError::corrupt_page(0, "header too short"));
        }
        if bytes[0] != PageKind::Header.as_u8() {
            return Err(DatabaseError::corrupt_page(
                0,
                format!("header page has type 0x{:02x}", bytes[0]),
            ));
        }

        let magic = &bytes[MAGIC_OFFSET..MAGIC_OFFSET + JET_MAGIC.len()];
        let ace = magic == ACE_MAGIC;
        if magic != JET_MAGIC && !ace {
            return Err(DatabaseError::UnsupportedFormat {
                version: "missing Jet signature".to_string(),
            });
        }

        let raw_version = bytes::u32_le(bytes, VERSION_OFFSET)
            .ok_or_else(|| DatabaseError::corrupt_page(0, "header too short"))?;
        let version = match raw_version {
            0 => JetVersion::Jet3,
            1 | 2 | 3 | 0x0103 => JetVersion::Jet4,
            other => {
                return Err(DatabaseError::UnsupportedFormat {
                    version: format!("unknown Jet version {}", other),
                });
            }
        };

        Ok(Self {
            version,
            raw_version,
            ace,
        })
    }

    pub fn write_to(&self, page: &mut [u8]) {
        page[0] = PageKind::Header.as_u8();
        page[1] = 0x01;
        let magic = if self.ace { ACE_MAGIC } else { JET_MAGIC };
        page[MAGIC_OFFSET..MAGIC_OFFSET + magic.len()].copy_from_slice(magic);
        page[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&self.raw_version.to_le_bytes());
    }
}
