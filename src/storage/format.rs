use crate::types::{JET3_PAGE_SIZE, JET4_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JetVersion {
    /// Access 97: 2 KiB pages, single-byte text.
    Jet3,
    /// Access 2000 and later (including ACE): 4 KiB pages, UCS-2 text.
    Jet4,
}

/// Byte offsets that differ between Jet3 and Jet4 files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConstants {
    pub version: JetVersion,
    pub page_size: usize,
    pub row_count_offset: usize,
    pub row_offset_mask: u16,

    pub tab_num_rows_offset: usize,
    pub tab_num_cols_offset: usize,
    pub tab_num_idxs_offset: usize,
    pub tab_num_ridxs_offset: usize,
    pub tab_usage_map_offset: usize,
    pub tab_first_dpg_offset: usize,
    pub tab_cols_start_offset: usize,
    pub tab_ridx_entry_size: usize,
    pub tab_idx_entry_size: usize,
    pub tab_idx_type_offset: usize,
    pub tab_col_entry_size: usize,

    pub col_type_offset: usize,
    pub col_num_offset: usize,
    pub tab_col_offset_var: usize,
    pub tab_row_col_num_offset: usize,
    pub col_prec_offset: usize,
    pub col_scale_offset: usize,
    pub col_flags_offset: usize,
    pub col_misc_flags_offset: Option<usize>,
    pub tab_col_offset_fixed: usize,
    pub col_size_offset: usize,
    pub real_idx_info_size: usize,
}

impl FormatConstants {
    pub fn for_version(version: JetVersion) -> Self {
        match version {
            JetVersion::Jet4 => Self {
                version,
                page_size: JET4_PAGE_SIZE,
                row_count_offset: 0x0C,
                row_offset_mask: 0x1FFF,
                tab_num_rows_offset: 16,
                tab_num_cols_offset: 45,
                tab_num_idxs_offset: 47,
                tab_num_ridxs_offset: 51,
                tab_usage_map_offset: 55,
                tab_first_dpg_offset: 56,
                tab_cols_start_offset: 63,
                tab_ridx_entry_size: 12,
                tab_idx_entry_size: 28,
                tab_idx_type_offset: 23,
                tab_col_entry_size: 25,
                col_type_offset: 0,
                col_num_offset: 5,
                tab_col_offset_var: 7,
                tab_row_col_num_offset: 9,
                col_prec_offset: 11,
                col_scale_offset: 12,
                col_flags_offset: 15,
                col_misc_flags_offset: Some(16),
                tab_col_offset_fixed: 21,
                col_size_offset: 23,
                real_idx_info_size: 52,
            },
            JetVersion::Jet3 => Self {
                version,
                page_size: JET3_PAGE_SIZE,
                row_count_offset: 0x08,
                row_offset_mask: 0x0FFF,
                tab_num_rows_offset: 12,
                tab_num_cols_offset: 25,
                tab_num_idxs_offset: 27,
                tab_num_ridxs_offset: 31,
                tab_usage_map_offset: 35,
                tab_first_dpg_offset: 36,
                tab_cols_start_offset: 43,
                tab_ridx_entry_size: 8,
                tab_idx_entry_size: 20,
                tab_idx_type_offset: 19,
                tab_col_entry_size: 18,
                col_type_offset: 0,
                col_num_offset: 1,
                tab_col_offset_var: 3,
                tab_row_col_num_offset: 5,
                col_prec_offset: 7,
                col_scale_offset: 8,
                col_flags_offset: 13,
                col_misc_flags_offset: None,
                tab_col_offset_fixed: 14,
                col_size_offset: 16,
                real_idx_info_size: 39,
            },
        }
    }

    pub fn is_jet4(&self) -> bool {
        self.version == JetVersion::Jet4
    }

    /// Rows start with the column count: two bytes in Jet4, one in Jet3.
    pub fn row_column_count_size(&self) -> usize {
        if self.is_jet4() { 2 } else { 1 }
    }
}
