use jetdb::{
    storage::{
        format::{FormatConstants, JetVersion},
        row_offsets::{ROW_FLAG_DELETED, row_count, row_slot},
    },
    types::{
        JET3_PAGE_SIZE, JET4_PAGE_SIZE,
        error::DatabaseError,
        page::{Page, PageKind},
    },
};

fn data_page(format: &FormatConstants, rows: &[(&[u8], bool)]) -> Result<Page, DatabaseError> {
    let mut data = vec![0u8; format.page_size];
    data[0] = PageKind::Data.as_u8();
    let count_at = format.row_count_offset;
    data[count_at..count_at + 2].copy_from_slice(&(rows.len() as u16).to_le_bytes());
    let mut end = format.page_size;
    for (slot, (row, deleted)) in rows.iter().enumerate() {
        let start = end - row.len();
        data[start..end].copy_from_slice(row);
        let raw = start as u16 | if *deleted { ROW_FLAG_DELETED } else { 0 };
        let at = count_at + 2 + slot * 2;
        data[at..at + 2].copy_from_slice(&raw.to_le_bytes());
        end = start;
    }
    Page::from_bytes(10, data)
}

#[test]
fn test_page_kinds() -> Result<(), DatabaseError> {
    for kind in [
        PageKind::Header,
        PageKind::Data,
        PageKind::TableDef,
        PageKind::IndexNode,
        PageKind::IndexLeaf,
        PageKind::UsageMap,
    ] {
        assert_eq!(PageKind::from_u8(kind.as_u8())?, kind);
    }
    assert!(matches!(
        PageKind::from_u8(0x42),
        Err(DatabaseError::InvalidPageType(0x42))
    ));
    Ok(())
}

#[test]
fn test_unknown_page_tag_is_corrupt() {
    let mut data = vec![0u8; JET4_PAGE_SIZE];
    data[0] = 0x7F;
    assert!(matches!(
        Page::from_bytes(3, data),
        Err(DatabaseError::CorruptPage { page_id: 3, .. })
    ));
}

#[test]
fn test_field_reads_are_bounds_checked() -> Result<(), DatabaseError> {
    let page = Page::from_bytes(1, vec![0x01; JET3_PAGE_SIZE])?;
    assert_eq!(page.size(), JET3_PAGE_SIZE);
    assert_eq!(page.u8_at(0)?, 0x01);
    assert_eq!(page.u16_at(2)?, 0x0101);
    assert!(page.u32_at(JET3_PAGE_SIZE - 2).is_err());
    assert!(page.bytes_at(JET3_PAGE_SIZE - 4, 8).is_err());
    assert!(page.expect_kind(PageKind::TableDef).is_err());
    page.expect_kind(PageKind::Data)
}

#[test]
fn test_row_offset_table_ranges() -> Result<(), DatabaseError> {
    for version in [JetVersion::Jet3, JetVersion::Jet4] {
        let format = FormatConstants::for_version(version);
        let page = data_page(&format, &[(b"first", false), (b"second!", true), (b"3rd", false)])?;
        assert_eq!(row_count(&page, &format)?, 3);

        let first = row_slot(&page, &format, 0)?;
        assert_eq!(first.range, format.page_size - 5..format.page_size);
        assert_eq!(&page.data[first.range], b"first");

        assert!(row_slot(&page, &format, 1)?.deleted);

        let third = row_slot(&page, &format, 2)?;
        assert!(!third.deleted);
        assert_eq!(&page.data[third.range], b"3rd");
    }
    Ok(())
}

#[test]
fn test_offset_past_page_end_is_row_error() -> Result<(), DatabaseError> {
    let format = FormatConstants::for_version(JetVersion::Jet4);
    let mut page = data_page(&format, &[(b"a", false), (b"b", false)])?;
    let at = format.row_count_offset + 2 + 2;
    page.data[at..at + 2].copy_from_slice(&0x1500u16.to_le_bytes());

    let err = row_slot(&page, &format, 1).unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(err, DatabaseError::RowDecode { row: 1, .. }));
    Ok(())
}

#[test]
fn test_non_monotonic_offsets_are_rejected() -> Result<(), DatabaseError> {
    let format = FormatConstants::for_version(JetVersion::Jet4);
    let mut page = data_page(&format, &[(b"aaaa", false), (b"bb", false)])?;
    // slot 1 now starts above slot 0
    let at = format.row_count_offset + 2 + 2;
    page.data[at..at + 2].copy_from_slice(&((format.page_size - 1) as u16).to_le_bytes());
    assert!(matches!(
        row_slot(&page, &format, 1),
        Err(DatabaseError::RowDecode { .. })
    ));

    // an offset inside the offset table itself
    page.data[at..at + 2].copy_from_slice(&4u16.to_le_bytes());
    assert!(row_slot(&page, &format, 1).is_err());
    Ok(())
}
