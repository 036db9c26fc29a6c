use std::sync::Arc;

use crate::{
    executor::scan::Scanner,
    storage::{
        database::{Database, DecodeWarning},
        row_decoder::RowDecoder,
        row_offsets,
        schema::TableDef,
    },
    types::{
        PageId, RowId,
        error::{DatabaseError, Result},
        holder::{Holder, invalidate_all, snapshot},
        page::{Page, PageKind},
        row::Row,
    },
};

const DATA_PAGE_OWNER_OFFSET: usize = 4;

/// Walks a table's data pages in usage-map order and each page's slots in
/// slot order, decoding rows into a reusable set of holders.
///
/// Deleted slots are skipped. Rows that fail to decode abort the scan in
/// strict mode; otherwise they are logged, recorded on the database and
/// skipped.
pub struct SequentialScanner<'db> {
    db: &'db Database,
    table: Arc<TableDef>,
    page_index: usize,
    current_page: Option<Arc<Page>>,
    current_slot_index: usize,
    slot_count: usize,
    current_row_id: Option<RowId>,
    holders: Vec<Holder>,
    is_exhausted: bool,
}

impl<'db> SequentialScanner<'db> {
    pub fn new(db: &'db Database, table: Arc<TableDef>) -> Self {
        let holders = Holder::with_columns(table.columns.len());
        Self {
            db,
            table,
            page_index: 0,
            current_page: None,
            current_slot_index: 0,
            slot_count: 0,
            current_row_id: None,
            holders,
            is_exhausted: false,
        }
    }

    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    pub fn holders(&self) -> &[Holder] {
        &self.holders
    }

    pub fn current_row_id(&self) -> Option<RowId> {
        self.current_row_id
    }

    fn finish(&mut self) -> bool {
        self.is_exhausted = true;
        self.current_page = None;
        self.current_row_id = None;
        invalidate_all(&mut self.holders);
        false
    }

    fn skip_row(&self, page_id: PageId, slot: usize, error: &DatabaseError) {
        let recorded = self.db.record_warning(DecodeWarning {
            table: self.table.name.clone(),
            page_id,
            row: slot,
            reason: error.to_string(),
        });
        if recorded {
            tracing::warn!(
                "Skipping undecodable row {} on page {} of table '{}': {}",
                slot,
                page_id,
                self.table.name,
                error
            );
        }
    }

    /// Usage maps may list pages that no longer hold this table's rows;
    /// those are passed over.
    fn load_next_page(&mut self) -> Result<bool> {
        let reader = self.db.reader();
        while let Some(&page_id) = self.table.data_pages.get(self.page_index) {
            self.page_index += 1;
            let page = reader.read_page(page_id)?;
            if page.kind != PageKind::Data
                || page.u32_at(DATA_PAGE_OWNER_OFFSET)? != self.table.definition_page
            {
                tracing::debug!(
                    "Page {} is not a data page of table '{}'",
                    page_id,
                    self.table.name
                );
                continue;
            }
            self.slot_count = row_offsets::row_count(&page, reader.format())?;
            self.current_slot_index = 0;
            self.current_page = Some(page);
            return Ok(true);
        }
        Ok(false)
    }
}

impl Scanner for SequentialScanner<'_> {
    fn advance(&mut self) -> Result<bool> {
        if self.is_exhausted {
            return Ok(false);
        }
        if self.table.row_count == 0 {
            return Ok(self.finish());
        }

        loop {
            if self.current_page.is_none() || self.current_slot_index >= self.slot_count {
                if !self.load_next_page()? {
                    return Ok(self.finish());
                }
                continue;
            }
            let Some(page) = self.current_page.clone() else {
                continue;
            };

            let slot = self.current_slot_index;
            self.current_slot_index += 1;

            let decoder = RowDecoder::new(
                &self.table,
                self.db.reader(),
                self.db.config().max_lval_chain,
            );
            match decoder.decode_into(&page, slot, &mut self.holders) {
                Ok(true) => {
                    self.current_row_id = Some(Row::make_row_id(page.id, slot));
                    return Ok(true);
                }
                Ok(false) => continue,
                Err(e) if e.is_recoverable() && !self.db.config().strict => {
                    self.skip_row(page.id, slot, &e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn current_row(&self) -> Option<Row> {
        let row_id = self.current_row_id?;
        Some(Row::with_row_id(row_id, snapshot(&self.holders)))
    }

    fn reset(&mut self) -> Result<()> {
        self.page_index = 0;
        self.current_page = None;
        self.current_slot_index = 0;
        self.slot_count = 0;
        self.current_row_id = None;
        invalidate_all(&mut self.holders);
        self.is_exhausted = false;
        Ok(())
    }
}
