use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};

use crate::{
    config::ReaderConfig,
    storage::{
        format::FormatConstants,
        header::DatabaseHeader,
        source::ByteSource,
    },
    types::{
        JET3_PAGE_SIZE, PageId,
        error::{DatabaseError, Result},
        page::{Page, PageKind},
    },
};

/// Reads fixed-size pages from a `ByteSource`.
///
/// The source sits behind a mutex so the reader can be shared; cached pages
/// are immutable and handed out as `Arc<Page>`.
pub struct PageReader {
    source: Mutex<Option<Box<dyn ByteSource>>>,
    format: FormatConstants,
    header: DatabaseHeader,
    cache: Option<RwLock<HashMap<PageId, Arc<Page>>>>,
    cache_capacity: usize,
}

impl PageReader {
    /// Decodes page 0 to learn the file format, then sizes every later read
    /// accordingly.
    pub fn open(mut source: Box<dyn ByteSource>, config: &ReaderConfig) -> Result<Self> {
        let mut header_bytes = vec![0u8; JET3_PAGE_SIZE];
        source.seek(0)?;
        source.read_full(&mut header_bytes)?;
        let header = DatabaseHeader::from_bytes(&header_bytes)?;
        let format = FormatConstants::for_version(header.version);

        let cache = config
            .page_cache
            .then(|| RwLock::new(HashMap::with_capacity(config.page_cache_capacity.min(1024))));

        Ok(Self {
            source: Mutex::new(Some(source)),
            format,
            header,
            cache,
            cache_capacity: config.page_cache_capacity.max(1),
        })
    }

    pub fn format(&self) -> &FormatConstants {
        &self.format
    }

    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    pub fn page_size(&self) -> usize {
        self.format.page_size
    }

    pub fn page_count(&self) -> Result<u64> {
        let guard = self.source.lock();
        let source = guard.as_ref().ok_or(DatabaseError::Closed)?;
        Ok(source.length()? / self.format.page_size as u64)
    }

    pub fn read_page(&self, page_id: PageId) -> Result<Arc<Page>> {
        if let Some(cache) = &self.cache {
            if let Some(page) = cache.read().get(&page_id) {
                return Ok(Arc::clone(page));
            }
        }

        let page = Arc::new(self.read_uncached(page_id)?);

        if let Some(cache) = &self.cache {
            let mut cache = cache.write();
            if cache.len() >= self.cache_capacity {
                cache.clear();
            }
            cache.insert(page_id, Arc::clone(&page));
        }
        Ok(page)
    }

    pub fn read_page_of_kind(&self, page_id: PageId, kind: PageKind) -> Result<Arc<Page>> {
        let page = self.read_page(page_id)?;
        page.expect_kind(kind)?;
        Ok(page)
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.read().len())
    }

    /// Releases the underlying source. Later reads fail with `Closed`;
    /// closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let source = self.source.lock().take();
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
        match source {
            Some(mut source) => source.close(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.source.lock().is_none()
    }

    fn read_uncached(&self, page_id: PageId) -> Result<Page> {
        let page_size = self.format.page_size;
        let mut buffer = vec![0u8; page_size];
        {
            let mut guard = self.source.lock();
            let source = guard.as_mut().ok_or(DatabaseError::Closed)?;
            source.seek(page_id as u64 * page_size as u64)?;
            source.read_full(&mut buffer)?;
        }
        Page::from_bytes(page_id, buffer)
    }
}
