//! Reader configuration.

use serde::{Deserialize, Serialize};

/// Options controlling how a database file is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Abort a scan on the first undecodable row instead of skipping it.
    #[serde(default)]
    pub strict: bool,

    /// Keep decoded pages in memory, keyed by page id.
    #[serde(default = "default_page_cache")]
    pub page_cache: bool,

    /// Maximum number of cached pages before the cache is cleared.
    #[serde(default = "default_page_cache_capacity")]
    pub page_cache_capacity: usize,

    /// Upper bound on catalog rows; exceeding it means the catalog is corrupt.
    #[serde(default = "default_max_catalog_entries")]
    pub max_catalog_entries: usize,

    /// Upper bound on linked table-definition pages for one table.
    #[serde(default = "default_max_tdef_pages")]
    pub max_tdef_pages: usize,

    /// Upper bound on pages followed for one memo/OLE value.
    #[serde(default = "default_max_lval_chain")]
    pub max_lval_chain: usize,
}

fn default_page_cache() -> bool {
    true
}

fn default_page_cache_capacity() -> usize {
    1024
}

fn default_max_catalog_entries() -> usize {
    65_536
}

fn default_max_tdef_pages() -> usize {
    64
}

fn default_max_lval_chain() -> usize {
    4096
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            strict: false,
            page_cache: default_page_cache(),
            page_cache_capacity: default_page_cache_capacity(),
            max_catalog_entries: default_max_catalog_entries(),
            max_tdef_pages: default_max_tdef_pages(),
            max_lval_chain: default_max_lval_chain(),
        }
    }
}

impl ReaderConfig {
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn without_page_cache(mut self) -> Self {
        self.page_cache = false;
        self
    }

    pub fn with_page_cache_capacity(mut self, capacity: usize) -> Self {
        self.page_cache_capacity = capacity;
        self
    }

    pub fn with_max_catalog_entries(mut self, max: usize) -> Self {
        self.max_catalog_entries = max;
        self
    }

    pub fn with_max_tdef_pages(mut self, max: usize) -> Self {
        self.max_tdef_pages = max;
        self
    }

    pub fn with_max_lval_chain(mut self, max: usize) -> Self {
        self.max_lval_chain = max;
        self
    }
}
