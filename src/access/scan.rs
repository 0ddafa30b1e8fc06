//! Sequential scans over a heap file.

use crate::access::heap::HeapFile;
use crate::access::tuple::Tuple;
use crate::catalog::TableId;
use crate::storage::buffer::{PageFetcher, Permissions};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use std::iter::Peekable;
use std::vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Closed,
    Opened,
}

/// Cursor over every tuple of a heap file, in page then slot order.
///
/// The page count is fixed when the cursor is opened: pages appended
/// afterwards are not visited. Every page is fetched read-only through the
/// page fetcher on behalf of the cursor's transaction.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a dyn PageFetcher,
    tid: TransactionId,
    state: CursorState,
    /// Last page fetched; `None` before the first page.
    page_index: Option<u32>,
    total_pages: u32,
    table_id: TableId,
    tuples: Option<Peekable<vec::IntoIter<Tuple>>>,
}

impl<'a> HeapFileIterator<'a> {
    pub fn new(file: &'a HeapFile, pool: &'a dyn PageFetcher, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            state: CursorState::Closed,
            page_index: None,
            total_pages: 0,
            table_id: file.id(),
            tuples: None,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Snapshot the file's page count and position before the first page.
    pub fn open(&mut self) -> StorageResult<()> {
        self.total_pages = self.file.num_pages()?;
        self.table_id = self.file.id();
        self.page_index = None;
        self.tuples = None;
        self.state = CursorState::Opened;
        Ok(())
    }

    /// Whether another tuple is available. Fetches pages as needed but
    /// consumes nothing; a closed cursor has nothing.
    pub fn has_next(&mut self) -> StorageResult<bool> {
        if self.state == CursorState::Closed {
            return Ok(false);
        }

        loop {
            if let Some(tuples) = self.tuples.as_mut() {
                if tuples.peek().is_some() {
                    return Ok(true);
                }
            }

            let next_page = self.page_index.map_or(0, |n| n + 1);
            if next_page >= self.total_pages {
                self.tuples = None;
                return Ok(false);
            }

            let pid = PageId::new(self.table_id, next_page);
            let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
            let tuples = page.read().tuples();
            self.page_index = Some(next_page);
            self.tuples = Some(tuples.into_iter().peekable());
        }
    }

    /// Consume and return the next tuple.
    pub fn next_tuple(&mut self) -> StorageResult<Tuple> {
        if !self.has_next()? {
            return Err(StorageError::NoSuchElement);
        }
        self.tuples
            .as_mut()
            .and_then(|tuples| tuples.next())
            .ok_or(StorageError::NoSuchElement)
    }

    /// Go back before the first page, keeping the page count from `open`.
    pub fn rewind(&mut self) {
        self.page_index = None;
        self.tuples = None;
    }

    pub fn close(&mut self) {
        self.tuples = None;
        self.state = CursorState::Closed;
    }
}

impl Iterator for HeapFileIterator<'_> {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_tuple()),
            Ok(false) => None,
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}
