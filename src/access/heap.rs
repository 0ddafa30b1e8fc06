//! Heap files.
//!
//! A heap file stores the tuples of one table, unordered, in fixed-size
//! pages laid end to end in a single backing file. The file itself holds no
//! page memory and takes no locks: every logical page access goes through a
//! [`PageFetcher`], and only the raw [`HeapFile::read_page`] and
//! [`HeapFile::write_page`] touch the disk.

use crate::access::scan::HeapFileIterator;
use crate::access::tuple::Tuple;
use crate::access::tuple_desc::TupleDesc;
use crate::catalog::TableId;
use crate::storage::buffer::{PageFetcher, PageRef, Permissions};
use crate::storage::disk::PageManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, Page, PageId};
use crate::storage::PAGE_SIZE;
use crate::transaction::TransactionId;
use log::debug;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub struct HeapFile {
    pages: PageManager,
    table_id: TableId,
    desc: Arc<TupleDesc>,
    /// Serializes growth of the file.
    append_lock: Mutex<()>,
}

impl HeapFile {
    /// Attach to the existing heap file at `path`.
    pub fn new(path: &Path, desc: Arc<TupleDesc>) -> StorageResult<Self> {
        check_fits(&desc)?;
        Ok(Self::with_pages(PageManager::open(path)?, desc))
    }

    /// Create an empty heap file at `path`, truncating any existing file.
    pub fn create(path: &Path, desc: Arc<TupleDesc>) -> StorageResult<Self> {
        check_fits(&desc)?;
        Ok(Self::with_pages(PageManager::create(path)?, desc))
    }

    fn with_pages(pages: PageManager, desc: Arc<TupleDesc>) -> Self {
        let table_id = TableId::from_path(pages.path());
        Self {
            pages,
            table_id,
            desc,
            append_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> TableId {
        self.table_id
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        self.pages.path()
    }

    /// Number of pages on disk, counting a trailing partial page.
    pub fn num_pages(&self) -> StorageResult<u32> {
        Ok(self.pages.num_pages()?)
    }

    fn check_owner(&self, pid: PageId) -> StorageResult<()> {
        if pid.table_id != self.table_id {
            return Err(StorageError::InvalidPage {
                pid,
                reason: format!("page belongs to table {}, not {}", pid.table_id, self.table_id),
            });
        }
        Ok(())
    }

    /// Read page `pid` straight from disk, bypassing any cache.
    pub fn read_page(&self, pid: PageId) -> StorageResult<HeapPage> {
        self.check_owner(pid)?;
        let num_pages = self.num_pages()?;
        if pid.page_number >= num_pages {
            return Err(StorageError::InvalidPage {
                pid,
                reason: format!("file has {} pages", num_pages),
            });
        }

        let mut data = vec![0u8; PAGE_SIZE];
        self.pages
            .read_page(pid.page_number, &mut data)
            .map_err(|source| StorageError::ReadFailure { pid, source })?;
        HeapPage::new(pid, &data, self.desc.clone())
    }

    /// Write `page` to its slot in the file. Writing one past the last page
    /// appends.
    pub fn write_page(&self, page: &dyn Page) -> StorageResult<()> {
        let pid = page.id();
        self.check_owner(pid)?;
        let num_pages = self.num_pages()?;
        if pid.page_number > num_pages {
            return Err(StorageError::InvalidPage {
                pid,
                reason: format!("writing would leave a gap after page {}", num_pages),
            });
        }

        let data = page.page_data()?;
        self.pages
            .write_page(pid.page_number, &data)
            .map_err(|source| StorageError::WriteFailure { pid, source })
    }

    /// Insert `tuple` into the first page with a free slot, appending a new
    /// page when every page is full. Returns the modified page.
    pub fn insert_tuple(
        &self,
        pool: &dyn PageFetcher,
        tid: TransactionId,
        tuple: Tuple,
    ) -> StorageResult<Vec<PageRef>> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(StorageError::SchemaMismatch {
                expected: self.desc.to_string(),
                found: tuple.tuple_desc().to_string(),
            });
        }

        loop {
            let num_pages = self.num_pages()?;
            for page_number in 0..num_pages {
                let pid = PageId::new(self.table_id, page_number);
                let held = pool.holds_lock(tid, pid);
                let has_room = pool
                    .get_page(tid, pid, Permissions::ReadOnly)?
                    .read()
                    .num_empty_slots()
                    > 0;
                if has_room {
                    let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
                    page.write().insert_tuple(tuple)?;
                    return Ok(vec![page]);
                }
                // The page was only inspected, so another transaction may fill it
                if !held {
                    pool.unsafe_release_page(tid, pid);
                }
            }

            let pid = PageId::new(self.table_id, num_pages);
            {
                let _append = self.append_lock.lock();
                // Another insert appended since the scan; look at its page first
                if self.num_pages()? != num_pages {
                    continue;
                }
                self.pages
                    .write_page(num_pages, &HeapPage::empty_page_data())
                    .map_err(|source| StorageError::WriteFailure { pid, source })?;
            }
            debug!("Appended {} to {:?}", pid, self.path());

            let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            // Filled by other inserters before the lock was granted
            if page.read().num_empty_slots() == 0 {
                continue;
            }
            page.write().insert_tuple(tuple)?;
            return Ok(vec![page]);
        }
    }

    /// Clear the slot `tuple` occupies. Returns the modified page.
    pub fn delete_tuple(
        &self,
        pool: &dyn PageFetcher,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> StorageResult<Vec<PageRef>> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| StorageError::TupleNotFound("tuple has no record id".to_string()))?;
        let pid = rid.page_id;
        if pid.table_id != self.table_id || pid.page_number >= self.num_pages()? {
            return Err(StorageError::PageNotFound(pid));
        }

        let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        page.write().delete_tuple(tuple)?;
        Ok(vec![page])
    }

    /// A closed cursor over every tuple in the file.
    pub fn iter<'a>(
        &'a self,
        pool: &'a dyn PageFetcher,
        tid: TransactionId,
    ) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, pool, tid)
    }

    /// An opened cursor over every tuple in the file.
    pub fn scan<'a>(
        &'a self,
        pool: &'a dyn PageFetcher,
        tid: TransactionId,
    ) -> StorageResult<HeapFileIterator<'a>> {
        let mut cursor = self.iter(pool, tid);
        cursor.open()?;
        Ok(cursor)
    }
}

fn check_fits(desc: &TupleDesc) -> StorageResult<()> {
    if HeapPage::slots_per_page(desc) == 0 {
        return Err(StorageError::TupleTooLarge { size: desc.size() });
    }
    Ok(())
}
