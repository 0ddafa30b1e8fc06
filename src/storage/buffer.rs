pub mod lru;
pub mod replacer;

use crate::access::tuple::Tuple;
use crate::catalog::{Catalog, TableId};
use crate::concurrency::lock::{LockManager, LockMode};
use crate::config::StorageConfig;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, Page, PageId};
use crate::transaction::TransactionId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use replacer::Replacer;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a cached page.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Access a transaction requests on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

impl Permissions {
    pub fn lock_mode(&self) -> LockMode {
        match self {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// The page-fetch path every logical page access goes through.
pub trait PageFetcher {
    /// Fetch `pid` on behalf of `tid`, locking it according to `perm`.
    ///
    /// May block on a conflicting lock; fails with `TransactionAborted`
    /// when the lock cannot be granted.
    fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permissions)
        -> StorageResult<PageRef>;

    fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool;

    /// Drop `tid`'s lock on `pid` before the transaction ends.
    ///
    /// Only sound for pages the transaction read without using the contents.
    fn unsafe_release_page(&self, tid: TransactionId, pid: PageId);
}

/// Lock-aware page cache.
///
/// Pages fetched for writing or dirtied by a transaction are never evicted
/// before that transaction completes; only clean pages are evictable.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    pages: DashMap<PageId, PageRef>,
    replacer: Mutex<Box<dyn Replacer>>,
    capacity: usize,
    lock_timeout: Option<Duration>,
}

impl BufferPool {
    pub fn new(
        catalog: Arc<Catalog>,
        lock_manager: Arc<LockManager>,
        config: &StorageConfig,
    ) -> Self {
        let capacity = config.buffer_pool_pages;
        Self {
            inner: Arc::new(BufferPoolInner {
                catalog,
                lock_manager,
                pages: DashMap::with_capacity(capacity),
                replacer: Mutex::new(Box::new(lru::LruReplacer::new(capacity))),
                capacity,
                lock_timeout: config.lock_timeout(),
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.inner.lock_manager
    }

    /// Number of pages currently cached.
    pub fn num_cached(&self) -> usize {
        self.inner.pages.len()
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.inner.pages.contains_key(&pid)
    }

    /// Insert `tuple` into table `table_id` and mark the touched pages dirty.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: Tuple,
    ) -> StorageResult<()> {
        let file = self.inner.catalog.file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        self.mark_dirty(tid, &pages);
        Ok(())
    }

    /// Remove `tuple` from its table and mark the touched page dirty.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> StorageResult<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| StorageError::TupleNotFound("tuple has no record id".to_string()))?;
        let file = self.inner.catalog.file(rid.page_id.table_id)?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        self.mark_dirty(tid, &pages);
        Ok(())
    }

    fn mark_dirty(&self, tid: TransactionId, pages: &[PageRef]) {
        for page in pages {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(true, tid);
                guard.id()
            };
            self.inner.pages.insert(pid, page.clone());
            self.inner.replacer.lock().pin(pid);
        }
    }

    /// Write `pid` back to its file if it is dirty.
    pub fn flush_page(&self, pid: PageId) -> StorageResult<()> {
        let Some(page) = self.cached(pid) else {
            return Ok(());
        };
        let mut page = page.write();
        if let Some(tid) = page.is_dirty() {
            let file = self.inner.catalog.file(pid.table_id)?;
            file.write_page(&*page)?;
            page.mark_dirty(false, tid);
            debug!("flushed {} dirtied by {}", pid, tid);
        }
        Ok(())
    }

    /// Write every dirty page back. Breaks NO-STEAL; meant for shutdown and tests.
    pub fn flush_all_pages(&self) -> StorageResult<()> {
        for pid in self.cached_ids() {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Write back the pages dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> StorageResult<()> {
        for pid in self.dirtied_by(tid) {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drop `pid` from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) {
        self.inner.pages.remove(&pid);
        self.inner.replacer.lock().pin(pid);
    }

    /// Finish `tid`: on commit flush its dirty pages, on abort discard them so
    /// the next fetch rereads the on-disk state. Releases all its locks.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> StorageResult<()> {
        let locked = self.inner.lock_manager.locked_pages(tid);

        let result = if commit {
            self.flush_pages(tid)
        } else {
            for pid in self.dirtied_by(tid) {
                self.discard_page(pid);
            }
            Ok(())
        };

        for pid in locked {
            if let Some(page) = self.cached(pid) {
                if page.read().is_dirty().is_none() {
                    self.inner.replacer.lock().unpin(pid);
                }
            }
        }
        self.inner.lock_manager.release_all_locks(tid);

        debug!("{} {}", tid, if commit { "committed" } else { "aborted" });
        result
    }

    fn cached(&self, pid: PageId) -> Option<PageRef> {
        self.inner.pages.get(&pid).map(|entry| entry.value().clone())
    }

    fn cached_ids(&self) -> Vec<PageId> {
        self.inner.pages.iter().map(|entry| *entry.key()).collect()
    }

    fn dirtied_by(&self, tid: TransactionId) -> Vec<PageId> {
        self.cached_ids()
            .into_iter()
            .filter(|pid| {
                self.cached(*pid)
                    .is_some_and(|page| page.read().is_dirty() == Some(tid))
            })
            .collect()
    }

    /// Read `pid` from its heap file into the cache.
    fn load(&self, pid: PageId, perm: Permissions) -> StorageResult<PageRef> {
        let file = self.inner.catalog.file(pid.table_id)?;
        let page = file.read_page(pid)?;

        if self.inner.pages.len() >= self.inner.capacity {
            self.evict_page()?;
        }

        let page = match self.inner.pages.entry(pid) {
            Entry::Occupied(entry) => return Ok(entry.get().clone()),
            Entry::Vacant(entry) => entry.insert(Arc::new(RwLock::new(page))).value().clone(),
        };
        if perm == Permissions::ReadOnly {
            self.inner.replacer.lock().unpin(pid);
        }
        Ok(page)
    }

    /// Evict the least recently used clean page.
    fn evict_page(&self) -> StorageResult<()> {
        loop {
            let victim = self
                .inner
                .replacer
                .lock()
                .evict()
                .ok_or(StorageError::BufferPoolFull {
                    capacity: self.inner.capacity,
                })?;
            let Some(page) = self.cached(victim) else {
                continue;
            };
            // Dirty pages stay put until their transaction completes
            if page.read().is_dirty().is_some() {
                continue;
            }
            self.inner.pages.remove(&victim);
            debug!("evicted {}", victim);
            return Ok(());
        }
    }
}

impl PageFetcher for BufferPool {
    fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> StorageResult<PageRef> {
        self.inner
            .lock_manager
            .acquire_lock(tid, pid, perm.lock_mode(), self.inner.lock_timeout)
            .map_err(|e| {
                warn!("aborting {}: {}", tid, e);
                StorageError::TransactionAborted(tid)
            })?;

        let page = match self.cached(pid) {
            Some(page) => page,
            None => self.load(pid, perm)?,
        };

        let mut replacer = self.inner.replacer.lock();
        match perm {
            Permissions::ReadWrite => replacer.pin(pid),
            Permissions::ReadOnly => replacer.touch(pid),
        }
        Ok(page)
    }

    fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.inner.lock_manager.holds_lock(tid, pid)
    }

    fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) {
        self.inner.lock_manager.release_lock(tid, pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::heap::HeapFile;
    use crate::access::tuple_desc::TupleDesc;
    use crate::access::value::{Field, FieldType};
    use anyhow::Result;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        file: Arc<HeapFile>,
        pool: BufferPool,
    }

    fn int_pair() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::from_types(vec![FieldType::Int, FieldType::Int]).unwrap())
    }

    fn row(desc: &Arc<TupleDesc>, a: i32) -> Tuple {
        Tuple::new(desc.clone(), vec![Field::Int(a), Field::Int(a * 10)]).unwrap()
    }

    /// A table with `pages` pages on disk, each holding one tuple.
    fn fixture(pages: u32, capacity: usize) -> Result<Fixture> {
        let dir = tempdir()?;
        let desc = int_pair();
        let file = Arc::new(HeapFile::create(&dir.path().join("t.dat"), desc.clone())?);
        for n in 0..pages {
            let mut page = HeapPage::empty(PageId::new(file.id(), n), desc.clone())?;
            page.insert_tuple(row(&desc, n as i32))?;
            file.write_page(&page)?;
        }

        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file.clone(), "t", None);
        let config = StorageConfig::default()
            .with_buffer_pool_pages(capacity)
            .with_lock_timeout(Some(Duration::from_millis(50)));
        let pool = BufferPool::new(catalog, Arc::new(LockManager::new()), &config);
        Ok(Fixture {
            _dir: dir,
            file,
            pool,
        })
    }

    fn tid(n: u64) -> TransactionId {
        TransactionId::new(n)
    }

    #[test]
    fn test_get_page_caches() -> Result<()> {
        let f = fixture(1, 10)?;
        let pid = PageId::new(f.file.id(), 0);

        let first = f.pool.get_page(tid(1), pid, Permissions::ReadOnly)?;
        let second = f.pool.get_page(tid(1), pid, Permissions::ReadOnly)?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.read().id(), pid);
        assert_eq!(f.pool.num_cached(), 1);
        assert!(f.pool.holds_lock(tid(1), pid));
        Ok(())
    }

    #[test]
    fn test_get_page_unknown_table() -> Result<()> {
        let f = fixture(1, 10)?;
        let pid = PageId::new(TableId(f.file.id().0.wrapping_add(1)), 0);
        let result = f.pool.get_page(tid(1), pid, Permissions::ReadOnly);
        assert!(matches!(result, Err(StorageError::UnknownTable(_))));
        Ok(())
    }

    #[test]
    fn test_out_of_range_page_is_rejected() -> Result<()> {
        let f = fixture(1, 10)?;
        let pid = PageId::new(f.file.id(), 5);
        let result = f.pool.get_page(tid(1), pid, Permissions::ReadOnly);
        assert!(matches!(result, Err(StorageError::InvalidPage { .. })));
        Ok(())
    }

    #[test]
    fn test_eviction_keeps_capacity() -> Result<()> {
        let f = fixture(3, 2)?;
        for n in 0..3 {
            f.pool
                .get_page(tid(1), PageId::new(f.file.id(), n), Permissions::ReadOnly)?;
        }
        assert_eq!(f.pool.num_cached(), 2);
        assert!(!f.pool.is_cached(PageId::new(f.file.id(), 0)));
        assert!(f.pool.is_cached(PageId::new(f.file.id(), 2)));
        Ok(())
    }

    #[test]
    fn test_dirty_pages_are_not_evicted() -> Result<()> {
        let f = fixture(2, 1)?;
        let desc = f.file.tuple_desc().clone();

        f.pool.insert_tuple(tid(1), f.file.id(), row(&desc, 99))?;
        let result = f
            .pool
            .get_page(tid(1), PageId::new(f.file.id(), 1), Permissions::ReadOnly);
        assert!(matches!(result, Err(StorageError::BufferPoolFull { capacity: 1 })));
        Ok(())
    }

    #[test]
    fn test_commit_flushes_dirty_pages() -> Result<()> {
        let f = fixture(1, 10)?;
        let desc = f.file.tuple_desc().clone();
        let pid = PageId::new(f.file.id(), 0);

        f.pool.insert_tuple(tid(1), f.file.id(), row(&desc, 7))?;
        let cached = f.pool.get_page(tid(1), pid, Permissions::ReadOnly)?;
        assert_eq!(cached.read().is_dirty(), Some(tid(1)));

        // Not on disk before commit
        assert_eq!(f.file.read_page(pid)?.iter().count(), 1);

        f.pool.transaction_complete(tid(1), true)?;
        assert_eq!(cached.read().is_dirty(), None);
        assert_eq!(f.file.read_page(pid)?.iter().count(), 2);
        assert!(!f.pool.holds_lock(tid(1), pid));
        Ok(())
    }

    #[test]
    fn test_flush_all_pages() -> Result<()> {
        let f = fixture(1, 10)?;
        let desc = f.file.tuple_desc().clone();
        f.pool.insert_tuple(tid(1), f.file.id(), row(&desc, 7))?;
        f.pool.insert_tuple(tid(1), f.file.id(), row(&desc, 8))?;

        f.pool.flush_all_pages()?;
        let page = f.file.read_page(PageId::new(f.file.id(), 0))?;
        assert_eq!(page.iter().count(), 3);
        assert!(f.pool.holds_lock(tid(1), PageId::new(f.file.id(), 0)));
        Ok(())
    }

    #[test]
    fn test_abort_discards_dirty_pages() -> Result<()> {
        let f = fixture(1, 10)?;
        let desc = f.file.tuple_desc().clone();
        let pid = PageId::new(f.file.id(), 0);

        f.pool.insert_tuple(tid(1), f.file.id(), row(&desc, 7))?;
        f.pool.transaction_complete(tid(1), false)?;
        assert!(!f.pool.is_cached(pid));

        let page = f.pool.get_page(tid(2), pid, Permissions::ReadOnly)?;
        assert_eq!(page.read().iter().count(), 1);
        Ok(())
    }

    #[test]
    fn test_delete_through_pool() -> Result<()> {
        let f = fixture(1, 10)?;
        let pid = PageId::new(f.file.id(), 0);

        let victim = f
            .pool
            .get_page(tid(1), pid, Permissions::ReadOnly)?
            .read()
            .tuples()[0]
            .clone();
        f.pool.delete_tuple(tid(1), &victim)?;
        f.pool.transaction_complete(tid(1), true)?;
        assert_eq!(f.file.read_page(pid)?.iter().count(), 0);

        let detached = row(f.file.tuple_desc(), 1);
        assert!(matches!(
            f.pool.delete_tuple(tid(2), &detached),
            Err(StorageError::TupleNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_conflicting_lock_aborts() -> Result<()> {
        let f = fixture(1, 10)?;
        let pid = PageId::new(f.file.id(), 0);

        f.pool.get_page(tid(1), pid, Permissions::ReadWrite)?;
        let result = f.pool.get_page(tid(2), pid, Permissions::ReadOnly);
        assert!(matches!(result, Err(StorageError::TransactionAborted(t)) if t == tid(2)));

        f.pool.transaction_complete(tid(1), true)?;
        f.pool.get_page(tid(2), pid, Permissions::ReadOnly)?;
        Ok(())
    }

    #[test]
    fn test_unsafe_release_page() -> Result<()> {
        let f = fixture(1, 10)?;
        let pid = PageId::new(f.file.id(), 0);

        f.pool.get_page(tid(1), pid, Permissions::ReadOnly)?;
        f.pool.unsafe_release_page(tid(1), pid);
        assert!(!f.pool.holds_lock(tid(1), pid));
        f.pool.get_page(tid(2), pid, Permissions::ReadWrite)?;
        Ok(())
    }
}
