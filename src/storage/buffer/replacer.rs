use crate::storage::page::PageId;
use std::fmt::Debug;

pub trait Replacer: Send + Sync + Debug {
    /// Select a page to evict. Returns None if no page can be evicted.
    fn evict(&mut self) -> Option<PageId>;

    /// Mark a page as pinned (not evictable).
    fn pin(&mut self, page_id: PageId);

    /// Mark a page as unpinned (evictable), most recently used.
    fn unpin(&mut self, page_id: PageId);

    /// Record an access; only affects pages that are currently evictable.
    fn touch(&mut self, page_id: PageId);

    /// Get the number of evictable pages.
    fn size(&self) -> usize;
}
