use super::replacer::Replacer;
use crate::storage::page::PageId;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Queue of evictable pages (least recently used at front)
    lru_list: VecDeque<PageId>,
    /// Membership of `lru_list`
    evictable: HashSet<PageId>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lru_list: VecDeque::with_capacity(capacity),
            evictable: HashSet::with_capacity(capacity),
        }
    }

    fn remove_from_list(&mut self, page_id: PageId) {
        if let Some(idx) = self.lru_list.iter().position(|p| *p == page_id) {
            self.lru_list.remove(idx);
        }
    }
}

impl Replacer for LruReplacer {
    fn evict(&mut self) -> Option<PageId> {
        let page_id = self.lru_list.pop_front()?;
        self.evictable.remove(&page_id);
        Some(page_id)
    }

    fn pin(&mut self, page_id: PageId) {
        if self.evictable.remove(&page_id) {
            self.remove_from_list(page_id);
        }
    }

    fn unpin(&mut self, page_id: PageId) {
        if self.evictable.insert(page_id) {
            self.lru_list.push_back(page_id);
        }
    }

    fn touch(&mut self, page_id: PageId) {
        if self.evictable.contains(&page_id) {
            self.remove_from_list(page_id);
            self.lru_list.push_back(page_id);
        }
    }

    fn size(&self) -> usize {
        self.lru_list.len()
    }
}
