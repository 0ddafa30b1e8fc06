pub mod heap_page;

use crate::catalog::TableId;
use crate::storage::error::StorageResult;
use crate::transaction::TransactionId;
use std::fmt;

/// Identifies one page of one table.
///
/// Equality and hashing are structural so ids built independently by the
/// heap file, the buffer pool and the lock manager are interchangeable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_number: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_number: u32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }

    /// Integer representation: `[table_id, page_number]`.
    pub fn serialize(&self) -> [u32; 2] {
        [self.table_id.0, self.page_number]
    }

    pub fn deserialize(raw: [u32; 2]) -> Self {
        Self::new(TableId(raw[0]), raw[1])
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}, {})", self.table_id, self.page_number)
    }
}

/// A fixed-size unit of storage as seen by the buffer pool and heap file.
pub trait Page {
    fn id(&self) -> PageId;

    /// Serialized contents; always exactly `PAGE_SIZE` bytes.
    fn page_data(&self) -> StorageResult<Vec<u8>>;

    /// The transaction that last dirtied this page, if it is dirty.
    fn is_dirty(&self) -> Option<TransactionId>;

    fn mark_dirty(&mut self, dirty: bool, tid: TransactionId);
}

pub use heap_page::HeapPage;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_page_id_value_equality() {
        let a = PageId::new(TableId(7), 3);
        let b = PageId::new(TableId(7), 3);

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, PageId::new(TableId(7), 4));
        assert_ne!(a, PageId::new(TableId(8), 3));

        let set: HashSet<PageId> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_page_id_serialize() {
        let pid = PageId::new(TableId(42), 9);
        assert_eq!(pid.serialize(), [42, 9]);
        assert_eq!(PageId::deserialize(pid.serialize()), pid);
    }

    #[test]
    fn test_page_id_ordering() {
        let p0 = PageId::new(TableId(1), 0);
        let p1 = PageId::new(TableId(1), 1);
        let other = PageId::new(TableId(2), 0);
        assert!(p0 < p1);
        assert!(p1 < other);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(PageId::new(TableId(5), 2).to_string(), "Page(5, 2)");
    }
}
