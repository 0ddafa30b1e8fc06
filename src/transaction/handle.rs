use super::id::TransactionId;
use crate::storage::buffer::BufferPool;
use crate::storage::error::StorageResult;
use log::{debug, warn};

/// A handle to a transaction that automatically aborts on drop if still active.
pub struct Transaction {
    id: TransactionId,
    pool: BufferPool,
    finished: bool,
}

impl Transaction {
    pub fn start(id: TransactionId, pool: BufferPool) -> Self {
        debug!("{} started", id);
        Self {
            id,
            pool,
            finished: false,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Flush the pages this transaction dirtied and release its locks.
    pub fn commit(mut self) -> StorageResult<()> {
        self.finish(true)
    }

    /// Discard the pages this transaction dirtied and release its locks.
    pub fn abort(mut self) -> StorageResult<()> {
        self.finish(false)
    }

    fn finish(&mut self, commit: bool) -> StorageResult<()> {
        self.finished = true;
        self.pool.transaction_complete(self.id, commit)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish(false) {
                warn!("Abort of {} on drop failed: {}", self.id, e);
            }
        }
    }
}
