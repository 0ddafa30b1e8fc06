use crate::access::heap::HeapFile;
use crate::access::tuple_desc::TupleDesc;
use crate::catalog::{Catalog, TableId};
use crate::concurrency::lock::LockManager;
use crate::config::StorageConfig;
use crate::storage::buffer::BufferPool;
use crate::storage::error::StorageResult;
use crate::transaction::{Transaction, TransactionIdGenerator};
use std::path::Path;
use std::sync::Arc;

/// Entry point that wires the catalog, lock manager and buffer pool together.
pub struct Database {
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    buffer_pool: BufferPool,
    ids: TransactionIdGenerator,
}

impl Database {
    pub fn new(config: StorageConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let lock_manager = Arc::new(LockManager::new());
        let buffer_pool = BufferPool::new(catalog.clone(), lock_manager.clone(), &config);
        Self {
            catalog,
            lock_manager,
            buffer_pool,
            ids: TransactionIdGenerator::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    /// Start a transaction with a fresh id.
    pub fn begin(&self) -> Transaction {
        Transaction::start(self.ids.next(), self.buffer_pool.clone())
    }

    /// Create an empty heap file at `path` and register it as `name`.
    pub fn create_table(
        &self,
        path: &Path,
        name: &str,
        desc: Arc<TupleDesc>,
    ) -> StorageResult<TableId> {
        self.register(HeapFile::create(path, desc)?, name)
    }

    /// Register the existing heap file at `path` as `name`.
    pub fn open_table(
        &self,
        path: &Path,
        name: &str,
        desc: Arc<TupleDesc>,
    ) -> StorageResult<TableId> {
        self.register(HeapFile::new(path, desc)?, name)
    }

    fn register(&self, file: HeapFile, name: &str) -> StorageResult<TableId> {
        let id = file.id();
        self.catalog.add_table(Arc::new(file), name, None);
        Ok(id)
    }

    /// Load every table in the schema file at `path`.
    pub fn load_schema(&self, path: &Path) -> StorageResult<Vec<TableId>> {
        self.catalog.load_schema(path)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(StorageConfig::default())
    }
}
