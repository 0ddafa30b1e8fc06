//! Runtime configuration for the storage layer.

use crate::storage::error::StorageResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default number of pages the buffer pool caches.
pub const DEFAULT_PAGES: usize = 50;

/// Default time, in milliseconds, a page request waits for a conflicting lock.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum number of pages held by the buffer pool.
    pub buffer_pool_pages: usize,
    /// How long `get_page` waits for a lock before aborting the
    /// transaction; `None` waits until granted or a deadlock is found.
    pub lock_timeout_ms: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            buffer_pool_pages: DEFAULT_PAGES,
            lock_timeout_ms: Some(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }
}

impl StorageConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
