//! Storage layer for heapdb.
//!
//! This module provides the page-based foundation the heap files build on:
//!
//! - **Page**: Fixed-size (4KB) blocks of data, the basic unit of I/O
//! - **PageManager**: Raw reads/writes of pages in one backing file
//! - **HeapPage**: Fixed-slot page format for tuples of one schema
//! - **BufferPool**: Lock-aware page cache with LRU eviction of clean pages
//!
//! Every logical page access goes through the buffer pool; only the buffer
//! pool's miss and flush paths touch the file directly.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPool, PageFetcher, PageRef, Permissions};
pub use disk::PageManager;
pub use error::{StorageError, StorageResult};
pub use page::{HeapPage, Page, PageId};

/// Size in bytes of every page, on disk and in the buffer pool.
pub const PAGE_SIZE: usize = 4096;
