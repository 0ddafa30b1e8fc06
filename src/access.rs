//! Access layer for tuple-oriented operations.
//!
//! This module provides the logical view of stored data:
//!
//! - **TupleDesc**: Ordered schema of typed, optionally named fields
//! - **Tuple**: One row conforming to a descriptor, with its RecordId
//! - **Field**: Type-safe column values with fixed-width serialization
//! - **HeapFile**: An unordered table stored as pages in one file
//! - **HeapFileIterator**: Snapshotting cursor over a heap file
//! - **HeapFileEncoder**: Bulk writer that builds heap files from rows
//!
//! Pages are addressed by [`crate::storage::PageId`]; everything here reaches
//! them through a [`crate::storage::PageFetcher`].

pub mod encoder;
pub mod heap;
pub mod scan;
pub mod tuple;
pub mod tuple_desc;
pub mod value;

pub use encoder::HeapFileEncoder;
pub use heap::HeapFile;
pub use scan::{CursorState, HeapFileIterator};
pub use tuple::{RecordId, Tuple};
pub use tuple_desc::{TdItem, TupleDesc};
pub use value::{Field, FieldType, STRING_LEN};
