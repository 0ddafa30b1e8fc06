//! Concurrency control module.
//!
//! Page-level two-phase locking: shared locks for reads, exclusive locks for
//! writes, with wait-for graph deadlock detection.

pub mod lock;

pub use lock::{LockError, LockManager, LockMode};
