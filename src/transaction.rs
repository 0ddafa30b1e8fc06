//! Transaction support.
//!
//! Transactions here are lock scopes: a [`TransactionId`] tags every page
//! access, and [`Transaction`] releases the locks (flushing or discarding
//! the pages it dirtied) when it commits or aborts.

pub mod handle;
pub mod id;

pub use handle::Transaction;
pub use id::{TransactionId, TransactionIdGenerator};
