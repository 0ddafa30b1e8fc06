//! Page-level lock management.
//!
//! Transactions take shared locks to read a page and exclusive locks to
//! modify it. A sole shared holder may upgrade to exclusive. Waits are
//! tracked in a wait-for graph; a request that would close a cycle fails
//! immediately instead of blocking.

use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Lock modes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock for read operations.
    Shared,
    /// Exclusive lock for write operations.
    Exclusive,
}

impl LockMode {
    /// Checks if this lock mode is compatible with another.
    pub fn is_compatible_with(&self, other: &LockMode) -> bool {
        matches!((self, other), (LockMode::Shared, LockMode::Shared))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Deadlock detected: {tid} waiting for {pid}")]
    Deadlock { tid: TransactionId, pid: PageId },

    #[error("Lock acquisition timeout: {tid} waiting for {pid}")]
    Timeout { tid: TransactionId, pid: PageId },
}

/// Holders of one page lock.
#[derive(Debug, Default)]
struct LockInfo {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl LockInfo {
    fn mode_of(&self, tid: TransactionId) -> Option<LockMode> {
        if self.exclusive == Some(tid) {
            Some(LockMode::Exclusive)
        } else if self.shared.contains(&tid) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }

    /// Other transactions whose locks conflict with `tid` taking `mode`.
    fn blockers(&self, tid: TransactionId, mode: LockMode) -> HashSet<TransactionId> {
        let held = self
            .exclusive
            .iter()
            .map(|holder| (*holder, LockMode::Exclusive))
            .chain(self.shared.iter().map(|holder| (*holder, LockMode::Shared)));
        held.filter(|(holder, held_mode)| {
            *holder != tid && !mode.is_compatible_with(held_mode)
        })
        .map(|(holder, _)| holder)
        .collect()
    }

    /// Grant if compatible. Exclusive implies shared; a sole shared holder upgrades.
    fn try_grant(&mut self, tid: TransactionId, mode: LockMode) -> bool {
        if !self.blockers(tid, mode).is_empty() {
            return false;
        }
        match mode {
            LockMode::Shared => {
                if self.exclusive != Some(tid) {
                    self.shared.insert(tid);
                }
            }
            LockMode::Exclusive => {
                self.shared.remove(&tid);
                self.exclusive = Some(tid);
            }
        }
        true
    }

    fn release(&mut self, tid: TransactionId) -> bool {
        let was_exclusive = self.exclusive == Some(tid);
        if was_exclusive {
            self.exclusive = None;
        }
        self.shared.remove(&tid) || was_exclusive
    }

    fn is_free(&self) -> bool {
        self.exclusive.is_none() && self.shared.is_empty()
    }
}

/// Deadlock detection information.
#[derive(Debug, Default)]
struct DeadlockDetector {
    /// Wait-for graph: tid -> set of tids it's waiting for.
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl DeadlockDetector {
    fn set_edges(&mut self, waiter: TransactionId, holders: HashSet<TransactionId>) {
        self.wait_for.insert(waiter, holders);
    }

    /// Removes all edges from a transaction.
    fn remove_transaction(&mut self, tid: TransactionId) {
        self.wait_for.remove(&tid);
    }

    /// Whether `waiter` waiting on any of `holders` closes a cycle.
    fn would_cause_deadlock(
        &self,
        waiter: TransactionId,
        holders: &HashSet<TransactionId>,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<TransactionId> = holders.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if current == waiter {
                return true;
            }
            if visited.insert(current) {
                if let Some(waiting_for) = self.wait_for.get(&current) {
                    queue.extend(waiting_for.iter().copied());
                }
            }
        }
        false
    }
}

#[derive(Debug, Default)]
struct LockTable {
    locks: HashMap<PageId, LockInfo>,
    /// Map from transaction ID to the pages it holds locks on.
    transaction_locks: HashMap<TransactionId, HashSet<PageId>>,
    detector: DeadlockDetector,
}

impl LockTable {
    fn release(&mut self, tid: TransactionId, pid: PageId) -> bool {
        let released = match self.locks.get_mut(&pid) {
            Some(info) => {
                let released = info.release(tid);
                if info.is_free() {
                    self.locks.remove(&pid);
                }
                released
            }
            None => false,
        };
        if let Some(pages) = self.transaction_locks.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.transaction_locks.remove(&tid);
            }
        }
        released
    }
}

/// Lock manager for page-level two-phase locking.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `mode` on `pid` for `tid`, blocking until granted.
    ///
    /// Fails on deadlock, or once `timeout` elapses.
    pub fn acquire_lock(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
        timeout: Option<Duration>,
    ) -> Result<(), LockError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut table = self.table.lock();

        loop {
            if table.locks.entry(pid).or_default().try_grant(tid, mode) {
                table.transaction_locks.entry(tid).or_default().insert(pid);
                table.detector.remove_transaction(tid);
                return Ok(());
            }

            let blockers = table
                .locks
                .get(&pid)
                .map(|info| info.blockers(tid, mode))
                .unwrap_or_default();
            if table.detector.would_cause_deadlock(tid, &blockers) {
                table.detector.remove_transaction(tid);
                warn!("{} would deadlock waiting for {:?} on {}", tid, mode, pid);
                return Err(LockError::Deadlock { tid, pid });
            }
            debug!("{} waits for {:?} on {} held by {:?}", tid, mode, pid, blockers);
            table.detector.set_edges(tid, blockers);

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        table.detector.remove_transaction(tid);
                        return Err(LockError::Timeout { tid, pid });
                    }
                    self.released.wait_until(&mut table, deadline);
                }
                None => self.released.wait(&mut table),
            }
        }
    }

    /// Releases a specific lock held by a transaction.
    pub fn release_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        let released = self.table.lock().release(tid, pid);
        if released {
            self.released.notify_all();
        }
        released
    }

    /// Releases all locks held by a transaction.
    pub fn release_all_locks(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.transaction_locks.remove(&tid).unwrap_or_default();
        for pid in pages {
            table.release(tid, pid);
        }
        table.detector.remove_transaction(tid);
        drop(table);
        self.released.notify_all();
    }

    /// Mode `tid` currently holds on `pid`, if any.
    pub fn lock_mode(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        self.table.lock().locks.get(&pid).and_then(|info| info.mode_of(tid))
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_mode(tid, pid).is_some()
    }

    /// Pages `tid` holds any lock on.
    pub fn locked_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .transaction_locks
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }
}
