use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::common::{DbError, PageId, Permissions, Result, TransactionId};

/// Strict two-phase lock table at page granularity.
///
/// A transaction holds either a shared or an exclusive lock on each page
/// it touches; locks are kept until the transaction completes. Upgrading
/// from shared to exclusive is granted only to the sole shared holder, so
/// two would-be upgraders cannot deadlock on each other.
///
/// Deadlocks resolve by timeout: the wait clock starts the first time a
/// transaction blocks and runs until the transaction completes, so any
/// transaction whose cumulative wait exceeds the timeout is aborted.
pub struct LockManager {
    state: Mutex<LockState>,
    released: Condvar,
    timeout: Duration,
}

#[derive(Default)]
struct LockState {
    exclusive: HashMap<PageId, TransactionId>,
    shared: HashMap<PageId, HashSet<TransactionId>>,
    held_by: HashMap<TransactionId, HashSet<PageId>>,
    wait_since: HashMap<TransactionId, Instant>,
    /// Transactions currently blocked inside `acquire`.
    waiting: HashSet<TransactionId>,
    /// Waiters cancelled by `transaction_complete` on another thread.
    cancelled: HashSet<TransactionId>,
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Blocks until the requested lock is granted, the cumulative wait
    /// exceeds the timeout, or the transaction is cancelled. The two
    /// failure paths both surface as `TransactionAborted`.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, perm: Permissions) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            if state.cancelled.remove(&tid) {
                state.wait_since.remove(&tid);
                return Err(DbError::TransactionAborted(tid));
            }
            if Self::grantable(&state, tid, pid, perm) {
                Self::grant(&mut state, tid, pid, perm);
                return Ok(());
            }

            let started = *state.wait_since.entry(tid).or_insert_with(Instant::now);
            let deadline = started + self.timeout;
            if Instant::now() >= deadline {
                state.wait_since.remove(&tid);
                state.cancelled.remove(&tid);
                debug!(%tid, %pid, "lock wait timed out, aborting transaction");
                return Err(DbError::TransactionAborted(tid));
            }

            state.waiting.insert(tid);
            let _ = self.released.wait_until(&mut state, deadline);
            state.waiting.remove(&tid);
        }
    }

    fn grantable(state: &LockState, tid: TransactionId, pid: PageId, perm: Permissions) -> bool {
        match perm {
            Permissions::ReadOnly => match state.exclusive.get(&pid) {
                None => true,
                Some(&holder) => holder == tid,
            },
            Permissions::ReadWrite => {
                if let Some(&holder) = state.exclusive.get(&pid) {
                    return holder == tid;
                }
                match state.shared.get(&pid) {
                    None => true,
                    Some(readers) => {
                        readers.is_empty() || (readers.len() == 1 && readers.contains(&tid))
                    }
                }
            }
        }
    }

    fn grant(state: &mut LockState, tid: TransactionId, pid: PageId, perm: Permissions) {
        match perm {
            Permissions::ReadOnly => {
                // A reentrant read under an exclusive lock adds nothing.
                if state.exclusive.get(&pid) != Some(&tid) {
                    state.shared.entry(pid).or_default().insert(tid);
                }
            }
            Permissions::ReadWrite => {
                if let Some(readers) = state.shared.get_mut(&pid) {
                    readers.remove(&tid);
                    if readers.is_empty() {
                        state.shared.remove(&pid);
                    }
                }
                state.exclusive.insert(pid, tid);
            }
        }
        state.held_by.entry(tid).or_default().insert(pid);
    }

    /// Drops `tid`'s lock on one page. Breaks strict 2PL; callers other
    /// than the full-page-scan path in insert should not use this.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut state = self.state.lock();
        if state.exclusive.get(&pid) == Some(&tid) {
            state.exclusive.remove(&pid);
        }
        if let Some(readers) = state.shared.get_mut(&pid) {
            readers.remove(&tid);
            if readers.is_empty() {
                state.shared.remove(&pid);
            }
        }
        if let Some(held) = state.held_by.get_mut(&tid) {
            held.remove(&pid);
            if held.is_empty() {
                state.held_by.remove(&tid);
            }
        }
        self.released.notify_all();
    }

    /// Drops every lock `tid` holds and clears its wait record.
    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock();
        if let Some(held) = state.held_by.remove(&tid) {
            for pid in held {
                if state.exclusive.get(&pid) == Some(&tid) {
                    state.exclusive.remove(&pid);
                }
                if let Some(readers) = state.shared.get_mut(&pid) {
                    readers.remove(&tid);
                    if readers.is_empty() {
                        state.shared.remove(&pid);
                    }
                }
            }
        }
        state.wait_since.remove(&tid);
        self.released.notify_all();
    }

    /// Wakes a blocked `acquire` call of `tid`, if any, making it fail
    /// with `TransactionAborted`.
    pub fn cancel_waiter(&self, tid: TransactionId) {
        let mut state = self.state.lock();
        if state.waiting.contains(&tid) {
            state.cancelled.insert(tid);
            self.released.notify_all();
        }
    }

    /// Pages `tid` currently holds a lock on.
    pub fn pages_held(&self, tid: TransactionId) -> Vec<PageId> {
        let state = self.state.lock();
        state
            .held_by
            .get(&tid)
            .map(|held| held.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        let state = self.state.lock();
        state.exclusive.get(&pid) == Some(&tid)
            || state
                .shared
                .get(&pid)
                .map(|readers| readers.contains(&tid))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    fn pid(n: usize) -> PageId {
        PageId::new(TableId::new(1), n)
    }

    fn manager() -> LockManager {
        LockManager::new(Duration::from_millis(50))
    }

    #[test]
    fn test_shared_locks_coexist() {
        let locks = manager();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        locks.acquire(t1, pid(0), Permissions::ReadOnly).unwrap();
        locks.acquire(t2, pid(0), Permissions::ReadOnly).unwrap();
        assert!(locks.holds_lock(t1, pid(0)));
        assert!(locks.holds_lock(t2, pid(0)));
    }

    #[test]
    fn test_exclusive_blocks_until_timeout() {
        let locks = manager();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        locks.acquire(t1, pid(0), Permissions::ReadWrite).unwrap();
        let denied = locks.acquire(t2, pid(0), Permissions::ReadOnly);
        assert!(matches!(denied, Err(DbError::TransactionAborted(_))));
    }

    #[test]
    fn test_upgrade_as_sole_reader() {
        let locks = manager();
        let t1 = TransactionId::new();

        locks.acquire(t1, pid(0), Permissions::ReadOnly).unwrap();
        locks.acquire(t1, pid(0), Permissions::ReadWrite).unwrap();

        // Another reader now has to wait out the timeout.
        let t2 = TransactionId::new();
        assert!(locks.acquire(t2, pid(0), Permissions::ReadOnly).is_err());
    }

    #[test]
    fn test_upgrade_denied_with_other_readers() {
        let locks = manager();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        locks.acquire(t1, pid(0), Permissions::ReadOnly).unwrap();
        locks.acquire(t2, pid(0), Permissions::ReadOnly).unwrap();
        assert!(locks.acquire(t1, pid(0), Permissions::ReadWrite).is_err());
    }

    #[test]
    fn test_release_all_unblocks() {
        let locks = manager();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        locks.acquire(t1, pid(0), Permissions::ReadWrite).unwrap();
        locks.release_all(t1);
        locks.acquire(t2, pid(0), Permissions::ReadWrite).unwrap();
        assert!(!locks.holds_lock(t1, pid(0)));
        assert!(locks.holds_lock(t2, pid(0)));
    }

    #[test]
    fn test_reentrant_exclusive() {
        let locks = manager();
        let t1 = TransactionId::new();

        locks.acquire(t1, pid(0), Permissions::ReadWrite).unwrap();
        locks.acquire(t1, pid(0), Permissions::ReadWrite).unwrap();
        locks.acquire(t1, pid(0), Permissions::ReadOnly).unwrap();
    }
}
