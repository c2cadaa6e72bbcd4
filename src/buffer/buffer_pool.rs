use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::common::config::DEFAULT_DEADLOCK_TIMEOUT_SECS;
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::HeapPage;
use crate::tuple::Tuple;

use super::lock_manager::LockManager;
use super::lru::LruList;

/// A page cached by the pool. Readers and writers latch the page itself;
/// the pool's own bookkeeping lives behind a separate mutex.
pub type CachedPage = Arc<RwLock<HeapPage>>;

struct PoolState {
    pages: HashMap<PageId, CachedPage>,
    recency: LruList,
}

/// Bounded page cache plus transaction lock manager.
///
/// Holds at most `capacity` pages, evicting the least recently used
/// *clean* page on a miss; dirty pages are never written back by
/// eviction (NO STEAL), only by commit or an explicit flush. Page access
/// is guarded by strict two-phase locks, so a transaction's writes stay
/// invisible to others until it completes.
///
/// Lock order: 2PL lock table, then pool state, then a page latch.
/// Nothing in this module calls back into the pool while holding a page
/// latch, and neither may callers.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    locks: LockManager,
    state: Mutex<PoolState>,
}

impl BufferPool {
    /// Creates a pool caching up to `capacity` pages, with the default
    /// deadlock timeout.
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> Self {
        Self::with_timeout(
            capacity,
            catalog,
            Duration::from_secs(DEFAULT_DEADLOCK_TIMEOUT_SECS),
        )
    }

    /// Creates a pool with an explicit lock-wait timeout.
    pub fn with_timeout(capacity: usize, catalog: Arc<Catalog>, timeout: Duration) -> Self {
        assert!(capacity > 0, "buffer pool needs at least one page");
        Self {
            capacity,
            catalog,
            locks: LockManager::new(timeout),
            state: Mutex::new(PoolState {
                pages: HashMap::new(),
                recency: LruList::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently cached. For tests.
    pub fn cached_pages(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.state.lock().pages.contains_key(&pid)
    }

    /// Fetches a page on behalf of `tid`, acquiring the lock implied by
    /// `perm` first. Blocks while the lock is held incompatibly; a wait
    /// beyond the deadlock timeout fails with `TransactionAborted`, after
    /// which the caller must abort the transaction.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<CachedPage> {
        self.locks.acquire(tid, pid, perm)?;

        let mut state = self.state.lock();
        let page = match state.pages.get(&pid) {
            Some(page) => Arc::clone(page),
            None => {
                while state.pages.len() >= self.capacity {
                    self.evict_one(&mut state)?;
                }
                let file = self.catalog.table_file(pid.table)?;
                let page = Arc::new(RwLock::new(file.read_page(pid)?));
                trace!(%pid, "page miss, read from disk");
                state.pages.insert(pid, Arc::clone(&page));
                page
            }
        };
        state.recency.touch(pid);
        Ok(page)
    }

    /// Drops the least recently used clean page. No disk write happens
    /// here: a clean page is rereadable, and dirty pages must survive
    /// until their transaction resolves.
    fn evict_one(&self, state: &mut PoolState) -> Result<()> {
        let victim = state.recency.iter_oldest_first().find(|pid| {
            state
                .pages
                .get(pid)
                .map(|page| page.read().dirtied_by().is_none())
                .unwrap_or(false)
        });
        match victim {
            Some(pid) => {
                state.pages.remove(&pid);
                state.recency.remove(pid);
                debug!(%pid, "evicted clean page");
                Ok(())
            }
            None => Err(DbError::NoCleanVictim(state.pages.len())),
        }
    }

    /// Inserts `t` into `table`, marking every modified page dirty.
    pub fn insert_tuple(&self, tid: TransactionId, table: TableId, t: &mut Tuple) -> Result<()> {
        let file = self.catalog.table_file(table)?;
        let modified = file.insert_tuple(self, tid, t)?;
        self.mark_pages_dirty(tid, modified)
    }

    /// Deletes `t` from the table recorded in its record id.
    pub fn delete_tuple(&self, tid: TransactionId, t: &Tuple) -> Result<()> {
        let rid = t
            .record_id()
            .ok_or_else(|| DbError::NoSuchElement("tuple has no record id".to_string()))?;
        let file = self.catalog.table_file(rid.page_id.table)?;
        let modified = file.delete_tuple(self, tid, t)?;
        self.mark_pages_dirty(tid, vec![modified])
    }

    /// Marks modified pages dirty and puts them (back) in the cache, so a
    /// page evicted between the mutation and this call is not lost.
    fn mark_pages_dirty(&self, tid: TransactionId, pages: Vec<CachedPage>) -> Result<()> {
        let mut state = self.state.lock();
        for page in pages {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(tid);
                guard.id()
            };
            if !state.pages.contains_key(&pid) {
                while state.pages.len() >= self.capacity {
                    self.evict_one(&mut state)?;
                }
            }
            // Replace any cached version so later reads see this copy
            state.pages.insert(pid, Arc::clone(&page));
            state.recency.touch(pid);
        }
        Ok(())
    }

    /// Writes one cached page to disk and marks it clean. Does nothing
    /// if the page is not cached.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let page = self.state.lock().pages.get(&pid).cloned();
        if let Some(page) = page {
            self.flush_cached(pid, &page)?;
        }
        Ok(())
    }

    fn flush_cached(&self, pid: PageId, page: &CachedPage) -> Result<()> {
        let file = self
            .catalog
            .table_file(pid.table)
            .map_err(|e| DbError::PageWriteError {
                page_id: pid,
                reason: e.to_string(),
            })?;
        let mut guard = page.write();
        file.write_page(&guard)?;
        guard.mark_clean();
        debug!(%pid, "flushed page");
        Ok(())
    }

    /// Flushes every dirty cached page. Breaks NO STEAL for in-flight
    /// transactions; only tests and shutdown paths should call this.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageId, CachedPage)> = {
            let state = self.state.lock();
            state
                .pages
                .iter()
                .map(|(pid, page)| (*pid, Arc::clone(page)))
                .collect()
        };
        for (pid, page) in pages {
            if page.read().dirtied_by().is_some() {
                self.flush_cached(pid, &page)?;
            }
        }
        Ok(())
    }

    /// Flushes the pages dirtied by one transaction.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for pid in self.locks.pages_held(tid) {
            let page = self.state.lock().pages.get(&pid).cloned();
            if let Some(page) = page {
                if page.read().dirtied_by() == Some(tid) {
                    self.flush_cached(pid, &page)?;
                    page.write().set_before_image();
                }
            }
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) {
        let mut state = self.state.lock();
        state.pages.remove(&pid);
        state.recency.remove(pid);
    }

    /// Releases `tid`'s lock on one page without completing the
    /// transaction. Unsafe outside tests and the insert full-page scan:
    /// it breaks strict 2PL.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.locks.release(tid, pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.locks.holds_lock(tid, pid)
    }

    /// Completes `tid`, releasing every lock it holds.
    ///
    /// On commit, each page the transaction dirtied is flushed and its
    /// before-image refreshed. On abort, each such page is replaced by
    /// its before-image; pages the transaction only read are untouched.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        // A concurrent get_page waiting on this transaction must wake
        // and abort rather than sleep out its timeout.
        self.locks.cancel_waiter(tid);

        let mut result = Ok(());
        for pid in self.locks.pages_held(tid) {
            let page = self.state.lock().pages.get(&pid).cloned();
            let Some(page) = page else { continue };

            if commit {
                if page.read().dirtied_by().is_some() {
                    match self.flush_cached(pid, &page) {
                        Ok(()) => page.write().set_before_image(),
                        Err(e) => {
                            if result.is_ok() {
                                result = Err(e);
                            }
                        }
                    }
                }
            } else if page.read().dirtied_by() == Some(tid) {
                let restored = page.read().before_image();
                match restored {
                    Ok(restored) => {
                        let mut state = self.state.lock();
                        state.pages.insert(pid, Arc::new(RwLock::new(restored)));
                        state.recency.touch(pid);
                    }
                    Err(e) => {
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                }
            }
        }

        self.locks.release_all(tid);
        debug!(%tid, commit, "transaction complete");
        result
    }
}
