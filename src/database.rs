use std::sync::Arc;
use std::time::Duration;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::config::DEFAULT_POOL_CAPACITY;

/// Owner of the engine's shared state: one catalog and one buffer pool.
///
/// The pool holds the catalog so cache misses can resolve a page's table
/// to its heap file. Operators that touch storage hold an
/// `Arc<Database>`.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// Creates a database with a pool of `pool_capacity` pages.
    pub fn new(pool_capacity: usize) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(pool_capacity, Arc::clone(&catalog)));
        Self {
            catalog,
            buffer_pool,
        }
    }

    /// Creates a database with an explicit lock-wait timeout, used by
    /// tests that exercise deadlock resolution.
    pub fn with_timeout(pool_capacity: usize, timeout: Duration) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::with_timeout(
            pool_capacity,
            Arc::clone(&catalog),
            timeout,
        ));
        Self {
            catalog,
            buffer_pool,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}
