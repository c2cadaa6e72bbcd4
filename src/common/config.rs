use std::sync::atomic::{AtomicUsize, Ordering};

/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages held by the buffer pool
pub const DEFAULT_POOL_CAPACITY: usize = 50;

/// Default lock-wait timeout in seconds before a transaction is aborted
pub const DEFAULT_DEADLOCK_TIMEOUT_SECS: u64 = 100;

/// Fixed content width of STRING fields in bytes
pub const STRING_SIZE: usize = 128;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Returns the process-wide page size in bytes.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Overrides the process-wide page size. Only for tests; pages constructed
/// before the change keep the layout they were built with.
pub fn set_page_size(size: usize) {
    PAGE_SIZE.store(size, Ordering::Relaxed);
}

/// Restores the default page size. Only for tests.
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}
