use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Table identifier type - derived from the hash of the table's file path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Page identifier: a table plus the zero-based page number within its file.
/// Hashing covers both components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table: TableId,
    pub page_no: usize,
}

impl PageId {
    pub fn new(table: TableId, page_no: usize) -> Self {
        Self { table, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({}, {})", self.table.0, self.page_no)
    }
}

/// Record identifier - the page holding a tuple plus its slot number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({}, slot {})", self.page_id, self.slot)
    }
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(0);

/// Transaction identifier. Ids are minted from a process-wide monotonic
/// counter; a transaction completes exactly once, by commit or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Mints a fresh transaction id.
    pub fn new() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

/// Access mode requested when fetching a page through the buffer pool.
/// `ReadOnly` maps to a shared lock, `ReadWrite` to an exclusive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_page_id_hash_uses_both_components() {
        // (11, 1) and (1, 11) collide under naive string concatenation
        let a = PageId::new(TableId::new(11), 1);
        let b = PageId::new(TableId::new(1), 11);
        assert_ne!(a, b);
        assert_ne!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_transaction_ids_are_monotonic() {
        let a = TransactionId::new();
        let b = TransactionId::new();
        assert!(b.as_u64() > a.as_u64());
    }
}
