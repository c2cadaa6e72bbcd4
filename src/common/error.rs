use thiserror::Error;

use super::types::{PageId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("no empty slots on page {0}")]
    NoEmptySlots(PageId),

    #[error("slot {0} is already empty")]
    EmptySlot(usize),

    #[error("tuple is not stored on page {0}")]
    NotOnPage(PageId),

    #[error("failed to read page {page_id}: {reason}")]
    PageReadError { page_id: PageId, reason: String },

    #[error("failed to write page {page_id}: {reason}")]
    PageWriteError { page_id: PageId, reason: String },

    #[error("all {0} cached pages are dirty, nothing to evict")]
    NoCleanVictim(usize),

    #[error("transaction {0} aborted while waiting for a lock")]
    TransactionAborted(TransactionId),

    #[error("unsupported aggregate operator: {0}")]
    UnsupportedOperator(String),

    #[error("invalid schema file: {0}")]
    InvalidSchema(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
