//! heapdb - a teaching-scale disk-oriented relational engine in Rust
//!
//! The engine stores tables as heap files of fixed-size pages, caches
//! pages in a bounded buffer pool, and executes queries as trees of
//! pull-based iterator operators.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Tuples** (`tuple`): typed fields (4-byte integers and fixed-width
//!   strings), tuple descriptors, and rows
//! - **Storage** (`storage`): byte-exact page layout and per-table disk I/O
//!   - `HeapPage`: header bitmap plus fixed-width tuple slots
//!   - `HeapFile`: a table as an ordered sequence of pages in one file
//! - **Buffer Pool** (`buffer`): the only shared-mutable component
//!   - `BufferPool`: bounded page cache with LRU eviction of clean pages
//!     (NO STEAL) and commit/abort handling
//!   - `LockManager`: strict two-phase page locks with timeout-based
//!     deadlock resolution
//! - **Catalog** (`catalog`): table registry and textual schema loader
//! - **Execution** (`execution`): pull operators - scan, filter,
//!   nested-loop join, order-by, aggregate, insert, delete
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heapdb::database::Database;
//! use heapdb::common::TransactionId;
//! use heapdb::execution::{OpIterator, SeqScan};
//!
//! let db = Arc::new(Database::new(50));
//! db.catalog().load_schema("schema.txt").unwrap();
//!
//! let tid = TransactionId::new();
//! let table = db.catalog().table_id("users").unwrap();
//! let mut scan = SeqScan::new(db.clone(), tid, table, "u").unwrap();
//! scan.open().unwrap();
//! while scan.has_next().unwrap() {
//!     println!("{}", scan.next().unwrap());
//! }
//! scan.close();
//! db.buffer_pool().transaction_complete(tid, true).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod database;
pub mod execution;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{DbError, PageId, Permissions, RecordId, Result, TableId, TransactionId};
pub use database::Database;
