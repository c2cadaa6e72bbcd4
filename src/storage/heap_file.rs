use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{BufferPool, CachedPage};
use crate::common::config::page_size;
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

use super::HeapPage;

/// On-disk storage for one table: an unordered sequence of fixed-size
/// pages in a single file. Tuple reads and writes go through the buffer
/// pool; only page-granular I/O touches the file itself.
pub struct HeapFile {
    file: Mutex<File>,
    path: PathBuf,
    desc: Arc<TupleDesc>,
    id: TableId,
}

impl HeapFile {
    /// Opens the heap file at `path`, creating it empty if missing.
    pub fn open<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let id = Self::table_id_for(&path);
        Ok(Self {
            file: Mutex::new(file),
            path,
            desc,
            id,
        })
    }

    /// Derives the table id from the file path; equal paths yield equal
    /// ids on every open.
    fn table_id_for(path: &Path) -> TableId {
        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = DefaultHasher::new();
        absolute.hash(&mut hasher);
        TableId::new(hasher.finish() as u32)
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages currently in the file.
    pub fn num_pages(&self) -> Result<usize> {
        let file = self.file.lock();
        let len = file.metadata()?.len() as usize;
        Ok((len + page_size() - 1) / page_size())
    }

    /// Reads the page at `pid.page_no` straight from disk.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        let mut buf = vec![0u8; page_size()];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start((pid.page_no * page_size()) as u64))
                .map_err(|e| DbError::PageReadError {
                    page_id: pid,
                    reason: e.to_string(),
                })?;
            file.read_exact(&mut buf).map_err(|e| DbError::PageReadError {
                page_id: pid,
                reason: e.to_string(),
            })?;
        }
        HeapPage::new(pid, &buf, self.desc.clone())
    }

    /// Writes `page` back to its slot in the file. Writing the page just
    /// past the current end grows the file by exactly one page.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.id();
        let data = page.get_page_data();
        let mut file = self.file.lock();
        let write = |file: &mut File| -> std::io::Result<()> {
            file.seek(SeekFrom::Start((pid.page_no * page_size()) as u64))?;
            file.write_all(&data)?;
            file.flush()
        };
        write(&mut file).map_err(|e| DbError::PageWriteError {
            page_id: pid,
            reason: e.to_string(),
        })
    }

    /// Appends one zeroed page and returns its id.
    fn append_empty_page(&self) -> Result<PageId> {
        let mut file = self.file.lock();
        let page_no = file.metadata()?.len() as usize / page_size();
        let pid = PageId::new(self.id, page_no);
        let write = |file: &mut File| -> std::io::Result<()> {
            file.seek(SeekFrom::Start((page_no * page_size()) as u64))?;
            file.write_all(&HeapPage::empty_page_data())?;
            file.flush()
        };
        write(&mut file).map_err(|e| DbError::PageWriteError {
            page_id: pid,
            reason: e.to_string(),
        })?;
        debug!(table = %self.id, page_no, "heap file grew by one page");
        Ok(pid)
    }

    /// First-fit insert: scans existing pages with write permission,
    /// releasing the lock on each full page, and appends a fresh page when
    /// every existing one is full. Returns the pages it modified.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        t: &mut Tuple,
    ) -> Result<Vec<CachedPage>> {
        loop {
            let num_pages = self.num_pages()?;
            for page_no in 0..num_pages {
                let pid = PageId::new(self.id, page_no);
                let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
                let inserted = {
                    let mut guard = page.write();
                    match guard.insert_tuple(t) {
                        Ok(()) => true,
                        Err(DbError::NoEmptySlots(_)) => false,
                        Err(e) => return Err(e),
                    }
                };
                if inserted {
                    return Ok(vec![page]);
                }
                pool.release_page(tid, pid);
            }

            let pid = self.append_empty_page()?;
            let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            let outcome = {
                let mut guard = page.write();
                guard.insert_tuple(t)
            };
            match outcome {
                Ok(()) => return Ok(vec![page]),
                // Another insert raced us onto the fresh page; rescan.
                Err(DbError::NoEmptySlots(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Deletes `t` from the page recorded in its record id. Returns the
    /// modified page.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        t: &Tuple,
    ) -> Result<CachedPage> {
        let rid = t
            .record_id()
            .ok_or_else(|| DbError::NoSuchElement("tuple has no record id".to_string()))?;
        let page = pool.get_page(tid, rid.page_id, Permissions::ReadWrite)?;
        page.write().delete_tuple(t)?;
        Ok(page)
    }

    /// A cursor over every tuple of the table, pinning one page at a time
    /// through the buffer pool with read permission.
    pub fn iterator(self: &Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator::new(Arc::clone(self), pool, tid)
    }
}

/// Lazy page-by-page cursor over a heap file.
///
/// The cursor materializes the tuples of the current page when it first
/// touches it, so it never holds a page latch between calls.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    opened: bool,
    next_page: usize,
    current: std::vec::IntoIter<Tuple>,
}

impl HeapFileIterator {
    fn new(file: Arc<HeapFile>, pool: Arc<BufferPool>, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            opened: false,
            next_page: 0,
            current: Vec::new().into_iter(),
        }
    }

    pub fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.next_page = 0;
        self.current = Vec::new().into_iter();
        Ok(())
    }

    /// Whether another tuple is available. A closed cursor reports `false`.
    pub fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Ok(false);
        }
        loop {
            if !self.current.as_slice().is_empty() {
                return Ok(true);
            }
            if self.next_page >= self.file.num_pages()? {
                return Ok(false);
            }
            let pid = PageId::new(self.file.id(), self.next_page);
            self.next_page += 1;
            let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
            let tuples: Vec<Tuple> = page.read().iter().cloned().collect();
            self.current = tuples.into_iter();
        }
    }

    pub fn next(&mut self) -> Result<Tuple> {
        if self.has_next()? {
            self.current
                .next()
                .ok_or_else(|| DbError::NoSuchElement("cursor is empty".to_string()))
        } else {
            Err(DbError::NoSuchElement("no more tuples".to_string()))
        }
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    pub fn close(&mut self) {
        self.opened = false;
        self.next_page = 0;
        self.current = Vec::new().into_iter();
    }
}
