use std::sync::Arc;

use crate::common::{DbError, Result, TableId, TransactionId};
use crate::database::Database;
use crate::storage::HeapFileIterator;
use crate::tuple::{TdItem, Tuple, TupleDesc};

use super::operator::{BoxedOp, OpIterator};

/// Sequential scan over a table, in page-then-slot order.
///
/// The output schema copies the table's with every column name prefixed
/// by the scan alias, so joins over self-joined tables stay unambiguous.
pub struct SeqScan {
    db: Arc<Database>,
    tid: TransactionId,
    table: TableId,
    desc: Arc<TupleDesc>,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(db: Arc<Database>, tid: TransactionId, table: TableId, alias: &str) -> Result<Self> {
        let base = db.catalog().tuple_desc(table)?;
        let items = base
            .items()
            .iter()
            .map(|item| {
                let name = item.name.as_deref().unwrap_or("null");
                TdItem::new(item.field_type, Some(format!("{}.{}", alias, name)))
            })
            .collect::<Vec<_>>();
        let desc = Arc::new(TupleDesc::new(
            items.iter().map(|i| i.field_type).collect(),
            items.into_iter().map(|i| i.name).collect(),
        ));
        Ok(Self {
            db,
            tid,
            table,
            desc,
            iter: None,
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        let file = self.db.catalog().table_file(self.table)?;
        let mut iter = file.iterator(self.db.buffer_pool().clone(), self.tid);
        iter.open()?;
        self.iter = Some(iter);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match &mut self.iter {
            Some(iter) => iter.has_next(),
            None => Err(DbError::NoSuchElement("operator is not open".to_string())),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        match &mut self.iter {
            Some(iter) => iter.next(),
            None => Err(DbError::NoSuchElement("operator is not open".to_string())),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match &mut self.iter {
            Some(iter) => iter.rewind(),
            None => Err(DbError::NoSuchElement("operator is not open".to_string())),
        }
    }

    fn close(&mut self) {
        if let Some(iter) = &mut self.iter {
            iter.close();
        }
        self.iter = None;
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        Vec::new()
    }

    fn set_children(&mut self, _children: Vec<BoxedOp>) {}
}
