use std::sync::Arc;

use crate::common::{DbError, Result, TransactionId};
use crate::database::Database;
use crate::tuple::{Field, FieldType, Tuple, TupleDesc};

use super::operator::{BoxedOp, OpIterator};

/// Removes every child tuple from its table through the buffer pool.
///
/// Mirrors [`Insert`](super::Insert): the child is drained once at the
/// first `open`, and the operator yields a one-field count tuple.
pub struct Delete {
    db: Arc<Database>,
    tid: TransactionId,
    child: BoxedOp,
    desc: Arc<TupleDesc>,
    count: Option<Tuple>,
    served: bool,
    opened: bool,
}

impl Delete {
    pub fn new(db: Arc<Database>, tid: TransactionId, child: BoxedOp) -> Self {
        Self {
            db,
            tid,
            child,
            desc: Arc::new(TupleDesc::unnamed(vec![FieldType::Int])),
            count: None,
            served: false,
            opened: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> Result<()> {
        if self.count.is_none() {
            self.child.open()?;
            let mut deleted = 0;
            while self.child.has_next()? {
                let t = self.child.next()?;
                self.db.buffer_pool().delete_tuple(self.tid, &t)?;
                deleted += 1;
            }
            self.child.close();
            self.count = Some(Tuple::from_fields(
                self.desc.clone(),
                vec![Field::Int(deleted)],
            ));
        }
        self.served = false;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        Ok(!self.served && self.count.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement("no more tuples".to_string()));
        }
        self.served = true;
        self.count
            .clone()
            .ok_or_else(|| DbError::NoSuchElement("no more tuples".to_string()))
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        self.served = false;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        vec![&mut self.child]
    }

    fn set_children(&mut self, children: Vec<BoxedOp>) {
        if let Some(child) = children.into_iter().next() {
            self.child = child;
        }
    }
}
