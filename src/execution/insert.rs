use std::sync::Arc;

use crate::common::{DbError, Result, TableId, TransactionId};
use crate::database::Database;
use crate::tuple::{Field, FieldType, Tuple, TupleDesc};

use super::operator::{BoxedOp, OpIterator};

/// Pushes every child tuple into a table through the buffer pool.
///
/// The child is drained once, on the first `open`; the operator then
/// yields a single one-field tuple holding the insert count, again after
/// every `rewind`.
pub struct Insert {
    db: Arc<Database>,
    tid: TransactionId,
    child: BoxedOp,
    table: TableId,
    desc: Arc<TupleDesc>,
    count: Option<Tuple>,
    served: bool,
    opened: bool,
}

impl Insert {
    /// Fails with `SchemaMismatch` when the child's schema differs from
    /// the table's.
    pub fn new(
        db: Arc<Database>,
        tid: TransactionId,
        child: BoxedOp,
        table: TableId,
    ) -> Result<Self> {
        let table_desc = db.catalog().tuple_desc(table)?;
        if *child.tuple_desc().as_ref() != *table_desc {
            return Err(DbError::SchemaMismatch(format!(
                "child schema ({}) does not match table schema ({})",
                child.tuple_desc(),
                table_desc
            )));
        }
        Ok(Self {
            db,
            tid,
            child,
            table,
            desc: Arc::new(TupleDesc::unnamed(vec![FieldType::Int])),
            count: None,
            served: false,
            opened: false,
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<()> {
        if self.count.is_none() {
            self.child.open()?;
            let mut inserted = 0;
            while self.child.has_next()? {
                let mut t = self.child.next()?;
                self.db
                    .buffer_pool()
                    .insert_tuple(self.tid, self.table, &mut t)?;
                inserted += 1;
            }
            self.child.close();
            self.count = Some(Tuple::from_fields(
                self.desc.clone(),
                vec![Field::Int(inserted)],
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
