use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Field, Tuple, TupleDesc};

use super::operator::{BoxedOp, OpIterator};

/// Sorts the child's tuples by one field.
///
/// The whole input is materialized at `open` and sorted stably, so
/// tuples with equal keys keep their input order.
pub struct OrderBy {
    field: usize,
    asc: bool,
    child: BoxedOp,
    buffer: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl OrderBy {
    pub fn new(field: usize, asc: bool, child: BoxedOp) -> Self {
        Self {
            field,
            asc,
            child,
            buffer: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    pub fn sort_field(&self) -> usize {
        self.field
    }

    pub fn is_ascending(&self) -> bool {
        self.asc
    }
}

impl OpIterator for OrderBy {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;

        let mut keyed: Vec<(Field, Tuple)> = Vec::new();
        while self.child.has_next()? {
            let t = self.child.next()?;
            let key = t.field(self.field)?.clone();
            keyed.push((key, t));
        }
        if self.asc {
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
        } else {
            keyed.sort_by(|a, b| b.0.cmp(&a.0));
        }

        self.buffer = keyed.into_iter().map(|(_, t)| t).collect();
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        Ok(self.cursor < self.buffer.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement("no more tuples".to_string()));
        }
        let t = self.buffer[self.cursor].clone();
        self.cursor += 1;
        Ok(t)
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.buffer.clear();
        self.cursor = 0;
        self.opened = false;
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.child.tuple_desc()
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
