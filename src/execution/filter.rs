use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::operator::{BoxedOp, OpIterator};
use super::predicate::Predicate;

/// Relational select: forwards the child tuples that satisfy a
/// predicate.
pub struct Filter {
    predicate: Predicate,
    child: BoxedOp,
    opened: bool,
    lookahead: Option<Tuple>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: BoxedOp) -> Self {
        Self {
            predicate,
            child,
            opened: false,
            lookahead: None,
        }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.opened = true;
        self.lookahead = None;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        while self.lookahead.is_none() {
            if !self.child.has_next()? {
                return Ok(false);
            }
            let t = self.child.next()?;
            if self.predicate.eval(&t)? {
                self.lookahead = Some(t);
            }
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement("no more tuples".to_string()));
        }
        self.lookahead
            .take()
            .ok_or_else(|| DbError::NoSuchElement("no more tuples".to_string()))
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        self.child.rewind()?;
        self.lookahead = None;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.opened = false;
        self.lookahead = None;
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
