use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::operator::{BoxedOp, OpIterator};

/// Operator serving a fixed, in-memory list of tuples. Feeds Insert in
/// tests and demos, and backs any operator that materializes its input.
pub struct TupleIterator {
    desc: Arc<TupleDesc>,
    tuples: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl TupleIterator {
    /// # Panics
    /// Panics if any tuple's schema differs from `desc`.
    pub fn new(desc: Arc<TupleDesc>, tuples: Vec<Tuple>) -> Self {
        assert!(
            tuples.iter().all(|t| *t.desc().as_ref() == *desc),
            "every tuple must match the iterator's schema"
        );
        Self {
            desc,
            tuples,
            cursor: 0,
            opened: false,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        Ok(self.cursor < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement("no more tuples".to_string()));
        }
        let t = self.tuples[self.cursor].clone();
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
        self.opened = false;
        self.cursor = 0;
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        Vec::new()
    }

    fn set_children(&mut self, _children: Vec<BoxedOp>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Field, FieldType};

    fn ints(values: &[i32]) -> TupleIterator {
        let desc = Arc::new(TupleDesc::unnamed(vec![FieldType::Int]));
        let tuples = values
            .iter()
            .map(|&v| Tuple::from_fields(desc.clone(), vec![Field::Int(v)]))
            .collect();
        TupleIterator::new(desc, tuples)
    }

    #[test]
    fn test_iteration_and_rewind() {
        let mut it = ints(&[1, 2, 3]);
        assert!(it.has_next().is_err());

        it.open().unwrap();
        let mut seen = Vec::new();
        while it.has_next().unwrap() {
            seen.push(it.next().unwrap());
        }
        assert_eq!(seen.len(), 3);
        assert!(it.next().is_err());

        it.rewind().unwrap();
        assert!(it.has_next().unwrap());
    }

    #[test]
    fn test_closed_iterator_errors() {
        let mut it = ints(&[1]);
        it.open().unwrap();
        it.close();
        assert!(it.next().is_err());
    }
}
