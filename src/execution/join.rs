use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::operator::{BoxedOp, OpIterator};
use super::predicate::JoinPredicate;

/// Nested-loop join.
///
/// For each left tuple the right child is rewound and fully scanned;
/// matching pairs are emitted as the concatenation of the two tuples.
/// The output schema is the merge of the children's schemas.
pub struct Join {
    predicate: JoinPredicate,
    left: BoxedOp,
    right: BoxedOp,
    desc: Arc<TupleDesc>,
    current_left: Option<Tuple>,
    lookahead: Option<Tuple>,
    opened: bool,
}

impl Join {
    pub fn new(predicate: JoinPredicate, left: BoxedOp, right: BoxedOp) -> Self {
        let desc = Arc::new(TupleDesc::merge(&left.tuple_desc(), &right.tuple_desc()));
        Self {
            predicate,
            left,
            right,
            desc,
            current_left: None,
            lookahead: None,
            opened: false,
        }
    }

    fn concat(&self, left: &Tuple, right: &Tuple) -> Result<Tuple> {
        let mut fields = Vec::with_capacity(self.desc.num_fields());
        for i in 0..left.desc().num_fields() {
            fields.push(left.field(i)?.clone());
        }
        for i in 0..right.desc().num_fields() {
            fields.push(right.field(i)?.clone());
        }
        Ok(Tuple::from_fields(self.desc.clone(), fields))
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
        self.opened = true;
        self.current_left = None;
        self.lookahead = None;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::NoSuchElement("operator is not open".to_string()));
        }
        loop {
            if self.lookahead.is_some() {
                return Ok(true);
            }
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(false);
                }
                self.current_left = Some(self.left.next()?);
                self.right.rewind()?;
            }
            while self.right.has_next()? {
                let right = self.right.next()?;
                let left = self
                    .current_left
                    .as_ref()
                    .ok_or_else(|| DbError::NoSuchElement("join lost its left tuple".to_string()))?;
                if self.predicate.eval(left, &right)? {
                    self.lookahead = Some(self.concat(left, &right)?);
                    break;
                }
            }
            if self.lookahead.is_none() {
                // Right side exhausted for this left tuple
                self.current_left = None;
            }
        }
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
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.lookahead = None;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.opened = false;
        self.current_left = None;
        self.lookahead = None;
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        vec![&mut self.left, &mut self.right]
    }

    fn set_children(&mut self, children: Vec<BoxedOp>) {
        let mut children = children.into_iter();
        if let Some(left) = children.next() {
            self.left = left;
        }
        if let Some(right) = children.next() {
            self.right = right;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::tuple_iterator::TupleIterator;
    use crate::tuple::{Field, FieldType, Op};

    fn single_column(values: &[i32]) -> BoxedOp {
        let desc = Arc::new(TupleDesc::named(vec![FieldType::Int], &["x"]));
        let tuples = values
            .iter()
            .map(|&v| Tuple::from_fields(desc.clone(), vec![Field::Int(v)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn pairs(values: &[(i32, i32)]) -> BoxedOp {
        let desc = Arc::new(TupleDesc::named(
            vec![FieldType::Int, FieldType::Int],
            &["y", "z"],
        ));
        let tuples = values
            .iter()
            .map(|&(y, z)| Tuple::from_fields(desc.clone(), vec![Field::Int(y), Field::Int(z)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn drain_rows(join: &mut Join) -> Vec<Vec<i32>> {
        let mut out = Vec::new();
        while join.has_next().unwrap() {
            let t = join.next().unwrap();
            let row = (0..t.desc().num_fields())
                .map(|i| match t.field(i).unwrap() {
                    Field::Int(v) => *v,
                    _ => unreachable!(),
                })
                .collect();
            out.push(row);
        }
        out
    }

    #[test]
    fn test_equi_join() {
        let left = single_column(&[1, 2, 3]);
        let right = pairs(&[(2, 200), (3, 300), (4, 400)]);
        let mut join = Join::new(JoinPredicate::new(0, Op::Equals, 0), left, right);

        assert_eq!(join.tuple_desc().num_fields(), 3);
        join.open().unwrap();
        assert_eq!(drain_rows(&mut join), vec![vec![2, 2, 200], vec![3, 3, 300]]);
    }

    #[test]
    fn test_join_rewind() {
        let left = single_column(&[1, 2]);
        let right = pairs(&[(1, 100), (2, 200)]);
        let mut join = Join::new(JoinPredicate::new(0, Op::Equals, 0), left, right);

        join.open().unwrap();
        let first = drain_rows(&mut join);
        join.rewind().unwrap();
        assert_eq!(drain_rows(&mut join), first);
    }

    #[test]
    fn test_inequality_join() {
        let left = single_column(&[1, 2]);
        let right = pairs(&[(5, 50), (6, 60)]);
        let mut join = Join::new(JoinPredicate::new(0, Op::LessThan, 0), left, right);

        join.open().unwrap();
        // 1 < 5, 1 < 6, 2 < 5, 2 < 6
        assert_eq!(drain_rows(&mut join).len(), 4);
    }
}
