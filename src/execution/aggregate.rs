use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{FieldType, Tuple, TupleDesc};

use super::aggregator::{AggregateOp, Aggregator, IntegerAggregator, StringAggregator};
use super::operator::{BoxedOp, OpIterator};

/// Grouped or ungrouped aggregation over one column of the child.
///
/// The child is drained into an aggregator at `open`; results are then
/// served from the materialized group map. Output rows are
/// `(group, value)` when grouping, else the single `(value)`.
pub struct Aggregate {
    child: BoxedOp,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    agg_type: FieldType,
    group_type: Option<FieldType>,
    desc: Arc<TupleDesc>,
    buffer: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl Aggregate {
    /// Fails with `UnsupportedOperator` when asked for anything but
    /// COUNT over a string column.
    pub fn new(
        child: BoxedOp,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let child_desc = child.tuple_desc();
        let agg_type = child_desc.field_type(agg_field)?;
        let group_type = match group_field {
            Some(i) => Some(child_desc.field_type(i)?),
            None => None,
        };
        if agg_type == FieldType::Str && op != AggregateOp::Count {
            return Err(DbError::UnsupportedOperator(format!(
                "{} over a string column",
                op
            )));
        }

        let agg_name = Some(format!(
            "{}({})",
            op,
            child_desc.field_name(agg_field)?.unwrap_or("null")
        ));
        let desc = match (group_field, group_type) {
            (Some(i), Some(group_type)) => {
                let group_name = child_desc.field_name(i)?.map(str::to_string);
                Arc::new(TupleDesc::new(
                    vec![group_type, FieldType::Int],
                    vec![group_name, agg_name],
                ))
            }
            _ => Arc::new(TupleDesc::new(vec![FieldType::Int], vec![agg_name])),
        };

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            agg_type,
            group_type,
            desc,
            buffer: Vec::new(),
            cursor: 0,
            opened: false,
        })
    }

    pub fn aggregate_op(&self) -> AggregateOp {
        self.op
    }

    fn make_aggregator(&self) -> Result<Box<dyn Aggregator>> {
        match self.agg_type {
            FieldType::Int => Ok(Box::new(IntegerAggregator::new(
                self.group_field,
                self.group_type,
                self.agg_field,
                self.op,
            ))),
            FieldType::Str => Ok(Box::new(StringAggregator::new(
                self.group_field,
                self.group_type,
                self.agg_field,
                self.op,
            )?)),
        }
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;

        let mut aggregator = self.make_aggregator()?;
        while self.child.has_next()? {
            aggregator.merge(&self.child.next()?)?;
        }

        // Re-home the rows onto the named output schema.
        self.buffer = aggregator
            .results()
            .into_iter()
            .map(|t| {
                let fields = (0..t.desc().num_fields())
                    .map(|i| t.field(i).cloned())
                    .collect::<Result<Vec<_>>>()?;
                Ok(Tuple::from_fields(self.desc.clone(), fields))
            })
            .collect::<Result<Vec<_>>>()?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::tuple_iterator::TupleIterator;
    use crate::tuple::Field;

    fn rows(values: &[(i32, i32)]) -> BoxedOp {
        let desc = Arc::new(TupleDesc::named(
            vec![FieldType::Int, FieldType::Int],
            &["k", "v"],
        ));
        let tuples = values
            .iter()
            .map(|&(k, v)| Tuple::from_fields(desc.clone(), vec![Field::Int(k), Field::Int(v)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn drain_pairs(op: &mut dyn OpIterator) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        while op.has_next().unwrap() {
            let t = op.next().unwrap();
            match (t.field(0).unwrap(), t.field(1).unwrap()) {
                (Field::Int(k), Field::Int(v)) => out.push((*k, *v)),
                _ => unreachable!(),
            }
        }
        out
    }

    #[test]
    fn test_grouped_sum_operator() {
        let child = rows(&[(1, 10), (1, 30), (2, 50), (2, 70), (2, 90)]);
        let mut agg = Aggregate::new(child, 1, Some(0), AggregateOp::Sum).unwrap();

        agg.open().unwrap();
        assert_eq!(drain_pairs(&mut agg), vec![(1, 40), (2, 210)]);

        agg.rewind().unwrap();
        assert_eq!(drain_pairs(&mut agg), vec![(1, 40), (2, 210)]);
    }

    #[test]
    fn test_ungrouped_count() {
        let child = rows(&[(1, 10), (2, 20), (3, 30)]);
        let mut agg = Aggregate::new(child, 1, None, AggregateOp::Count).unwrap();

        agg.open().unwrap();
        assert_eq!(agg.tuple_desc().num_fields(), 1);
        assert!(agg.has_next().unwrap());
        assert_eq!(agg.next().unwrap().field(0).unwrap(), &Field::Int(3));
        assert!(!agg.has_next().unwrap());
    }

    #[test]
    fn test_output_column_naming() {
        let child = rows(&[(1, 10)]);
        let agg = Aggregate::new(child, 1, Some(0), AggregateOp::Max).unwrap();
        let desc = agg.tuple_desc();
        assert_eq!(desc.field_name(0).unwrap(), Some("k"));
        assert_eq!(desc.field_name(1).unwrap(), Some("max(v)"));
    }

    #[test]
    fn test_string_sum_rejected_at_construction() {
        let desc = Arc::new(TupleDesc::named(vec![FieldType::Str], &["s"]));
        let child: BoxedOp = Box::new(TupleIterator::new(desc, Vec::new()));
        assert!(matches!(
            Aggregate::new(child, 0, None, AggregateOp::Sum),
            Err(DbError::UnsupportedOperator(_))
        ));
    }
}
