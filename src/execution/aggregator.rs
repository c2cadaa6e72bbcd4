use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Field, FieldType, Tuple, TupleDesc};

/// Reductions computable over a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", s)
    }
}

/// Per-group running reduction. The group key is `None` when the
/// aggregation is ungrouped, giving a single synthetic group.
pub trait Aggregator {
    /// Folds one child tuple into its group.
    fn merge(&mut self, t: &Tuple) -> Result<()>;

    /// Materializes `(group, value)` rows, or `(value)` when ungrouped,
    /// in group-key order.
    fn results(&self) -> Vec<Tuple>;

    /// Schema of the result rows.
    fn desc(&self) -> Arc<TupleDesc>;
}

fn result_desc(group_type: Option<FieldType>) -> Arc<TupleDesc> {
    match group_type {
        Some(group_type) => Arc::new(TupleDesc::unnamed(vec![group_type, FieldType::Int])),
        None => Arc::new(TupleDesc::unnamed(vec![FieldType::Int])),
    }
}

fn result_tuple(desc: &Arc<TupleDesc>, key: &Option<Field>, value: i32) -> Tuple {
    match key {
        Some(key) => Tuple::from_fields(desc.clone(), vec![key.clone(), Field::Int(value)]),
        None => Tuple::from_fields(desc.clone(), vec![Field::Int(value)]),
    }
}

#[derive(Debug, Clone, Copy)]
enum IntAcc {
    Extremum(i32),
    Sum(i32),
    Count(i32),
    Avg { sum: i32, count: i32 },
}

/// Running MIN/MAX/SUM/AVG/COUNT over an integer column.
///
/// AVG accumulates `(sum, count)` and materializes the integer quotient
/// only when results are produced.
pub struct IntegerAggregator {
    group_field: Option<usize>,
    agg_field: usize,
    op: AggregateOp,
    groups: BTreeMap<Option<Field>, IntAcc>,
    desc: Arc<TupleDesc>,
}

impl IntegerAggregator {
    pub fn new(
        group_field: Option<usize>,
        group_type: Option<FieldType>,
        agg_field: usize,
        op: AggregateOp,
    ) -> Self {
        Self {
            group_field,
            agg_field,
            op,
            groups: BTreeMap::new(),
            desc: result_desc(group_type),
        }
    }

    fn initial(&self, v: i32) -> IntAcc {
        match self.op {
            AggregateOp::Min | AggregateOp::Max => IntAcc::Extremum(v),
            AggregateOp::Sum => IntAcc::Sum(v),
            AggregateOp::Count => IntAcc::Count(1),
            AggregateOp::Avg => IntAcc::Avg { sum: v, count: 1 },
        }
    }

    fn fold(&self, acc: IntAcc, v: i32) -> IntAcc {
        match (self.op, acc) {
            (AggregateOp::Min, IntAcc::Extremum(m)) => IntAcc::Extremum(m.min(v)),
            (AggregateOp::Max, IntAcc::Extremum(m)) => IntAcc::Extremum(m.max(v)),
            (AggregateOp::Sum, IntAcc::Sum(s)) => IntAcc::Sum(s + v),
            (AggregateOp::Count, IntAcc::Count(c)) => IntAcc::Count(c + 1),
            (AggregateOp::Avg, IntAcc::Avg { sum, count }) => IntAcc::Avg {
                sum: sum + v,
                count: count + 1,
            },
            (_, acc) => acc,
        }
    }

    fn finish(acc: IntAcc) -> i32 {
        match acc {
            IntAcc::Extremum(v) | IntAcc::Sum(v) | IntAcc::Count(v) => v,
            IntAcc::Avg { sum, count } => sum / count,
        }
    }
}

impl Aggregator for IntegerAggregator {
    fn merge(&mut self, t: &Tuple) -> Result<()> {
        let key = match self.group_field {
            Some(i) => Some(t.field(i)?.clone()),
            None => None,
        };
        let v = match t.field(self.agg_field)? {
            Field::Int(v) => *v,
            Field::Str(_) => {
                return Err(DbError::SchemaMismatch(
                    "integer aggregator over a string column".to_string(),
                ))
            }
        };
        let acc = match self.groups.get(&key) {
            Some(&acc) => self.fold(acc, v),
            None => self.initial(v),
        };
        self.groups.insert(key, acc);
        Ok(())
    }

    fn results(&self) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, &acc)| result_tuple(&self.desc, key, Self::finish(acc)))
            .collect()
    }

    fn desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }
}

/// COUNT over a string column; the only reduction defined for strings.
pub struct StringAggregator {
    group_field: Option<usize>,
    agg_field: usize,
    counts: BTreeMap<Option<Field>, i32>,
    desc: Arc<TupleDesc>,
}

impl StringAggregator {
    /// Fails with `UnsupportedOperator` for anything but COUNT.
    pub fn new(
        group_field: Option<usize>,
        group_type: Option<FieldType>,
        agg_field: usize,
        op: AggregateOp,
    ) -> Result<Self> {
        if op != AggregateOp::Count {
            return Err(DbError::UnsupportedOperator(format!(
                "{} over a string column",
                op
            )));
        }
        Ok(Self {
            group_field,
            agg_field,
            counts: BTreeMap::new(),
            desc: result_desc(group_type),
        })
    }
}

impl Aggregator for StringAggregator {
    fn merge(&mut self, t: &Tuple) -> Result<()> {
        let key = match self.group_field {
            Some(i) => Some(t.field(i)?.clone()),
            None => None,
        };
        // The aggregated column must exist, even though COUNT ignores it.
        t.field(self.agg_field)?;
        *self.counts.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn results(&self) -> Vec<Tuple> {
        self.counts
            .iter()
            .map(|(key, &count)| result_tuple(&self.desc, key, count))
            .collect()
    }

    fn desc(&self) -> Arc<TupleDesc> {
        self.desc.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv_desc() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::named(
            vec![FieldType::Int, FieldType::Int],
            &["k", "v"],
        ))
    }

    fn merge_all(agg: &mut dyn Aggregator, rows: &[(i32, i32)]) {
        let desc = kv_desc();
        for &(k, v) in rows {
            let t = Tuple::from_fields(desc.clone(), vec![Field::Int(k), Field::Int(v)]);
            agg.merge(&t).unwrap();
        }
    }

    fn as_pairs(tuples: &[Tuple]) -> Vec<(i32, i32)> {
        tuples
            .iter()
            .map(|t| match (t.field(0).unwrap(), t.field(1).unwrap()) {
                (Field::Int(k), Field::Int(v)) => (*k, *v),
                _ => unreachable!(),
            })
            .collect()
    }

    const ROWS: &[(i32, i32)] = &[(1, 10), (1, 30), (2, 50), (2, 70), (2, 90)];

    #[test]
    fn test_grouped_sum() {
        let mut agg = IntegerAggregator::new(Some(0), Some(FieldType::Int), 1, AggregateOp::Sum);
        merge_all(&mut agg, ROWS);
        assert_eq!(as_pairs(&agg.results()), vec![(1, 40), (2, 210)]);
    }

    #[test]
    fn test_grouped_min_max_count_avg() {
        for (op, expected) in [
            (AggregateOp::Min, vec![(1, 10), (2, 50)]),
            (AggregateOp::Max, vec![(1, 30), (2, 90)]),
            (AggregateOp::Count, vec![(1, 2), (2, 3)]),
            (AggregateOp::Avg, vec![(1, 20), (2, 70)]),
        ] {
            let mut agg = IntegerAggregator::new(Some(0), Some(FieldType::Int), 1, op);
            merge_all(&mut agg, ROWS);
            assert_eq!(as_pairs(&agg.results()), expected, "op {}", op);
        }
    }

    #[test]
    fn test_ungrouped_avg_truncates() {
        let mut agg = IntegerAggregator::new(None, None, 1, AggregateOp::Avg);
        merge_all(&mut agg, &[(0, 1), (0, 2)]);

        let results = agg.results();
        assert_eq!(results.len(), 1);
        // (1 + 2) / 2 = 1 in integer division
        assert_eq!(results[0].field(0).unwrap(), &Field::Int(1));
    }

    #[test]
    fn test_string_aggregator_counts() {
        let desc = Arc::new(TupleDesc::named(
            vec![FieldType::Int, FieldType::Str],
            &["k", "s"],
        ));
        let mut agg =
            StringAggregator::new(Some(0), Some(FieldType::Int), 1, AggregateOp::Count).unwrap();
        for (k, s) in [(1, "a"), (1, "b"), (2, "c")] {
            let t = Tuple::from_fields(desc.clone(), vec![Field::Int(k), Field::from(s)]);
            agg.merge(&t).unwrap();
        }
        assert_eq!(as_pairs(&agg.results()), vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_string_aggregator_rejects_non_count() {
        assert!(matches!(
            StringAggregator::new(None, None, 0, AggregateOp::Sum),
            Err(DbError::UnsupportedOperator(_))
        ));
    }
}
