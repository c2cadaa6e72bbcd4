mod aggregate;
mod aggregator;
mod delete;
mod filter;
mod insert;
mod join;
mod operator;
mod order_by;
mod predicate;
mod seq_scan;
mod tuple_iterator;

pub use aggregate::Aggregate;
pub use aggregator::{AggregateOp, Aggregator, IntegerAggregator, StringAggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use operator::{BoxedOp, OpIterator};
pub use order_by::OrderBy;
pub use predicate::{JoinPredicate, Predicate};
pub use seq_scan::SeqScan;
pub use tuple_iterator::TupleIterator;
