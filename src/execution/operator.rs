use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Tuple, TupleDesc};

/// A physical operator in a query plan.
pub type BoxedOp = Box<dyn OpIterator>;

/// Pull-based iterator contract shared by every physical operator.
///
/// The lifecycle is `open` → (`has_next` / `next`)* → `close`, with
/// `rewind` resetting the operator to the state right after `open`.
/// `next` past exhaustion, or any cursor call on an operator that is not
/// open, fails with `NoSuchElement`.
pub trait OpIterator {
    /// Prepares the operator and its children for iteration.
    fn open(&mut self) -> Result<()>;

    /// Whether another tuple is available.
    fn has_next(&mut self) -> Result<bool>;

    /// Produces the next tuple.
    fn next(&mut self) -> Result<Tuple>;

    /// Resets to the state right after `open`.
    fn rewind(&mut self) -> Result<()>;

    /// Releases the operator's resources; `next` afterwards is an error.
    fn close(&mut self);

    /// The schema of the tuples this operator produces. Stable across
    /// the operator's lifecycle.
    fn tuple_desc(&self) -> Arc<TupleDesc>;

    /// Child operators, for plan rewriting. Leaves return an empty list.
    fn children(&mut self) -> Vec<&mut BoxedOp>;

    /// Replaces the child operators, in the order `children` returns
    /// them. Extra entries are ignored; leaves ignore the call.
    fn set_children(&mut self, children: Vec<BoxedOp>);
}
