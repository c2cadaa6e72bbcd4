use std::fmt;

use crate::common::Result;
use crate::tuple::{Field, Op, Tuple};

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: Field) -> Self {
        Self { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Whether `t` satisfies the predicate.
    pub fn eval(&self, t: &Tuple) -> Result<bool> {
        Ok(t.field(self.field)?.compare(self.op, &self.operand))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field[{}] {} {}", self.field, self.op, self.operand)
    }
}

/// Compares a field of one tuple against a field of another; used by
/// joins.
#[derive(Debug, Clone)]
pub struct JoinPredicate {
    left_field: usize,
    op: Op,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: Op, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }

    pub fn left_field(&self) -> usize {
        self.left_field
    }

    pub fn right_field(&self) -> usize {
        self.right_field
    }

    pub fn op(&self) -> Op {
        self.op
    }

    /// Whether the pair `(left, right)` satisfies the predicate.
    pub fn eval(&self, left: &Tuple, right: &Tuple) -> Result<bool> {
        Ok(left
            .field(self.left_field)?
            .compare(self.op, right.field(self.right_field)?))
    }
}
