mod desc;
mod field;
mod tuple;

pub use desc::{TdItem, TupleDesc};
pub use field::{Field, FieldType, Op};
pub use tuple::Tuple;
