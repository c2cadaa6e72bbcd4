use std::cmp::Ordering;
use std::fmt;

use crate::common::config::STRING_SIZE;
use crate::common::{DbError, Result};

/// The two column types supported by the engine.
///
/// `Int` is a 4-byte big-endian two's-complement integer. `Str` is a
/// fixed-width string: a 4-byte big-endian content length followed by
/// [`STRING_SIZE`] content bytes, unused tail bytes zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Str,
}

impl FieldType {
    /// Serialized width of a field of this type in bytes.
    pub fn size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Str => 4 + STRING_SIZE,
        }
    }

    /// Parses a field from the first `self.size()` bytes of `data`.
    pub fn parse(&self, data: &[u8]) -> Result<Field> {
        if data.len() < self.size() {
            return Err(DbError::NoSuchElement(format!(
                "need {} bytes to parse a {} field, got {}",
                self.size(),
                self,
                data.len()
            )));
        }
        match self {
            FieldType::Int => {
                let v = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                Ok(Field::Int(v))
            }
            FieldType::Str => {
                let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
                let len = len.min(STRING_SIZE);
                let s = String::from_utf8_lossy(&data[4..4 + len]).into_owned();
                Ok(Field::Str(s))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Str => write!(f, "string"),
        }
    }
}

/// Comparison operators applicable to a pair of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    /// Substring match; defined for strings only.
    Like,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::NotEquals => "<>",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::Like => "LIKE",
        };
        write!(f, "{}", s)
    }
}

/// A single typed value of a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Str(_) => FieldType::Str,
        }
    }

    /// Appends exactly `self.field_type().size()` bytes to `out`.
    ///
    /// Strings longer than [`STRING_SIZE`] bytes are truncated.
    pub fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            Field::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Field::Str(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(STRING_SIZE);
                out.extend_from_slice(&(len as u32).to_be_bytes());
                out.extend_from_slice(&bytes[..len]);
                out.resize(out.len() + (STRING_SIZE - len), 0);
            }
        }
    }

    /// Evaluates `self op other`.
    ///
    /// `Like` is substring containment and only holds between strings;
    /// every other operator uses the natural ordering. Fields of different
    /// types never compare equal.
    pub fn compare(&self, op: Op, other: &Field) -> bool {
        if let Op::Like = op {
            return match (self, other) {
                (Field::Str(s), Field::Str(pattern)) => s.contains(pattern.as_str()),
                _ => false,
            };
        }
        let ord = self.cmp(other);
        match op {
            Op::Equals => ord == Ordering::Equal,
            Op::NotEquals => ord != Ordering::Equal,
            Op::LessThan => ord == Ordering::Less,
            Op::LessThanOrEq => ord != Ordering::Greater,
            Op::GreaterThan => ord == Ordering::Greater,
            Op::GreaterThanOrEq => ord != Ordering::Less,
            Op::Like => unreachable!("handled above"),
        }
    }
}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.cmp(b),
            (Field::Str(a), Field::Str(b)) => a.cmp(b),
            // Cross-type comparisons order by type tag
            (Field::Int(_), Field::Str(_)) => Ordering::Less,
            (Field::Str(_), Field::Int(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Str(v.to_string())
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Str(v)
    }
}
