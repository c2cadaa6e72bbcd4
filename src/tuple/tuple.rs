use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, RecordId, Result};

use super::{Field, TupleDesc};

/// A single row: a schema, one field per column, and the row's on-page
/// location once it has been stored.
///
/// Fields may be unset only between construction and population; every
/// field must be set before the tuple is serialized or inserted.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Option<Field>>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a tuple with every field unset.
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let fields = vec![None; desc.num_fields()];
        Self {
            desc,
            fields,
            record_id: None,
        }
    }

    /// Creates a fully populated tuple.
    ///
    /// # Panics
    /// Panics if the number of fields doesn't match the schema.
    pub fn from_fields(desc: Arc<TupleDesc>, fields: Vec<Field>) -> Self {
        assert_eq!(
            fields.len(),
            desc.num_fields(),
            "field count must match the schema"
        );
        Self {
            desc,
            fields: fields.into_iter().map(Some).collect(),
            record_id: None,
        }
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Returns the field at `i`, failing if it is out of range or unset.
    pub fn field(&self, i: usize) -> Result<&Field> {
        self.fields
            .get(i)
            .and_then(|f| f.as_ref())
            .ok_or_else(|| DbError::NoSuchElement(format!("no field at index {}", i)))
    }

    pub fn set_field(&mut self, i: usize, field: Field) -> Result<()> {
        match self.fields.get_mut(i) {
            Some(slot) => {
                *slot = Some(field);
                Ok(())
            }
            None => Err(DbError::NoSuchElement(format!("no field at index {}", i))),
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    /// Serializes every field in schema order, appending exactly
    /// `desc.size()` bytes to `out`. Fails if any field is unset.
    pub fn serialize_into(&self, out: &mut Vec<u8>) -> Result<()> {
        for i in 0..self.fields.len() {
            self.field(i)?.serialize_into(out);
        }
        Ok(())
    }
}

/// Descriptor-equal (by types), field-equal, and location-equal.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc
            && self.fields == other.fields
            && self.record_id == other.record_id
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            match field {
                Some(field) => write!(f, "{}", field)?,
                None => write!(f, "<unset>")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PageId, TableId};
    use crate::tuple::FieldType;

    fn two_ints() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::named(
            vec![FieldType::Int, FieldType::Int],
            &["a", "b"],
        ))
    }

    #[test]
    fn test_set_and_get_fields() {
        let mut t = Tuple::new(two_ints());
        assert!(t.field(0).is_err());

        t.set_field(0, Field::Int(7)).unwrap();
        t.set_field(1, Field::Int(9)).unwrap();
        assert_eq!(t.field(0).unwrap(), &Field::Int(7));
        assert_eq!(t.field(1).unwrap(), &Field::Int(9));
        assert!(t.set_field(2, Field::Int(0)).is_err());
    }

    #[test]
    fn test_equality_includes_record_id() {
        let desc = two_ints();
        let a = Tuple::from_fields(desc.clone(), vec![Field::Int(1), Field::Int(2)]);
        let mut b = Tuple::from_fields(desc, vec![Field::Int(1), Field::Int(2)]);
        assert_eq!(a, b);

        b.set_record_id(Some(RecordId::new(PageId::new(TableId::new(1), 0), 3)));
        assert_ne!(a, b);
    }

    #[test]
    fn test_serialize_requires_all_fields() {
        let mut t = Tuple::new(two_ints());
        t.set_field(0, Field::Int(1)).unwrap();

        let mut out = Vec::new();
        assert!(t.serialize_into(&mut out).is_err());

        t.set_field(1, Field::Int(2)).unwrap();
        out.clear();
        t.serialize_into(&mut out).unwrap();
        assert_eq!(out.len(), t.desc().size());
        assert_eq!(out, vec![0, 0, 0, 1, 0, 0, 0, 2]);
    }
}
