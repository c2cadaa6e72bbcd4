use std::fmt;

use crate::common::{DbError, Result};

use super::FieldType;

/// One column of a tuple descriptor: a type plus an optional name.
#[derive(Debug, Clone)]
pub struct TdItem {
    pub field_type: FieldType,
    pub name: Option<String>,
}

impl TdItem {
    pub fn new(field_type: FieldType, name: Option<String>) -> Self {
        Self { field_type, name }
    }
}

/// Schema of a tuple: an ordered, non-empty list of typed columns.
///
/// Two descriptors are equal when their column types match in order;
/// names are informational only.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Creates a descriptor from parallel lists of types and names.
    ///
    /// # Panics
    /// Panics if `types` is empty or the lists differ in length.
    pub fn new(types: Vec<FieldType>, names: Vec<Option<String>>) -> Self {
        assert!(!types.is_empty(), "a tuple descriptor needs at least one column");
        assert_eq!(types.len(), names.len(), "one name slot per column");
        let items = types
            .into_iter()
            .zip(names)
            .map(|(field_type, name)| TdItem { field_type, name })
            .collect();
        Self { items }
    }

    /// Creates a descriptor with anonymous columns.
    pub fn unnamed(types: Vec<FieldType>) -> Self {
        let names = vec![None; types.len()];
        Self::new(types, names)
    }

    /// Builds a descriptor from `&str` names, as read from a schema file.
    pub fn named(types: Vec<FieldType>, names: &[&str]) -> Self {
        let names = names.iter().map(|n| Some((*n).to_string())).collect();
        Self::new(types, names)
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[TdItem] {
        &self.items
    }

    pub fn field_type(&self, i: usize) -> Result<FieldType> {
        self.items
            .get(i)
            .map(|item| item.field_type)
            .ok_or_else(|| DbError::NoSuchElement(format!("no column at index {}", i)))
    }

    pub fn field_name(&self, i: usize) -> Result<Option<&str>> {
        self.items
            .get(i)
            .map(|item| item.name.as_deref())
            .ok_or_else(|| DbError::NoSuchElement(format!("no column at index {}", i)))
    }

    /// Index of the first column with the given name.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
            .ok_or_else(|| DbError::NoSuchElement(format!("no column named {}", name)))
    }

    /// Serialized width of a tuple with this schema, in bytes.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.size()).sum()
    }

    /// Concatenates two descriptors, columns of `a` first.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let items = a.items.iter().chain(b.items.iter()).cloned().collect();
        TupleDesc { items }
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &item.name {
                Some(name) => write!(f, "{}({})", item.field_type, name)?,
                None => write!(f, "{}", item.field_type)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_sums_column_widths() {
        let desc = TupleDesc::unnamed(vec![FieldType::Int, FieldType::Str, FieldType::Int]);
        assert_eq!(desc.size(), 4 + 132 + 4);
        assert_eq!(desc.num_fields(), 3);
    }

    #[test]
    fn test_equality_ignores_names() {
        let named = TupleDesc::named(vec![FieldType::Int, FieldType::Int], &["a", "b"]);
        let anonymous = TupleDesc::unnamed(vec![FieldType::Int, FieldType::Int]);
        assert_eq!(named, anonymous);

        let other = TupleDesc::unnamed(vec![FieldType::Int, FieldType::Str]);
        assert_ne!(named, other);
    }

    #[test]
    fn test_merge_concatenates() {
        let left = TupleDesc::named(vec![FieldType::Int], &["x"]);
        let right = TupleDesc::named(vec![FieldType::Int, FieldType::Str], &["y", "z"]);
        let merged = TupleDesc::merge(&left, &right);

        assert_eq!(merged.num_fields(), 3);
        assert_eq!(merged.field_name(0).unwrap(), Some("x"));
        assert_eq!(merged.field_name(2).unwrap(), Some("z"));
        assert_eq!(merged.size(), left.size() + right.size());
    }

    #[test]
    fn test_index_of() {
        let desc = TupleDesc::named(vec![FieldType::Int, FieldType::Str], &["id", "name"]);
        assert_eq!(desc.index_of("name").unwrap(), 1);
        assert!(desc.index_of("missing").is_err());
    }

    #[test]
    #[should_panic]
    fn test_empty_descriptor_panics() {
        TupleDesc::unnamed(Vec::new());
    }
}
