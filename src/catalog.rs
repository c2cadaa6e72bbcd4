//! Table registry: maps table ids to their heap files, names, schemas,
//! and primary-key columns, and loads the textual schema file format.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::common::{DbError, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::{FieldType, TupleDesc};

#[derive(Default)]
struct CatalogState {
    files: HashMap<TableId, Arc<HeapFile>>,
    names: HashMap<TableId, String>,
    ids_by_name: HashMap<String, TableId>,
    primary_keys: HashMap<TableId, String>,
}

/// Registry of every table the engine knows about.
///
/// Adding a table under an existing name shadows the old one for name
/// lookups; the shadowed table stays addressable by id.
#[derive(Default)]
pub struct Catalog {
    state: RwLock<CatalogState>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` under `name` and returns its table id. The
    /// primary-key name may be empty.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, primary_key: &str) -> TableId {
        let id = file.id();
        let mut state = self.state.write();
        state.files.insert(id, file);
        state.names.insert(id, name.to_string());
        state.ids_by_name.insert(name.to_string(), id);
        state.primary_keys.insert(id, primary_key.to_string());
        id
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.state
            .read()
            .ids_by_name
            .get(name)
            .copied()
            .ok_or_else(|| DbError::NoSuchTable(name.to_string()))
    }

    pub fn table_file(&self, id: TableId) -> Result<Arc<HeapFile>> {
        self.state
            .read()
            .files
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchTable(id.to_string()))
    }

    pub fn tuple_desc(&self, id: TableId) -> Result<Arc<TupleDesc>> {
        Ok(self.table_file(id)?.desc().clone())
    }

    pub fn table_name(&self, id: TableId) -> Result<String> {
        self.state
            .read()
            .names
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchTable(id.to_string()))
    }

    pub fn primary_key(&self, id: TableId) -> Result<String> {
        self.state
            .read()
            .primary_keys
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchTable(id.to_string()))
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.state.read().names.keys().copied().collect()
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.files.clear();
        state.names.clear();
        state.ids_by_name.clear();
        state.primary_keys.clear();
    }

    /// Loads a textual schema file, one table per line:
    ///
    /// ```text
    /// users (id int pk, name string, age int)
    /// ```
    ///
    /// Types are case-insensitive; `pk` marks at most one primary-key
    /// column and is the only annotation allowed. The table's data file
    /// is `<name>.dat` next to the schema file, created empty if missing.
    pub fn load_schema<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TableId>> {
        let path = path.as_ref();
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let contents = fs::read_to_string(path)?;

        let mut loaded = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, fields) = parse_table_line(line)?;
            let (desc, primary_key) = parse_fields(line, &fields)?;

            let data_path = base.join(format!("{}.dat", name));
            let file = Arc::new(HeapFile::open(&data_path, Arc::new(desc))?);
            let id = self.add_table(file, &name, &primary_key);
            info!(table = %name, %id, "loaded table from schema file");
            loaded.push(id);
        }
        Ok(loaded)
    }
}

/// Splits `name ( ... )` into the table name and the column list.
fn parse_table_line(line: &str) -> Result<(String, String)> {
    let open = line
        .find('(')
        .ok_or_else(|| DbError::InvalidSchema(format!("missing '(' in line: {}", line)))?;
    let close = line
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or_else(|| DbError::InvalidSchema(format!("missing ')' in line: {}", line)))?;
    let name = line[..open].trim();
    if name.is_empty() {
        return Err(DbError::InvalidSchema(format!(
            "missing table name in line: {}",
            line
        )));
    }
    Ok((name.to_string(), line[open + 1..close].to_string()))
}

fn parse_fields(line: &str, fields: &str) -> Result<(TupleDesc, String)> {
    let mut types = Vec::new();
    let mut names = Vec::new();
    let mut primary_key = String::new();

    for column in fields.split(',') {
        let parts: Vec<&str> = column.split_whitespace().collect();
        let (name, type_name) = match parts.as_slice() {
            [name, type_name] | [name, type_name, _] => (*name, *type_name),
            _ => {
                return Err(DbError::InvalidSchema(format!(
                    "malformed column '{}' in line: {}",
                    column.trim(),
                    line
                )))
            }
        };
        types.push(match type_name.to_lowercase().as_str() {
            "int" => FieldType::Int,
            "string" => FieldType::Str,
            other => {
                return Err(DbError::InvalidSchema(format!("unknown type '{}'", other)))
            }
        });
        names.push(Some(name.to_string()));

        if let [_, _, annotation] = parts.as_slice() {
            if *annotation != "pk" {
                return Err(DbError::InvalidSchema(format!(
                    "unknown annotation '{}'",
                    annotation
                )));
            }
            if !primary_key.is_empty() {
                return Err(DbError::InvalidSchema(format!(
                    "more than one primary key in line: {}",
                    line
                )));
            }
            primary_key = name.to_string();
        }
    }

    if types.is_empty() {
        return Err(DbError::InvalidSchema(format!(
            "no columns in line: {}",
            line
        )));
    }
    Ok((TupleDesc::new(types, names), primary_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn int_desc() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::named(vec![FieldType::Int], &["x"]))
    }

    #[test]
    fn test_add_and_look_up() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new();

        let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), int_desc()).unwrap());
        let id = catalog.add_table(file, "t", "x");

        assert_eq!(catalog.table_id("t").unwrap(), id);
        assert_eq!(catalog.table_name(id).unwrap(), "t");
        assert_eq!(catalog.primary_key(id).unwrap(), "x");
        assert_eq!(catalog.tuple_desc(id).unwrap().num_fields(), 1);
        assert!(catalog.table_id("missing").is_err());
    }

    #[test]
    fn test_name_collision_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new();

        let first = Arc::new(HeapFile::open(dir.path().join("a.dat"), int_desc()).unwrap());
        let second = Arc::new(HeapFile::open(dir.path().join("b.dat"), int_desc()).unwrap());
        let first_id = catalog.add_table(first, "t", "");
        let second_id = catalog.add_table(second, "t", "");

        assert_eq!(catalog.table_id("t").unwrap(), second_id);
        // Shadowed table is still reachable by id
        assert!(catalog.table_file(first_id).is_ok());
    }

    #[test]
    fn test_load_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("catalog.txt");
        let mut schema = fs::File::create(&schema_path).unwrap();
        writeln!(schema, "users (id int pk, name string, age int)").unwrap();
        writeln!(schema).unwrap();
        writeln!(schema, "events (at INT, what STRING)").unwrap();
        drop(schema);

        let catalog = Catalog::new();
        let loaded = catalog.load_schema(&schema_path).unwrap();
        assert_eq!(loaded.len(), 2);

        let users = catalog.table_id("users").unwrap();
        assert_eq!(catalog.primary_key(users).unwrap(), "id");
        let desc = catalog.tuple_desc(users).unwrap();
        assert_eq!(desc.num_fields(), 3);
        assert_eq!(desc.field_type(1).unwrap(), FieldType::Str);
        assert_eq!(desc.field_name(2).unwrap(), Some("age"));

        let events = catalog.table_id("events").unwrap();
        assert_eq!(catalog.primary_key(events).unwrap(), "");
        assert!(dir.path().join("users.dat").exists());
    }

    #[test]
    fn test_load_schema_rejects_bad_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("catalog.txt");
        fs::write(&schema_path, "t (id int primary)\n").unwrap();

        let catalog = Catalog::new();
        assert!(matches!(
            catalog.load_schema(&schema_path),
            Err(DbError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_load_schema_rejects_two_primary_keys() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("catalog.txt");
        fs::write(&schema_path, "t (a int pk, b int pk)\n").unwrap();

        let catalog = Catalog::new();
        assert!(matches!(
            catalog.load_schema(&schema_path),
            Err(DbError::InvalidSchema(_))
        ));
    }
}
