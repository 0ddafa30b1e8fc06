//! Table registry.
//!
//! Maps table ids to their heap files, names and primary keys. The catalog is
//! in-memory only; [`Catalog::load_schema`] repopulates it from a schema file.

pub mod schema;
pub mod table_info;

pub use schema::{parse_schema, TableSchema};
pub use table_info::{TableId, TableInfo};

use crate::access::heap::HeapFile;
use crate::access::tuple_desc::TupleDesc;
use crate::storage::error::{StorageError, StorageResult};
use log::info;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<TableId, TableInfo>,
    by_name: HashMap<String, TableId>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`. An existing table with the same name
    /// or the same id is replaced.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, primary_key: Option<&str>) {
        let info = TableInfo::new(file, name, primary_key);
        let id = info.table_id();

        let mut tables = self.tables.write();
        if let Some(old_id) = tables.by_name.remove(name) {
            tables.by_id.remove(&old_id);
        }
        if let Some(old) = tables.by_id.remove(&id) {
            tables.by_name.remove(&old.table_name);
        }
        tables.by_name.insert(name.to_string(), id);
        tables.by_id.insert(id, info);
        info!("Registered table {} as {}", name, id);
    }

    pub fn table_id(&self, name: &str) -> StorageResult<TableId> {
        self.tables
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| StorageError::UnknownTable(name.to_string()))
    }

    fn with_table<T>(&self, id: TableId, f: impl FnOnce(&TableInfo) -> T) -> StorageResult<T> {
        self.tables
            .read()
            .by_id
            .get(&id)
            .map(f)
            .ok_or_else(|| StorageError::UnknownTable(id.to_string()))
    }

    pub fn tuple_desc(&self, id: TableId) -> StorageResult<Arc<TupleDesc>> {
        self.with_table(id, |t| t.tuple_desc().clone())
    }

    pub fn file(&self, id: TableId) -> StorageResult<Arc<HeapFile>> {
        self.with_table(id, |t| t.file.clone())
    }

    pub fn table_name(&self, id: TableId) -> StorageResult<String> {
        self.with_table(id, |t| t.table_name.clone())
    }

    pub fn primary_key(&self, id: TableId) -> StorageResult<Option<String>> {
        self.with_table(id, |t| t.primary_key.clone())
    }

    /// Ids of all registered tables, in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_id.clear();
        tables.by_name.clear();
    }

    /// Register every table defined in the schema file at `path`.
    ///
    /// Table `name` is backed by `name.dat` beside the schema file; missing
    /// data files are created empty.
    pub fn load_schema(&self, path: &Path) -> StorageResult<Vec<TableId>> {
        let text = fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut ids = Vec::new();
        for table in parse_schema(&text)? {
            let data_path = dir.join(format!("{}.dat", table.name));
            let desc = Arc::new(table.desc);
            let file = if data_path.exists() {
                HeapFile::new(&data_path, desc)?
            } else {
                HeapFile::create(&data_path, desc)?
            };
            let file = Arc::new(file);
            ids.push(file.id());
            self.add_table(file, &table.name, table.primary_key.as_deref());
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::FieldType;
    use anyhow::Result;
    use tempfile::tempdir;

    fn int_desc(n: usize) -> Arc<TupleDesc> {
        Arc::new(TupleDesc::from_types(vec![FieldType::Int; n]).unwrap())
    }

    #[test]
    fn test_add_and_lookup() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();
        let file = Arc::new(HeapFile::create(&dir.path().join("a.dat"), int_desc(2))?);
        let id = file.id();

        catalog.add_table(file, "a", Some("x"));
        assert_eq!(catalog.table_id("a")?, id);
        assert_eq!(catalog.table_name(id)?, "a");
        assert_eq!(catalog.primary_key(id)?.as_deref(), Some("x"));
        assert_eq!(catalog.tuple_desc(id)?.num_fields(), 2);
        assert_eq!(catalog.file(id)?.id(), id);
        assert_eq!(catalog.table_ids(), vec![id]);

        assert!(matches!(catalog.table_id("b"), Err(StorageError::UnknownTable(_))));
        assert!(matches!(
            catalog.file(TableId(id.0.wrapping_add(1))),
            Err(StorageError::UnknownTable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_name_conflict_replaces() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();
        let first = Arc::new(HeapFile::create(&dir.path().join("a.dat"), int_desc(1))?);
        let second = Arc::new(HeapFile::create(&dir.path().join("b.dat"), int_desc(3))?);
        let first_id = first.id();

        catalog.add_table(first, "t", None);
        catalog.add_table(second.clone(), "t", None);
        assert_eq!(catalog.table_id("t")?, second.id());
        assert!(catalog.file(first_id).is_err());
        assert_eq!(catalog.table_ids().len(), 1);

        // Same file under a new name drops the old name
        catalog.add_table(second.clone(), "u", None);
        assert!(catalog.table_id("t").is_err());
        assert_eq!(catalog.table_id("u")?, second.id());

        catalog.clear();
        assert!(catalog.table_ids().is_empty());
        Ok(())
    }

    #[test]
    fn test_load_schema() -> Result<()> {
        let dir = tempdir()?;
        let schema = dir.path().join("catalog.txt");
        fs::write(&schema, "people (id int pk, name string)\nscores (id int, score int)\n")?;

        let catalog = Catalog::new();
        let ids = catalog.load_schema(&schema)?;
        assert_eq!(ids.len(), 2);
        assert!(dir.path().join("people.dat").is_file());
        assert!(dir.path().join("scores.dat").is_file());

        let people = catalog.table_id("people")?;
        assert_eq!(catalog.primary_key(people)?.as_deref(), Some("id"));
        assert_eq!(catalog.tuple_desc(people)?.field_type(1)?, FieldType::String);
        assert_eq!(catalog.file(people)?.num_pages()?, 0);
        Ok(())
    }
}
