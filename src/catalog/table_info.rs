//! Table identity and metadata structures.

use crate::access::heap::HeapFile;
use crate::access::tuple_desc::TupleDesc;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl TableId {
    /// Id derived from the canonical path of a table's backing file.
    ///
    /// Two handles on the same file always agree; distinct files collide
    /// only with hash probability.
    pub fn from_path(path: &Path) -> Self {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        TableId(hasher.finish() as u32)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TableInfo {
    pub file: Arc<HeapFile>,
    pub table_name: String,
    pub primary_key: Option<String>,
}

impl TableInfo {
    pub fn new(file: Arc<HeapFile>, table_name: &str, primary_key: Option<&str>) -> Self {
        Self {
            file,
            table_name: table_name.to_string(),
            primary_key: primary_key.map(str::to_string),
        }
    }

    pub fn table_id(&self) -> TableId {
        self.file.id()
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        self.file.tuple_desc()
    }
}
