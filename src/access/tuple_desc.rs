//! Schema descriptor for the tuples of one table.

use crate::access::value::FieldType;
use crate::storage::error::{StorageError, StorageResult};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One column of a [`TupleDesc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdItem {
    pub field_type: FieldType,
    pub field_name: Option<String>,
}

impl TdItem {
    pub fn new(field_type: FieldType, field_name: Option<String>) -> Self {
        Self {
            field_type,
            field_name,
        }
    }
}

impl fmt::Display for TdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_name {
            Some(name) => write!(f, "{}({})", self.field_type, name),
            None => write!(f, "{}(null)", self.field_type),
        }
    }
}

/// Ordered, immutable list of typed (and optionally named) fields.
///
/// Equality and hashing look at field types only. Use [`TupleDesc::named_eq`]
/// when names matter too.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Build a descriptor from parallel lists of types and names.
    pub fn new<S: Into<String>>(
        types: Vec<FieldType>,
        names: Vec<Option<S>>,
    ) -> StorageResult<Self> {
        if types.len() != names.len() {
            return Err(StorageError::LengthMismatch {
                types: types.len(),
                names: names.len(),
            });
        }
        let items = types
            .into_iter()
            .zip(names)
            .map(|(t, n)| TdItem::new(t, n.map(Into::into)))
            .collect();
        Self::from_items(items)
    }

    /// Build a descriptor with anonymous fields.
    pub fn from_types(types: Vec<FieldType>) -> StorageResult<Self> {
        Self::from_items(types.into_iter().map(|t| TdItem::new(t, None)).collect())
    }

    pub fn from_items(items: Vec<TdItem>) -> StorageResult<Self> {
        if items.is_empty() {
            return Err(StorageError::EmptySchema);
        }
        Ok(Self { items })
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    /// Size in bytes of one tuple with this schema.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.byte_len()).sum()
    }

    pub fn field_name(&self, index: usize) -> StorageResult<Option<&str>> {
        self.item(index).map(|item| item.field_name.as_deref())
    }

    pub fn field_type(&self, index: usize) -> StorageResult<FieldType> {
        self.item(index).map(|item| item.field_type)
    }

    /// Index of the first field called `name`.
    pub fn field_name_to_index(&self, name: &str) -> StorageResult<usize> {
        self.items
            .iter()
            .position(|item| item.field_name.as_deref() == Some(name))
            .ok_or_else(|| StorageError::FieldNotFound(name.to_string()))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TdItem> {
        self.items.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = FieldType> + '_ {
        self.items.iter().map(|item| item.field_type)
    }

    /// New descriptor holding `first`'s fields followed by `second`'s.
    pub fn merge(first: &TupleDesc, second: &TupleDesc) -> TupleDesc {
        let items = first.items.iter().chain(&second.items).cloned().collect();
        TupleDesc { items }
    }

    /// Equality over types *and* names.
    pub fn named_eq(&self, other: &TupleDesc) -> bool {
        self.items == other.items
    }

    fn item(&self, index: usize) -> StorageResult<&TdItem> {
        self.items.get(index).ok_or(StorageError::NoSuchField {
            index,
            num_fields: self.items.len(),
        })
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len() && self.types().eq(other.types())
    }
}

impl Eq for TupleDesc {}

impl Hash for TupleDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.len().hash(state);
        for t in self.types() {
            t.hash(state);
        }
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TupleDesc {
    type Item = &'a TdItem;
    type IntoIter = std::slice::Iter<'a, TdItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(td: &TupleDesc) -> u64 {
        let mut hasher = DefaultHasher::new();
        td.hash(&mut hasher);
        hasher.finish()
    }

    fn named(types: Vec<FieldType>, prefix: &str) -> Result<TupleDesc> {
        let names = (0..types.len())
            .map(|i| Some(format!("{}{}", prefix, i)))
            .collect();
        Ok(TupleDesc::new(types, names)?)
    }

    #[test]
    fn test_construction_rejects_bad_input() {
        let mismatch = TupleDesc::new(vec![FieldType::Int, FieldType::Int], vec![Some("a")]);
        assert!(matches!(
            mismatch,
            Err(StorageError::LengthMismatch { types: 2, names: 1 })
        ));

        let empty = TupleDesc::from_types(vec![]);
        assert!(matches!(empty, Err(StorageError::EmptySchema)));
    }

    #[test]
    fn test_size_and_field_access() -> Result<()> {
        let td = TupleDesc::new(
            vec![FieldType::Int, FieldType::String, FieldType::Int],
            vec![Some("id"), None, Some("id")],
        )?;

        assert_eq!(td.num_fields(), 3);
        assert_eq!(td.size(), 4 + 132 + 4);
        assert_eq!(td.field_name(0)?, Some("id"));
        assert_eq!(td.field_name(1)?, None);
        assert_eq!(td.field_type(1)?, FieldType::String);
        assert!(matches!(
            td.field_type(3),
            Err(StorageError::NoSuchField { index: 3, .. })
        ));

        // Duplicate names resolve to the first match.
        assert_eq!(td.field_name_to_index("id")?, 0);
        assert!(matches!(
            td.field_name_to_index("missing"),
            Err(StorageError::FieldNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unnamed_fields_never_match_by_name() -> Result<()> {
        let td = TupleDesc::from_types(vec![FieldType::Int])?;
        assert!(td.field_name_to_index("").is_err());
        Ok(())
    }

    #[test]
    fn test_merge() -> Result<()> {
        let a = named(vec![FieldType::Int, FieldType::String], "a")?;
        let b = named(vec![FieldType::Int], "b")?;

        let merged = TupleDesc::merge(&a, &b);
        assert_eq!(merged.num_fields(), a.num_fields() + b.num_fields());
        assert_eq!(merged.size(), a.size() + b.size());

        let expected: Vec<&TdItem> = a.iter().chain(b.iter()).collect();
        let actual: Vec<&TdItem> = merged.iter().collect();
        assert_eq!(actual, expected);

        // Inputs are untouched.
        assert_eq!(a.num_fields(), 2);
        assert_eq!(b.num_fields(), 1);
        Ok(())
    }

    #[test]
    fn test_equality_ignores_names() -> Result<()> {
        let a = named(vec![FieldType::Int, FieldType::String], "a")?;
        let b = named(vec![FieldType::Int, FieldType::String], "b")?;
        let anon = TupleDesc::from_types(vec![FieldType::Int, FieldType::String])?;

        assert_eq!(a, b);
        assert_eq!(a, anon);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert!(!a.named_eq(&b));
        assert!(a.named_eq(&a.clone()));

        let swapped = TupleDesc::from_types(vec![FieldType::String, FieldType::Int])?;
        assert_ne!(a, swapped);

        let longer =
            TupleDesc::from_types(vec![FieldType::Int, FieldType::String, FieldType::Int])?;
        assert_ne!(a, longer);
        Ok(())
    }

    #[test]
    fn test_display() -> Result<()> {
        let td = TupleDesc::new(vec![FieldType::Int, FieldType::String], vec![Some("id"), None])?;
        assert_eq!(td.to_string(), "INT_TYPE(id), STRING_TYPE(null)");
        Ok(())
    }
}
