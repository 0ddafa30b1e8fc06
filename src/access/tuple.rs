use crate::access::tuple_desc::TupleDesc;
use crate::access::value::Field;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Storage position of a tuple: a page and a slot on that page.
///
/// Stale once the tuple is deleted or its page is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub tuple_number: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, tuple_number: u16) -> Self {
        Self {
            page_id,
            tuple_number,
        }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by page, then by slot
        match self.page_id.cmp(&other.page_id) {
            Ordering::Equal => self.tuple_number.cmp(&other.tuple_number),
            other => other,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.tuple_number)
    }
}

/// One row conforming to a [`TupleDesc`]
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Field>) -> StorageResult<Self> {
        check_fields(&desc, &fields)?;
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Swap the descriptor, e.g. to rename fields after a projection.
    pub fn reset_tuple_desc(&mut self, desc: Arc<TupleDesc>) -> StorageResult<()> {
        check_fields(&desc, &self.fields)?;
        self.desc = desc;
        Ok(())
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    pub fn field(&self, index: usize) -> StorageResult<&Field> {
        self.fields.get(index).ok_or(StorageError::NoSuchField {
            index,
            num_fields: self.fields.len(),
        })
    }

    pub fn set_field(&mut self, index: usize, field: Field) -> StorageResult<()> {
        let expected = self.desc.field_type(index)?;
        if field.field_type() != expected {
            return Err(StorageError::SchemaMismatch {
                expected: expected.to_string(),
                found: field.field_type().to_string(),
            });
        }
        self.fields[index] = field;
        Ok(())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Tuples compare by value; the record id is a storage detail.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.fields == other.fields
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

fn check_fields(desc: &TupleDesc, fields: &[Field]) -> StorageResult<()> {
    let mismatch = fields.len() != desc.num_fields()
        || fields
            .iter()
            .zip(desc.types())
            .any(|(field, t)| field.field_type() != t);
    if mismatch {
        let found = fields
            .iter()
            .map(|f| f.field_type().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(StorageError::SchemaMismatch {
            expected: desc.to_string(),
            found,
        });
    }
    Ok(())
}
