//! Bulk loading of heap files.

use crate::access::heap::HeapFile;
use crate::access::tuple::Tuple;
use crate::access::tuple_desc::TupleDesc;
use crate::access::value::Field;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, PageId};
use log::info;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

/// Writes heap files directly, without a buffer pool or transaction.
pub struct HeapFileEncoder;

impl HeapFileEncoder {
    /// Create a heap file at `path` holding `rows` in order, filling each page
    /// before starting the next. Empty input still produces one empty page.
    pub fn convert<I>(rows: I, path: &Path, desc: Arc<TupleDesc>) -> StorageResult<HeapFile>
    where
        I: IntoIterator<Item = Vec<Field>>,
    {
        let file = HeapFile::create(path, desc.clone())?;
        let mut page = HeapPage::empty(PageId::new(file.id(), 0), desc.clone())?;
        let mut written = 0u32;
        let mut count = 0usize;

        for fields in rows {
            let tuple = Tuple::new(desc.clone(), fields)?;
            if page.num_empty_slots() == 0 {
                file.write_page(&page)?;
                written += 1;
                page = HeapPage::empty(PageId::new(file.id(), written), desc.clone())?;
            }
            page.insert_tuple(tuple)?;
            count += 1;
        }
        if written == 0 || page.num_empty_slots() < page.num_slots() {
            file.write_page(&page)?;
        }

        info!(
            "Encoded {} tuples into {} pages at {:?}",
            count,
            file.num_pages()?,
            file.path()
        );
        Ok(file)
    }

    /// Parse comma-separated lines, one tuple per line, and encode them.
    /// Blank lines are skipped; fields are trimmed.
    pub fn convert_text<R: BufRead>(
        input: R,
        path: &Path,
        desc: Arc<TupleDesc>,
    ) -> StorageResult<HeapFile> {
        let mut rows = Vec::new();
        for (n, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(parse_row(&desc, n + 1, &line)?);
        }
        Self::convert(rows, path, desc)
    }
}

fn parse_row(desc: &TupleDesc, line_no: usize, line: &str) -> StorageResult<Vec<Field>> {
    let values: Vec<&str> = line.split(',').collect();
    if values.len() != desc.num_fields() {
        return Err(StorageError::Parse(format!(
            "line {}: expected {} fields, found {}",
            line_no,
            desc.num_fields(),
            values.len()
        )));
    }
    desc.types()
        .zip(values)
        .map(|(field_type, text)| Field::parse_text(field_type, text.trim()))
        .collect::<StorageResult<Vec<_>>>()
        .map_err(|e| StorageError::Parse(format!("line {}: {}", line_no, e)))
}
