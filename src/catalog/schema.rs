//! Parser for catalog schema files.
//!
//! One table per line:
//!
//! ```text
//! students (id int pk, name string, year int)
//! ```

use crate::access::tuple_desc::TupleDesc;
use crate::access::value::FieldType;
use crate::storage::error::{StorageError, StorageResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub desc: TupleDesc,
    pub primary_key: Option<String>,
}

/// Parse every non-blank line of `text` as a table definition.
pub fn parse_schema(text: &str) -> StorageResult<Vec<TableSchema>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| parse_line(n + 1, line.trim()))
        .collect()
}

fn parse_line(line_no: usize, line: &str) -> StorageResult<TableSchema> {
    let err = |msg: &str| StorageError::Parse(format!("line {}: {}", line_no, msg));

    let open = line.find('(').ok_or_else(|| err("missing '('"))?;
    let close = line.rfind(')').ok_or_else(|| err("missing ')'"))?;
    if close < open {
        return Err(err("')' before '('"));
    }
    let name = line[..open].trim();
    if name.is_empty() {
        return Err(err("missing table name"));
    }

    let mut types = Vec::new();
    let mut names = Vec::new();
    let mut primary_key = None;
    for column in line[open + 1..close].split(',') {
        let words: Vec<&str> = column.split_whitespace().collect();
        let (field, ty) = match words.as_slice() {
            [field, ty] => (*field, *ty),
            [field, ty, pk] if pk.eq_ignore_ascii_case("pk") => {
                primary_key = Some(field.to_string());
                (*field, *ty)
            }
            _ => return Err(err(&format!("malformed column {:?}", column.trim()))),
        };
        types.push(ty.parse::<FieldType>()?);
        names.push(Some(field));
    }

    Ok(TableSchema {
        name: name.to_string(),
        desc: TupleDesc::new(types, names)?,
        primary_key,
    })
}
