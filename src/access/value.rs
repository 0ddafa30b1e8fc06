use crate::storage::error::{StorageError, StorageResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Maximum number of bytes stored for a string field.
pub const STRING_LEN: usize = 128;

/// Fixed-width field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    String,
}

impl FieldType {
    /// Number of bytes a field of this type occupies on a page.
    pub fn byte_len(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::String => STRING_LEN + 4,
        }
    }

    /// Decode one field of this type from `reader`.
    pub fn parse<R: Read>(&self, reader: &mut R) -> StorageResult<Field> {
        match self {
            FieldType::Int => Ok(Field::Int(reader.read_i32::<BigEndian>()?)),
            FieldType::String => {
                let len = reader.read_i32::<BigEndian>()?;
                let len = usize::try_from(len)
                    .ok()
                    .filter(|len| *len <= STRING_LEN)
                    .ok_or_else(|| StorageError::Parse(format!("Bad string length: {}", len)))?;
                let mut buf = [0u8; STRING_LEN];
                reader.read_exact(&mut buf)?;
                let s = String::from_utf8_lossy(&buf[..len]).into_owned();
                Ok(Field::String(s))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "INT_TYPE"),
            FieldType::String => write!(f, "STRING_TYPE"),
        }
    }
}

impl FromStr for FieldType {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" => Ok(FieldType::Int),
            "string" => Ok(FieldType::String),
            other => Err(StorageError::Parse(format!("Unknown type: {}", other))),
        }
    }
}

/// A single column value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    String(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::String(_) => FieldType::String,
        }
    }

    /// Write the fixed-width encoding of this field.
    ///
    /// Strings longer than `STRING_LEN` bytes are truncated; the rest of the
    /// slot is zero padded.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> StorageResult<()> {
        match self {
            Field::Int(v) => writer.write_i32::<BigEndian>(*v)?,
            Field::String(s) => {
                let bytes = truncate_utf8(s, STRING_LEN);
                writer.write_i32::<BigEndian>(bytes.len() as i32)?;
                writer.write_all(bytes)?;
                writer.write_all(&[0u8; STRING_LEN][..STRING_LEN - bytes.len()])?;
            }
        }
        Ok(())
    }

    /// Parse a textual value as `field_type`.
    pub fn parse_text(field_type: FieldType, text: &str) -> StorageResult<Self> {
        match field_type {
            FieldType::Int => text
                .trim()
                .parse::<i32>()
                .map(Field::Int)
                .map_err(|e| StorageError::Parse(format!("{:?}: {}", text, e))),
            FieldType::String => Ok(Field::String(text.trim().to_string())),
        }
    }
}

impl PartialOrd for Field {
    /// Fields of different types are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => Some(a.cmp(b)),
            (Field::String(a), Field::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::String(s) => write!(f, "{}", s),
        }
    }
}

fn truncate_utf8(s: &str, max: usize) -> &[u8] {
    if s.len() <= max {
        return s.as_bytes();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s.as_bytes()[..end]
}
