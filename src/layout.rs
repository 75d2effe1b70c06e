//! Layout model: data types, field descriptors and the ordered field table.

use crate::error::{DbError, Result};
use std::collections::HashMap;
use std::fmt;

/// Controller data types a layout field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Byte,
    Char,
    WChar,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Real32,
    Real64,
    /// Counted ASCII string with the given capacity in characters.
    String(usize),
    /// Counted UCS-2 string with the given capacity in code units.
    WString(usize),
    /// Fixed-length, space-padded ASCII without header.
    FString(usize),
    FixedBytes(usize),
    S5Time,
    Time,
    Date,
    TimeOfDay,
    DateAndTime,
    DateTimeLong,
}

/// Largest capacity of a `STRING`.
pub const MAX_STRING_LEN: usize = 254;
/// Largest capacity of a `WSTRING`.
pub const MAX_WSTRING_LEN: usize = 16382;

impl DataType {
    /// Number of bytes the type occupies on the wire. `Bool` occupies part of one byte.
    pub fn width(&self) -> usize {
        match self {
            DataType::Bool
            | DataType::Byte
            | DataType::Char
            | DataType::Int8
            | DataType::UInt8 => 1,
            DataType::WChar | DataType::Int16 | DataType::UInt16 => 2,
            DataType::S5Time | DataType::Date => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Real32 => 4,
            DataType::Time | DataType::TimeOfDay => 4,
            DataType::Real64 | DataType::DateAndTime => 8,
            DataType::DateTimeLong => 12,
            DataType::String(n) => n + 2,
            DataType::WString(n) => 2 * n + 4,
            DataType::FString(n) | DataType::FixedBytes(n) => *n,
        }
    }

    /// Declared capacity for the sized types.
    pub fn length(&self) -> Option<usize> {
        match self {
            DataType::String(n)
            | DataType::WString(n)
            | DataType::FString(n)
            | DataType::FixedBytes(n) => Some(*n),
            _ => None,
        }
    }

    /// Map a type token (`INT`, `string`, `DWORD`, ...) and its optional bracketed length.
    pub fn from_token(token: &str, length: Option<usize>) -> std::result::Result<Self, String> {
        let upper = token.to_ascii_uppercase();
        let sized = |make: fn(usize) -> DataType,
                     default: Option<usize>,
                     max: Option<usize>|
         -> std::result::Result<DataType, String> {
            let n = length
                .or(default)
                .ok_or_else(|| format!("{} requires a length, e.g. {}[10]", upper, upper))?;
            if n == 0 {
                return Err(format!("{}[{}]: length must be at least 1", upper, n));
            }
            if let Some(max) = max {
                if n > max {
                    return Err(format!("{}[{}]: length exceeds maximum {}", upper, n, max));
                }
            }
            Ok(make(n))
        };
        let plain = |dt: DataType| {
            if length.is_some() {
                Err(format!("{} does not take a length", upper))
            } else {
                Ok(dt)
            }
        };
        match upper.as_str() {
            "STRING" => sized(DataType::String, Some(MAX_STRING_LEN), Some(MAX_STRING_LEN)),
            "WSTRING" => sized(DataType::WString, Some(MAX_STRING_LEN), Some(MAX_WSTRING_LEN)),
            "FSTRING" => sized(DataType::FString, None, None),
            "BYTES" => sized(DataType::FixedBytes, None, None),
            "BOOL" => plain(DataType::Bool),
            "BYTE" => plain(DataType::Byte),
            "CHAR" => plain(DataType::Char),
            "WCHAR" => plain(DataType::WChar),
            "SINT" => plain(DataType::Int8),
            "USINT" => plain(DataType::UInt8),
            "INT" => plain(DataType::Int16),
            "UINT" | "WORD" => plain(DataType::UInt16),
            "DINT" => plain(DataType::Int32),
            "UDINT" | "DWORD" => plain(DataType::UInt32),
            "REAL" => plain(DataType::Real32),
            "LREAL" => plain(DataType::Real64),
            "S5TIME" => plain(DataType::S5Time),
            "TIME" => plain(DataType::Time),
            "DATE" => plain(DataType::Date),
            "TOD" | "TIME_OF_DAY" => plain(DataType::TimeOfDay),
            "DT" | "DATE_AND_TIME" => plain(DataType::DateAndTime),
            "DTL" => plain(DataType::DateTimeLong),
            _ => Err(format!("Unknown type: {}", token)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => f.write_str("BOOL"),
            DataType::Byte => f.write_str("BYTE"),
            DataType::Char => f.write_str("CHAR"),
            DataType::WChar => f.write_str("WCHAR"),
            DataType::Int8 => f.write_str("SINT"),
            DataType::UInt8 => f.write_str("USINT"),
            DataType::Int16 => f.write_str("INT"),
            DataType::UInt16 => f.write_str("UINT"),
            DataType::Int32 => f.write_str("DINT"),
            DataType::UInt32 => f.write_str("UDINT"),
            DataType::Real32 => f.write_str("REAL"),
            DataType::Real64 => f.write_str("LREAL"),
            DataType::String(n) => write!(f, "STRING[{}]", n),
            DataType::WString(n) => write!(f, "WSTRING[{}]", n),
            DataType::FString(n) => write!(f, "FSTRING[{}]", n),
            DataType::FixedBytes(n) => write!(f, "BYTES[{}]", n),
            DataType::S5Time => f.write_str("S5TIME"),
            DataType::Time => f.write_str("TIME"),
            DataType::Date => f.write_str("DATE"),
            DataType::TimeOfDay => f.write_str("TIME_OF_DAY"),
            DataType::DateAndTime => f.write_str("DATE_AND_TIME"),
            DataType::DateTimeLong => f.write_str("DTL"),
        }
    }
}

/// One named, typed slot of a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Byte offset relative to the start of the layout's address space.
    pub offset: usize,
    /// Bit index, present only for `Bool`.
    pub bit: Option<u8>,
    pub data_type: DataType,
}

impl Field {
    /// First byte past the field.
    pub fn end_offset(&self) -> usize {
        self.offset + self.data_type.width()
    }
}

/// Ordered field table, indexed by name. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
}

impl Layout {
    /// Build from fields in declaration order. Names must be unique.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            if by_name.insert(f.name.clone(), i).is_some() {
                return Err(DbError::InvalidArgument(format!(
                    "Duplicate field name: {}",
                    f.name
                )));
            }
        }
        Ok(Layout { fields, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Like [`Layout::get`] but fails with [`DbError::UnknownField`].
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.get(name)
            .ok_or_else(|| DbError::UnknownField(name.to_string()))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Smallest declared offset, or 0 for an empty layout.
    pub fn min_offset(&self) -> usize {
        self.fields.iter().map(|f| f.offset).min().unwrap_or(0)
    }

    /// Largest `offset + width` over all fields, or 0 for an empty layout.
    pub fn end_offset(&self) -> usize {
        self.fields.iter().map(Field::end_offset).max().unwrap_or(0)
    }

    /// Bytes a row needs when the layout's addresses start at `layout_offset`.
    pub fn span(&self, layout_offset: usize) -> usize {
        self.end_offset().saturating_sub(layout_offset)
    }
}

impl<'a> IntoIterator for &'a Layout {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
