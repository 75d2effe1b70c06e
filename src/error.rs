//! Error taxonomy shared by the parser, codec, rows and tables.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DbError>;

/// Everything that can go wrong between layout text and device bytes.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed layout text. Fatal to the whole parse.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Field name not present in the layout.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Bit index outside 0..=7, malformed string header, impossible calendar value, ...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Value cannot be represented in the field's wire width or range.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A BCD nibble above 9 was found while decoding.
    #[error("Malformed BCD byte 0x{byte:02x} at offset {offset}")]
    MalformedBcd { offset: usize, byte: u8 },

    /// The value variant does not fit the field's data type at all.
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// A table's rows (or a field of a row) do not fit the space available.
    #[error("Layout too large: {0}")]
    LayoutTooLarge(String),

    /// An access reached past the end of the buffer.
    #[error("Buffer too small: need {needed} bytes at offset {offset}, have {available}")]
    BufferTooSmall {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// No row carries the requested id.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure, passed through untouched.
    #[error("Channel: {0}")]
    Channel(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DbError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        DbError::Parse {
            line,
            message: message.into(),
        }
    }
}
