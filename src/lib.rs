//! # s7layout: data block layouts for S7 controllers
//!
//! Describe the fields of a controller data block in a small text format, then read and
//! write those fields by name against raw byte buffers using the controller's big-endian
//! wire encodings.
//!
//! ## Layout format
//!
//! One field per line: `<byte>[.<bit>]  <name>  <TYPE>[<length>]`. Blank lines and
//! `#` comments are ignored.
//!
//! ```text
//! # Byte index    Variable name  Datatype
//! 4               ID             INT
//! 6               NAME           STRING[6]
//! 12.0            testbool1      BOOL
//! 13              testReal       REAL
//! ```
//!
//! ## Types
//!
//! - Bits and integers: `BOOL`, `BYTE`, `SINT`, `USINT`, `INT`, `UINT`/`WORD`, `DINT`, `UDINT`/`DWORD`
//! - Floats: `REAL`, `LREAL`
//! - Text: `CHAR`, `WCHAR`, `STRING[n]`, `WSTRING[n]`, `FSTRING[n]`; raw `BYTES[n]`
//! - Time: `S5TIME`, `TIME`, `DATE`, `TOD`, `DT`, `DTL`
//!
//! ## Usage
//!
//! ```
//! use s7layout::{parse_layout, Table, TableOptions, Value};
//!
//! let layout = parse_layout("4 ID INT\n6 NAME STRING[6]\n").unwrap();
//! let options = TableOptions::new()
//!     .with_layout_offset(4)
//!     .with_row_count(2)
//!     .with_id_field("ID");
//! let mut table = Table::new(layout, vec![0; 20], options).unwrap();
//!
//! let mut row = table.row_at_mut(1).unwrap();
//! row.set("ID", 2i16).unwrap();
//! row.set("NAME", "pump").unwrap();
//!
//! let row = table.row_by_id(2).unwrap();
//! assert_eq!(row.get("NAME").unwrap(), Value::String("pump".into()));
//! ```

pub mod channel;
pub mod codec;
pub mod datetime;
pub mod dump;
pub mod error;
pub mod layout;
pub mod parser;
pub mod row;
pub mod table;
pub mod value;

pub use channel::{Area, Channel, MemoryChannel, MemoryChannelError};
pub use error::{DbError, Result};
pub use layout::{DataType, Field, Layout};
pub use parser::{parse_layout, parse_layout_file};
pub use row::{Row, RowAddress};
pub use table::{Table, TableOptions};
pub use value::Value;
