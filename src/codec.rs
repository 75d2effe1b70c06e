//! Bit-exact get/set of controller data types at an offset inside a byte buffer.
//!
//! All multi-byte quantities are big-endian, signed integers are two's complement and
//! reals are IEEE-754 bit patterns copied verbatim (NaN payloads and subnormals survive).
//! Every accessor checks bounds and returns [`DbError::BufferTooSmall`] instead of panicking.
//!
//! The typed functions (`get_int`, `set_string`, ...) mirror the controller type names.
//! [`decode`] and [`encode`] dispatch on a [`DataType`] and exchange [`Value`]s; they are
//! what [`Row`](crate::row::Row) uses.

use crate::datetime;
use crate::error::{DbError, Result};
use crate::layout::{DataType, MAX_STRING_LEN, MAX_WSTRING_LEN};
use crate::value::Value;
use byteorder::{BigEndian, ByteOrder};

pub(crate) fn window(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let available = buf.len();
    match offset.checked_add(len) {
        Some(end) if end <= available => Ok(&buf[offset..end]),
        _ => Err(DbError::BufferTooSmall {
            offset,
            needed: len,
            available,
        }),
    }
}

pub(crate) fn window_mut(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    let available = buf.len();
    match offset.checked_add(len) {
        Some(end) if end <= available => Ok(&mut buf[offset..end]),
        _ => Err(DbError::BufferTooSmall {
            offset,
            needed: len,
            available,
        }),
    }
}

fn check_bit(bit_index: u8) -> Result<()> {
    if bit_index > 7 {
        return Err(DbError::InvalidArgument(format!(
            "bit index {} outside 0..=7",
            bit_index
        )));
    }
    Ok(())
}

// ==================== Bool ====================

/// Bit `bit_index` (0 = least significant) of the byte at `byte_index`.
pub fn get_bool(buf: &[u8], byte_index: usize, bit_index: u8) -> Result<bool> {
    check_bit(bit_index)?;
    let b = window(buf, byte_index, 1)?[0];
    Ok(b & (1 << bit_index) != 0)
}

/// Set or clear one bit; the other seven bits of the byte are left untouched.
pub fn set_bool(buf: &mut [u8], byte_index: usize, bit_index: u8, value: bool) -> Result<()> {
    check_bit(bit_index)?;
    let w = window_mut(buf, byte_index, 1)?;
    let mask = 1u8 << bit_index;
    if value {
        w[0] |= mask;
    } else {
        w[0] &= !mask;
    }
    Ok(())
}

// ==================== Integers ====================

pub fn get_byte(buf: &[u8], offset: usize) -> Result<u8> {
    Ok(window(buf, offset, 1)?[0])
}

pub fn set_byte(buf: &mut [u8], offset: usize, value: u8) -> Result<()> {
    window_mut(buf, offset, 1)?[0] = value;
    Ok(())
}

pub fn get_sint(buf: &[u8], offset: usize) -> Result<i8> {
    Ok(window(buf, offset, 1)?[0] as i8)
}

pub fn set_sint(buf: &mut [u8], offset: usize, value: i8) -> Result<()> {
    window_mut(buf, offset, 1)?[0] = value as u8;
    Ok(())
}

pub fn get_int(buf: &[u8], offset: usize) -> Result<i16> {
    Ok(BigEndian::read_i16(window(buf, offset, 2)?))
}

pub fn set_int(buf: &mut [u8], offset: usize, value: i16) -> Result<()> {
    BigEndian::write_i16(window_mut(buf, offset, 2)?, value);
    Ok(())
}

/// `WORD` / `UINT`.
pub fn get_word(buf: &[u8], offset: usize) -> Result<u16> {
    Ok(BigEndian::read_u16(window(buf, offset, 2)?))
}

pub fn set_word(buf: &mut [u8], offset: usize, value: u16) -> Result<()> {
    BigEndian::write_u16(window_mut(buf, offset, 2)?, value);
    Ok(())
}

pub fn get_dint(buf: &[u8], offset: usize) -> Result<i32> {
    Ok(BigEndian::read_i32(window(buf, offset, 4)?))
}

pub fn set_dint(buf: &mut [u8], offset: usize, value: i32) -> Result<()> {
    BigEndian::write_i32(window_mut(buf, offset, 4)?, value);
    Ok(())
}

/// `DWORD` / `UDINT`.
pub fn get_dword(buf: &[u8], offset: usize) -> Result<u32> {
    Ok(BigEndian::read_u32(window(buf, offset, 4)?))
}

pub fn set_dword(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
    BigEndian::write_u32(window_mut(buf, offset, 4)?, value);
    Ok(())
}

// ==================== Reals ====================

pub fn get_real(buf: &[u8], offset: usize) -> Result<f32> {
    Ok(f32::from_bits(BigEndian::read_u32(window(buf, offset, 4)?)))
}

pub fn set_real(buf: &mut [u8], offset: usize, value: f32) -> Result<()> {
    BigEndian::write_u32(window_mut(buf, offset, 4)?, value.to_bits());
    Ok(())
}

pub fn get_lreal(buf: &[u8], offset: usize) -> Result<f64> {
    Ok(f64::from_bits(BigEndian::read_u64(window(buf, offset, 8)?)))
}

pub fn set_lreal(buf: &mut [u8], offset: usize, value: f64) -> Result<()> {
    BigEndian::write_u64(window_mut(buf, offset, 8)?, value.to_bits());
    Ok(())
}

// ==================== Characters ====================

/// Single byte character, read as Latin-1.
pub fn get_char(buf: &[u8], offset: usize) -> Result<char> {
    Ok(window(buf, offset, 1)?[0] as char)
}

pub fn set_char(buf: &mut [u8], offset: usize, value: char) -> Result<()> {
    if !value.is_ascii() {
        return Err(DbError::InvalidArgument(format!(
            "CHAR accepts ASCII only, got {:?}",
            value
        )));
    }
    window_mut(buf, offset, 1)?[0] = value as u8;
    Ok(())
}

fn ucs2_unit(unit: u16) -> Result<char> {
    char::from_u32(unit as u32).ok_or_else(|| {
        DbError::InvalidArgument(format!("code unit 0x{:04x} is not a UCS-2 character", unit))
    })
}

fn to_ucs2(c: char) -> Result<u16> {
    u16::try_from(c as u32).map_err(|_| {
        DbError::InvalidArgument(format!("{:?} is outside the Basic Multilingual Plane", c))
    })
}

pub fn get_wchar(buf: &[u8], offset: usize) -> Result<char> {
    ucs2_unit(get_word(buf, offset)?)
}

pub fn set_wchar(buf: &mut [u8], offset: usize, value: char) -> Result<()> {
    set_word(buf, offset, to_ucs2(value)?)
}

// ==================== Strings ====================

fn ascii_only(value: &str, type_name: &str) -> Result<()> {
    if !value.is_ascii() {
        return Err(DbError::InvalidArgument(format!(
            "{} accepts ASCII only, got {:?}",
            type_name, value
        )));
    }
    Ok(())
}

/// Counted string: `[max_len][actual_len][chars...]`. Reads exactly `actual_len` characters.
pub fn get_string(buf: &[u8], offset: usize) -> Result<String> {
    let header = window(buf, offset, 2)?;
    let (max_len, len) = (header[0] as usize, header[1] as usize);
    if len > max_len {
        return Err(DbError::InvalidArgument(format!(
            "STRING at {} holds {} chars but its maximum is {}",
            offset, len, max_len
        )));
    }
    let chars = window(buf, offset + 2, len)?;
    Ok(chars.iter().map(|&b| b as char).collect())
}

/// Write a counted string with the given capacity.
///
/// Characters beyond `capacity` are dropped; unused capacity is filled with spaces.
pub fn set_string(buf: &mut [u8], offset: usize, value: &str, capacity: usize) -> Result<()> {
    ascii_only(value, "STRING")?;
    if capacity == 0 || capacity > MAX_STRING_LEN {
        return Err(DbError::InvalidArgument(format!(
            "STRING capacity {} outside 1..={}",
            capacity, MAX_STRING_LEN
        )));
    }
    let bytes = value.as_bytes();
    let len = bytes.len().min(capacity);
    let w = window_mut(buf, offset, capacity + 2)?;
    w[0] = capacity as u8;
    w[1] = len as u8;
    w[2..2 + len].copy_from_slice(&bytes[..len]);
    w[2 + len..].fill(b' ');
    Ok(())
}

/// Counted wide string: `[max_len:u16][actual_len:u16][units...]`, one UCS-2 unit per char.
pub fn get_wstring(buf: &[u8], offset: usize) -> Result<String> {
    let header = window(buf, offset, 4)?;
    let max_len = BigEndian::read_u16(&header[0..2]) as usize;
    let len = BigEndian::read_u16(&header[2..4]) as usize;
    if len > max_len {
        return Err(DbError::InvalidArgument(format!(
            "WSTRING at {} holds {} chars but its maximum is {}",
            offset, len, max_len
        )));
    }
    window(buf, offset + 4, 2 * len)?
        .chunks_exact(2)
        .map(|unit| ucs2_unit(BigEndian::read_u16(unit)))
        .collect()
}

/// Write a counted wide string. Excess characters are dropped; unused capacity is zeroed.
pub fn set_wstring(buf: &mut [u8], offset: usize, value: &str, capacity: usize) -> Result<()> {
    if capacity == 0 || capacity > MAX_WSTRING_LEN {
        return Err(DbError::InvalidArgument(format!(
            "WSTRING capacity {} outside 1..={}",
            capacity, MAX_WSTRING_LEN
        )));
    }
    let units = value.chars().map(to_ucs2).collect::<Result<Vec<u16>>>()?;
    let len = units.len().min(capacity);
    let w = window_mut(buf, offset, 2 * capacity + 4)?;
    BigEndian::write_u16(&mut w[0..2], capacity as u16);
    BigEndian::write_u16(&mut w[2..4], len as u16);
    for (i, unit) in units[..len].iter().enumerate() {
        BigEndian::write_u16(&mut w[4 + 2 * i..6 + 2 * i], *unit);
    }
    w[4 + 2 * len..].fill(0);
    Ok(())
}

/// Fixed-length string without header. Trailing spaces are stripped.
pub fn get_fstring(buf: &[u8], offset: usize, len: usize) -> Result<String> {
    let s: String = window(buf, offset, len)?.iter().map(|&b| b as char).collect();
    Ok(s.trim_end_matches(' ').to_string())
}

/// Write a fixed-length string, truncated to `len` and space padded.
pub fn set_fstring(buf: &mut [u8], offset: usize, value: &str, len: usize) -> Result<()> {
    ascii_only(value, "FSTRING")?;
    let bytes = value.as_bytes();
    let n = bytes.len().min(len);
    let w = window_mut(buf, offset, len)?;
    w[..n].copy_from_slice(&bytes[..n]);
    w[n..].fill(b' ');
    Ok(())
}

// ==================== Raw bytes ====================

pub fn get_bytes(buf: &[u8], offset: usize, len: usize) -> Result<Vec<u8>> {
    Ok(window(buf, offset, len)?.to_vec())
}

/// Copy `value` into a `len`-byte slot, zero padding the rest. Longer input is rejected.
pub fn set_bytes(buf: &mut [u8], offset: usize, value: &[u8], len: usize) -> Result<()> {
    if value.len() > len {
        return Err(DbError::OutOfRange(format!(
            "{} bytes do not fit BYTES[{}]",
            value.len(),
            len
        )));
    }
    let w = window_mut(buf, offset, len)?;
    w[..value.len()].copy_from_slice(value);
    w[value.len()..].fill(0);
    Ok(())
}

// ==================== Dispatch ====================

fn mismatch(data_type: DataType, value: &Value) -> DbError {
    DbError::TypeMismatch {
        expected: data_type.to_string(),
        got: value.kind().to_string(),
    }
}

/// Convert any integer value to `T`, failing with `OutOfRange` when it does not fit.
fn integer<T>(value: &Value, data_type: DataType) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    if !value.is_integer() {
        return Err(mismatch(data_type, value));
    }
    let converted = match value.as_i64() {
        Some(v) => <T as TryFrom<i64>>::try_from(v).ok(),
        None => value
            .as_u64()
            .and_then(|v| <T as TryFrom<u64>>::try_from(v).ok()),
    };
    converted.ok_or_else(|| {
        DbError::OutOfRange(format!("{} does not fit {}", value, data_type))
    })
}

fn boolean(value: &Value, data_type: DataType) -> Result<bool> {
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    match value {
        v if v.is_integer() => match v.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(DbError::OutOfRange(format!("{} is not 0 or 1", v))),
        },
        v => Err(mismatch(data_type, v)),
    }
}

fn text(value: &Value, data_type: DataType) -> Result<&str> {
    value.as_str().ok_or_else(|| mismatch(data_type, value))
}

fn character(value: &Value, data_type: DataType) -> Result<char> {
    match value {
        Value::Char(c) => Ok(*c),
        v => Err(mismatch(data_type, v)),
    }
}

fn bool_bit(bit: Option<u8>) -> Result<u8> {
    bit.ok_or_else(|| DbError::InvalidArgument("BOOL field without bit index".to_string()))
}

/// Decode the value of type `data_type` stored at `offset` (and `bit`, for `Bool`).
pub fn decode(buf: &[u8], offset: usize, bit: Option<u8>, data_type: DataType) -> Result<Value> {
    Ok(match data_type {
        DataType::Bool => Value::Bool(get_bool(buf, offset, bool_bit(bit)?)?),
        DataType::Byte | DataType::UInt8 => Value::U8(get_byte(buf, offset)?),
        DataType::Int8 => Value::I8(get_sint(buf, offset)?),
        DataType::Char => Value::Char(get_char(buf, offset)?),
        DataType::WChar => Value::Char(get_wchar(buf, offset)?),
        DataType::Int16 => Value::I16(get_int(buf, offset)?),
        DataType::UInt16 => Value::U16(get_word(buf, offset)?),
        DataType::Int32 => Value::I32(get_dint(buf, offset)?),
        DataType::UInt32 => Value::U32(get_dword(buf, offset)?),
        DataType::Real32 => Value::Float(get_real(buf, offset)?),
        DataType::Real64 => Value::Double(get_lreal(buf, offset)?),
        DataType::String(_) => Value::String(get_string(buf, offset)?),
        DataType::WString(_) => Value::String(get_wstring(buf, offset)?),
        DataType::FString(n) => Value::String(get_fstring(buf, offset, n)?),
        DataType::FixedBytes(n) => Value::Bytes(get_bytes(buf, offset, n)?),
        DataType::S5Time => Value::Duration(datetime::get_s5time(buf, offset)?),
        DataType::Time => Value::Duration(datetime::get_time(buf, offset)?),
        DataType::Date => Value::Date(datetime::get_date(buf, offset)?),
        DataType::TimeOfDay => Value::TimeOfDay(datetime::get_tod(buf, offset)?),
        DataType::DateAndTime => Value::DateTime(datetime::get_dt(buf, offset)?),
        DataType::DateTimeLong => Value::DateTime(datetime::get_dtl(buf, offset)?),
    })
}

/// Encode `value` as `data_type` at `offset` (and `bit`, for `Bool`).
///
/// Integer fields accept any integer variant that fits; `LREAL` also accepts `Float`.
pub fn encode(
    buf: &mut [u8],
    offset: usize,
    bit: Option<u8>,
    data_type: DataType,
    value: &Value,
) -> Result<()> {
    match data_type {
        DataType::Bool => set_bool(buf, offset, bool_bit(bit)?, boolean(value, data_type)?),
        DataType::Byte | DataType::UInt8 => set_byte(buf, offset, integer(value, data_type)?),
        DataType::Int8 => set_sint(buf, offset, integer(value, data_type)?),
        DataType::Char => set_char(buf, offset, character(value, data_type)?),
        DataType::WChar => set_wchar(buf, offset, character(value, data_type)?),
        DataType::Int16 => set_int(buf, offset, integer(value, data_type)?),
        DataType::UInt16 => set_word(buf, offset, integer(value, data_type)?),
        DataType::Int32 => set_dint(buf, offset, integer(value, data_type)?),
        DataType::UInt32 => set_dword(buf, offset, integer(value, data_type)?),
        DataType::Real32 => {
            let v = value.as_f32().ok_or_else(|| mismatch(data_type, value))?;
            set_real(buf, offset, v)
        }
        DataType::Real64 => {
            let v = value.as_f64().ok_or_else(|| mismatch(data_type, value))?;
            set_lreal(buf, offset, v)
        }
        DataType::String(n) => set_string(buf, offset, text(value, data_type)?, n),
        DataType::WString(n) => set_wstring(buf, offset, text(value, data_type)?, n),
        DataType::FString(n) => set_fstring(buf, offset, text(value, data_type)?, n),
        DataType::FixedBytes(n) => match value {
            Value::Bytes(b) => set_bytes(buf, offset, b, n),
            v => Err(mismatch(data_type, v)),
        },
        DataType::S5Time | DataType::Time => match value {
            Value::Duration(d) if data_type == DataType::S5Time => {
                datetime::set_s5time(buf, offset, *d)
            }
            Value::Duration(d) => datetime::set_time(buf, offset, *d),
            v => Err(mismatch(data_type, v)),
        },
        DataType::Date => match value {
            Value::Date(d) => datetime::set_date(buf, offset, *d),
            v => Err(mismatch(data_type, v)),
        },
        DataType::TimeOfDay => match value {
            Value::TimeOfDay(t) => datetime::set_tod(buf, offset, *t),
            v => Err(mismatch(data_type, v)),
        },
        DataType::DateAndTime => match value {
            Value::DateTime(dt) => datetime::set_dt(buf, offset, *dt),
            v => Err(mismatch(data_type, v)),
        },
        DataType::DateTimeLong => match value {
            Value::DateTime(dt) => datetime::set_dtl(buf, offset, *dt),
            v => Err(mismatch(data_type, v)),
        },
    }
}
