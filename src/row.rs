//! A layout bound to one byte slice.
//!
//! `Row<'l, B>` is generic over its storage: `&[u8]` for read-only views handed out by a
//! [`Table`](crate::table::Table), `&mut [u8]` for writable views, or `Vec<u8>` for a row
//! that owns its bytes. Field offsets are relative to `layout_offset`, so a layout whose
//! first field sits at byte 4 can be bound to a slice that starts at that byte.
//!
//! `get`/`set` never touch the device; only [`Row::read`] and [`Row::write`] do.

use crate::channel::{Area, Channel};
use crate::codec;
use crate::error::{DbError, Result};
use crate::layout::{Field, Layout};
use crate::value::Value;
use std::fmt;

/// Where a row's bytes live on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowAddress {
    pub area: Area,
    pub db_number: u16,
    /// Device byte address of the row's first byte.
    pub start: usize,
}

pub struct Row<'l, B> {
    layout: &'l Layout,
    data: B,
    layout_offset: usize,
    address: RowAddress,
}

impl<'l, B: AsRef<[u8]>> Row<'l, B> {
    pub fn new(layout: &'l Layout, data: B) -> Self {
        Row {
            layout,
            data,
            layout_offset: 0,
            address: RowAddress::default(),
        }
    }

    /// Layout address that maps to the first byte of the slice.
    pub fn with_layout_offset(mut self, layout_offset: usize) -> Self {
        self.layout_offset = layout_offset;
        self
    }

    pub fn with_address(mut self, address: RowAddress) -> Self {
        self.address = address;
        self
    }

    pub fn layout(&self) -> &'l Layout {
        self.layout
    }

    pub fn address(&self) -> RowAddress {
        self.address
    }

    pub fn layout_offset(&self) -> usize {
        self.layout_offset
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    fn locate(&self, name: &str) -> Result<(&'l Field, usize)> {
        let field = self.layout.field(name)?;
        let offset = field.offset.checked_sub(self.layout_offset).ok_or_else(|| {
            DbError::InvalidArgument(format!(
                "field '{}' at {} lies before layout offset {}",
                field.name, field.offset, self.layout_offset
            ))
        })?;
        Ok((field, offset))
    }

    /// Decode a field by name.
    pub fn get(&self, name: &str) -> Result<Value> {
        let (field, offset) = self.locate(name)?;
        codec::decode(self.as_bytes(), offset, field.bit, field.data_type)
    }

    /// Every field as `(name, value)`, in layout order.
    pub fn export(&self) -> Result<Vec<(String, Value)>> {
        self.layout
            .iter()
            .map(|f| Ok((f.name.clone(), self.get(&f.name)?)))
            .collect()
    }

    /// Persist the row's bytes to the device.
    pub fn write<C: Channel + ?Sized>(&self, channel: &mut C) -> Result<()> {
        let RowAddress { area, db_number, start } = self.address;
        let data = self.as_bytes();
        tracing::debug!(%area, db_number, start, size = data.len(), "row write");
        channel
            .write(area, db_number, start, data)
            .map_err(|e| DbError::Channel(Box::new(e)))
    }
}

impl<'l, B: AsRef<[u8]> + AsMut<[u8]>> Row<'l, B> {
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Encode a field by name, in place. Nothing is sent to the device.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let (field, offset) = self.locate(name)?;
        codec::encode(
            self.data.as_mut(),
            offset,
            field.bit,
            field.data_type,
            &value.into(),
        )
    }

    /// Refresh the row's bytes from the device.
    pub fn read<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<()> {
        let RowAddress { area, db_number, start } = self.address;
        let size = self.as_bytes().len();
        tracing::debug!(%area, db_number, start, size, "row read");
        let fresh = channel
            .read(area, db_number, start, size)
            .map_err(|e| DbError::Channel(Box::new(e)))?;
        if fresh.len() != size {
            return Err(DbError::BufferTooSmall {
                offset: start,
                needed: size,
                available: fresh.len(),
            });
        }
        self.data.as_mut().copy_from_slice(&fresh);
        Ok(())
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for Row<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("address", &self.address)
            .field("layout_offset", &self.layout_offset)
            .field("len", &self.as_bytes().len())
            .finish_non_exhaustive()
    }
}

impl<B: AsRef<[u8]>> fmt::Display for Row<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in self.layout {
            match self.get(&field.name) {
                Ok(v) => writeln!(f, "{} = {}", field.name, v)?,
                Err(e) => writeln!(f, "{} = <{}>", field.name, e)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::parser::parse_layout;

    const LAYOUT: &str = "
4   ID        INT
6   NAME      STRING[4]
12.0 flag     BOOL
13  temp      REAL
";

    #[test]
    fn owned_row_get_set() {
        let layout = parse_layout(LAYOUT).unwrap();
        let mut row = Row::new(&layout, vec![0u8; 13]).with_layout_offset(4);
        row.set("ID", 42i16).unwrap();
        row.set("NAME", "pump").unwrap();
        row.set("flag", true).unwrap();
        row.set("temp", 21.5f32).unwrap();
        assert_eq!(row.as_bytes()[..2], [0, 42]);
        assert_eq!(row.get("ID").unwrap(), Value::I16(42));
        assert_eq!(row.get("NAME").unwrap(), Value::String("pump".into()));
        assert_eq!(row.get("flag").unwrap(), Value::Bool(true));
        assert_eq!(row.get("temp").unwrap(), Value::Float(21.5));
    }

    #[test]
    fn unknown_field() {
        let layout = parse_layout(LAYOUT).unwrap();
        let mut row = Row::new(&layout, vec![0u8; 17]);
        assert!(matches!(row.get("nope"), Err(DbError::UnknownField(n)) if n == "nope"));
        assert!(matches!(row.set("nope", 1i16), Err(DbError::UnknownField(_))));
    }

    #[test]
    fn codec_errors_pass_through() {
        let layout = parse_layout(LAYOUT).unwrap();
        let mut row = Row::new(&layout, vec![0u8; 17]);
        assert!(matches!(row.set("ID", 70_000i32), Err(DbError::OutOfRange(_))));
        assert!(matches!(row.set("temp", "hot"), Err(DbError::TypeMismatch { .. })));
        let mut short = Row::new(&layout, vec![0u8; 10]);
        assert!(matches!(short.set("temp", 1.0f32), Err(DbError::BufferTooSmall { .. })));
    }

    #[test]
    fn field_before_layout_offset() {
        let layout = parse_layout(LAYOUT).unwrap();
        let row = Row::new(&layout, vec![0u8; 13]).with_layout_offset(6);
        assert!(matches!(row.get("ID"), Err(DbError::InvalidArgument(_))));
    }

    #[test]
    fn read_and_write_use_address() {
        let layout = parse_layout(LAYOUT).unwrap();
        let mut ch = MemoryChannel::new();
        let mut image = vec![0u8; 40];
        image[20..22].copy_from_slice(&[0x01, 0x02]);
        ch.insert(Area::Db, 3, image);

        let address = RowAddress { area: Area::Db, db_number: 3, start: 20 };
        let mut row = Row::new(&layout, vec![0u8; 13])
            .with_layout_offset(4)
            .with_address(address);
        row.read(&mut ch).unwrap();
        assert_eq!(row.get("ID").unwrap(), Value::I16(0x0102));

        row.set("ID", -2i16).unwrap();
        assert_eq!(ch.image(Area::Db, 3).unwrap()[20..22], [0x01, 0x02]);
        row.write(&mut ch).unwrap();
        assert_eq!(ch.image(Area::Db, 3).unwrap()[20..22], [0xff, 0xfe]);
    }

    #[test]
    fn channel_error_is_opaque() {
        let layout = parse_layout(LAYOUT).unwrap();
        let mut ch = MemoryChannel::new();
        let mut row = Row::new(&layout, vec![0u8; 13]);
        match row.read(&mut ch) {
            Err(DbError::Channel(e)) => {
                assert!(e.downcast_ref::<crate::channel::MemoryChannelError>().is_some())
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
