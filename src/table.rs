//! A data block holding repeated rows of the same layout.
//!
//! The table owns one contiguous buffer. Row `i` starts at
//! `db_offset + i * (row_size + row_padding)` and spans `row_size` bytes; rows handed out by
//! the table borrow that slice, so writes through a row land in the table's buffer and
//! never in a neighbouring row. Buffer index 0 is device byte 0 of the block.

use crate::channel::Area;
use crate::error::{DbError, Result};
use crate::layout::Layout;
use crate::row::{Row, RowAddress};
use crate::value::Value;
use std::collections::HashMap;

/// How a [`Table`] slices its buffer and where it lives on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub area: Area,
    pub db_number: u16,
    /// Bytes per row. `None` derives it from the layout.
    pub row_size: Option<usize>,
    /// Unused bytes between consecutive rows.
    pub row_padding: usize,
    pub row_count: usize,
    /// Layout address of the first byte of a row.
    pub layout_offset: usize,
    /// Buffer index of the first row.
    pub db_offset: usize,
    /// Field used by [`Table::row_by_id`].
    pub id_field: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            area: Area::Db,
            db_number: 0,
            row_size: None,
            row_padding: 0,
            row_count: 1,
            layout_offset: 0,
            db_offset: 0,
            id_field: None,
        }
    }
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, area: Area) -> Self {
        self.area = area;
        self
    }

    pub fn with_db_number(mut self, db_number: u16) -> Self {
        self.db_number = db_number;
        self
    }

    pub fn with_row_size(mut self, row_size: usize) -> Self {
        self.row_size = Some(row_size);
        self
    }

    pub fn with_row_padding(mut self, row_padding: usize) -> Self {
        self.row_padding = row_padding;
        self
    }

    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_layout_offset(mut self, layout_offset: usize) -> Self {
        self.layout_offset = layout_offset;
        self
    }

    pub fn with_db_offset(mut self, db_offset: usize) -> Self {
        self.db_offset = db_offset;
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = Some(id_field.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    layout: Layout,
    buffer: Vec<u8>,
    options: TableOptions,
    row_size: usize,
    stride: usize,
}

impl Table {
    /// Bind `layout` to `buffer`. Fails if any row would not fit.
    pub fn new(layout: Layout, buffer: Vec<u8>, options: TableOptions) -> Result<Self> {
        let layout_offset = options.layout_offset;
        if let Some(f) = layout.iter().find(|f| f.offset < layout_offset) {
            return Err(DbError::InvalidArgument(format!(
                "field '{}' at {} lies before layout offset {}",
                f.name, f.offset, layout_offset
            )));
        }

        let span = layout.span(layout_offset);
        let row_size = options.row_size.unwrap_or(span);
        if span > row_size {
            return Err(DbError::LayoutTooLarge(format!(
                "layout needs {} bytes per row but row size is {}",
                span, row_size
            )));
        }
        let stride = row_size + options.row_padding;
        if stride == 0 {
            return Err(DbError::InvalidArgument(
                "row size and padding are both zero".to_string(),
            ));
        }

        if options.db_offset > buffer.len() {
            return Err(DbError::BufferTooSmall {
                offset: options.db_offset,
                needed: 0,
                available: buffer.len(),
            });
        }

        let needed = stride.checked_mul(options.row_count).ok_or_else(|| {
            DbError::LayoutTooLarge(format!("{} rows of {} bytes", options.row_count, stride))
        })?;
        let available = buffer.len().saturating_sub(options.db_offset);
        if needed > available {
            return Err(DbError::LayoutTooLarge(format!(
                "{} rows of {} bytes from offset {} need {} bytes, buffer has {}",
                options.row_count,
                stride,
                options.db_offset,
                needed,
                available
            )));
        }

        if let Some(id) = &options.id_field {
            layout.field(id)?;
        }

        let table = Table {
            layout,
            buffer,
            options,
            row_size,
            stride,
        };
        table.warn_duplicate_ids();
        tracing::debug!(
            area = %table.options.area,
            db_number = table.options.db_number,
            rows = table.options.row_count,
            row_size,
            stride,
            db_offset = table.options.db_offset,
            layout_offset,
            "table bound"
        );
        Ok(table)
    }

    fn warn_duplicate_ids(&self) {
        let Some(id) = self.options.id_field.as_deref() else {
            return;
        };
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (i, row) in self.rows().enumerate() {
            let key = match row.get(id) {
                Ok(v) => v.to_string(),
                Err(e) => {
                    tracing::debug!(row = i, error = %e, "row id not decodable");
                    continue;
                }
            };
            if let Some(first) = seen.get(&key) {
                tracing::warn!(id = %key, first = *first, duplicate = i, "duplicate row id");
            } else {
                seen.insert(key, i);
            }
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.options.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.options.row_count == 0
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Distance in bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    fn row_start(&self, index: usize) -> usize {
        self.options.db_offset + index * self.stride
    }

    fn address(&self, index: usize) -> RowAddress {
        RowAddress {
            area: self.options.area,
            db_number: self.options.db_number,
            start: self.row_start(index),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(DbError::NotFound(format!(
                "row {} of a {}-row table",
                index,
                self.len()
            )));
        }
        Ok(())
    }

    pub fn row_at(&self, index: usize) -> Result<Row<'_, &[u8]>> {
        self.check_index(index)?;
        let start = self.row_start(index);
        let address = self.address(index);
        Ok(Row::new(&self.layout, &self.buffer[start..start + self.row_size])
            .with_layout_offset(self.options.layout_offset)
            .with_address(address))
    }

    pub fn row_at_mut(&mut self, index: usize) -> Result<Row<'_, &mut [u8]>> {
        self.check_index(index)?;
        let start = self.row_start(index);
        let address = self.address(index);
        let end = start + self.row_size;
        Ok(Row::new(&self.layout, &mut self.buffer[start..end])
            .with_layout_offset(self.options.layout_offset)
            .with_address(address))
    }

    fn id_field(&self) -> Result<&str> {
        self.options
            .id_field
            .as_deref()
            .ok_or_else(|| DbError::InvalidArgument("table has no id field".to_string()))
    }

    fn index_of(&self, id: &Value) -> Result<usize> {
        let field = self.id_field()?;
        for (i, row) in self.rows().enumerate() {
            if row.get(field)?.key_eq(id) {
                return Ok(i);
            }
        }
        Err(DbError::NotFound(format!("no row with {} = {}", field, id)))
    }

    /// First row whose id field equals `id`. Integers match across widths.
    pub fn row_by_id(&self, id: impl Into<Value>) -> Result<Row<'_, &[u8]>> {
        let index = self.index_of(&id.into())?;
        self.row_at(index)
    }

    pub fn row_by_id_mut(&mut self, id: impl Into<Value>) -> Result<Row<'_, &mut [u8]>> {
        let index = self.index_of(&id.into())?;
        self.row_at_mut(index)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_, &[u8]>> + '_ {
        let (row_size, layout_offset) = (self.row_size, self.options.layout_offset);
        let start = self.options.db_offset;
        let end = start + self.stride * self.len();
        let layout = &self.layout;
        let base = self.address(0);
        let stride = self.stride;
        self.buffer[start..end]
            .chunks(stride)
            .enumerate()
            .map(move |(i, chunk)| {
                Row::new(layout, &chunk[..row_size])
                    .with_layout_offset(layout_offset)
                    .with_address(RowAddress {
                        start: base.start + i * stride,
                        ..base
                    })
            })
    }

    pub fn rows_mut(&mut self) -> impl ExactSizeIterator<Item = Row<'_, &mut [u8]>> + '_ {
        let (row_size, layout_offset) = (self.row_size, self.options.layout_offset);
        let start = self.options.db_offset;
        let end = start + self.stride * self.len();
        let base = self.address(0);
        let stride = self.stride;
        let layout = &self.layout;
        self.buffer[start..end]
            .chunks_mut(stride)
            .enumerate()
            .map(move |(i, chunk)| {
                Row::new(layout, &mut chunk[..row_size])
                    .with_layout_offset(layout_offset)
                    .with_address(RowAddress {
                        start: base.start + i * stride,
                        ..base
                    })
            })
    }

    /// Every row exported in order.
    pub fn export(&self) -> Result<Vec<Vec<(String, Value)>>> {
        self.rows().map(|row| row.export()).collect()
    }
}
