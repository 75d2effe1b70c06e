//! Boundary with the device transport.
//!
//! The crate never talks to a controller itself. Rows hand a [`Channel`] the address range
//! they cover and copy bytes in or out; connecting, timeouts and retries belong to the
//! channel implementation. [`MemoryChannel`] is an in-process stand-in backed by byte images.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Memory areas of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Area {
    /// Process inputs.
    Pe,
    /// Process outputs.
    Pa,
    /// Markers (flags).
    Mk,
    /// Data blocks; the only area where the block number matters.
    #[default]
    Db,
    /// Counters.
    Ct,
    /// Timers.
    Tm,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Area::Pe => "PE",
            Area::Pa => "PA",
            Area::Mk => "MK",
            Area::Db => "DB",
            Area::Ct => "CT",
            Area::Tm => "TM",
        };
        f.write_str(s)
    }
}

/// Raw byte access to a remote device.
///
/// `db_number` is only meaningful for [`Area::Db`]. Errors are opaque to this crate and are
/// surfaced to callers unchanged inside [`DbError::Channel`](crate::DbError::Channel).
pub trait Channel {
    type Error: std::error::Error + Send + Sync + 'static;

    fn read(
        &mut self,
        area: Area,
        db_number: u16,
        start: usize,
        size: usize,
    ) -> Result<Vec<u8>, Self::Error>;

    fn write(
        &mut self,
        area: Area,
        db_number: u16,
        start: usize,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    type Error = C::Error;

    fn read(
        &mut self,
        area: Area,
        db_number: u16,
        start: usize,
        size: usize,
    ) -> Result<Vec<u8>, Self::Error> {
        (**self).read(area, db_number, start, size)
    }

    fn write(
        &mut self,
        area: Area,
        db_number: u16,
        start: usize,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        (**self).write(area, db_number, start, data)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryChannelError {
    #[error("{area} {db_number} is not mapped")]
    NotMapped { area: Area, db_number: u16 },
    #[error("{area} {db_number}: range {start}..{end} exceeds image size {size}")]
    OutOfBounds {
        area: Area,
        db_number: u16,
        start: usize,
        end: usize,
        size: usize,
    },
}

/// In-memory device: one byte image per area (and per block number for data blocks).
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    images: HashMap<(Area, u16), Vec<u8>>,
    reads: usize,
    writes: usize,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(area: Area, db_number: u16) -> (Area, u16) {
        match area {
            Area::Db => (area, db_number),
            _ => (area, 0),
        }
    }

    /// Map (or replace) the image of an area / data block.
    pub fn insert(&mut self, area: Area, db_number: u16, image: Vec<u8>) {
        self.images.insert(Self::key(area, db_number), image);
    }

    pub fn image(&self, area: Area, db_number: u16) -> Option<&[u8]> {
        self.images
            .get(&Self::key(area, db_number))
            .map(Vec::as_slice)
    }

    /// Number of successful reads served.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of successful writes applied.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn range(
        &mut self,
        area: Area,
        db_number: u16,
        start: usize,
        len: usize,
    ) -> Result<&mut [u8], MemoryChannelError> {
        let image = self
            .images
            .get_mut(&Self::key(area, db_number))
            .ok_or(MemoryChannelError::NotMapped { area, db_number })?;
        let size = image.len();
        let end = start.saturating_add(len);
        if end > size {
            return Err(MemoryChannelError::OutOfBounds {
                area,
                db_number,
                start,
                end,
                size,
            });
        }
        Ok(&mut image[start..end])
    }
}

impl Channel for MemoryChannel {
    type Error = MemoryChannelError;

    fn read(
        &mut self,
        area: Area,
        db_number: u16,
        start: usize,
        size: usize,
    ) -> Result<Vec<u8>, Self::Error> {
        let data = self.range(area, db_number, start, size)?.to_vec();
        self.reads += 1;
        Ok(data)
    }

    fn write(
        &mut self,
        area: Area,
        db_number: u16,
        start: usize,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        self.range(area, db_number, start, data.len())?
            .copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
