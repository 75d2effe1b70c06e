//! Time and date types of the controller.
//!
//! | Type | Bytes | Encoding |
//! |------|-------|----------|
//! | `S5TIME` | 2 | time base in bits 13..12, three BCD digits in bits 11..0 |
//! | `TIME` | 4 | signed milliseconds |
//! | `DATE` | 2 | days since 1990-01-01 |
//! | `TIME_OF_DAY` | 4 | milliseconds since midnight |
//! | `DATE_AND_TIME` | 8 | BCD `YY MM DD hh mm ss` + 3 ms digits + weekday nibble |
//! | `DTL` | 12 | `year:u16 month day weekday hour minute second nanosecond:u32` |
//!
//! BCD decoders reject nibbles above 9 with [`DbError::MalformedBcd`]; every decoder rejects
//! impossible calendar values, every encoder rejects values outside the type's range.

use crate::codec::{window, window_mut};
use crate::error::{DbError, Result};
use byteorder::{BigEndian, ByteOrder};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// S5TIME time bases in milliseconds, indexed by the 2-bit base code.
const S5TIME_BASES: [i64; 4] = [10, 100, 1_000, 10_000];
const MS_PER_DAY: u32 = 86_400_000;
/// `DATE` cannot go past 2168-12-31.
const MAX_DATE_DAYS: i64 = 65_378;

fn bcd_to_u8(byte: u8, offset: usize) -> Result<u8> {
    let (hi, lo) = (byte >> 4, byte & 0x0f);
    if hi > 9 || lo > 9 {
        return Err(DbError::MalformedBcd { offset, byte });
    }
    Ok(hi * 10 + lo)
}

fn u8_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        DbError::InvalidArgument(format!("invalid date {:04}-{:02}-{:02}", year, month, day))
    })
}

fn hms_nano(hour: u32, minute: u32, second: u32, nano: u32) -> Result<NaiveTime> {
    if nano >= 1_000_000_000 {
        return Err(DbError::InvalidArgument(format!("nanoseconds {} out of range", nano)));
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nano).ok_or_else(|| {
        DbError::InvalidArgument(format!("invalid time {:02}:{:02}:{:02}", hour, minute, second))
    })
}

fn whole_millis(d: Duration) -> Option<i64> {
    let ms = d.num_milliseconds();
    (d == Duration::milliseconds(ms)).then_some(ms)
}

fn millis_of_second(t: &impl Timelike) -> Option<u32> {
    let nano = t.nanosecond();
    (nano < 1_000_000_000 && nano % 1_000_000 == 0).then_some(nano / 1_000_000)
}

fn date_epoch() -> Result<NaiveDate> {
    ymd(1990, 1, 1)
}

// ==================== S5TIME ====================

pub fn get_s5time(buf: &[u8], offset: usize) -> Result<Duration> {
    let w = window(buf, offset, 2)?;
    let base = S5TIME_BASES[((w[0] >> 4) & 0x03) as usize];
    let hundreds = w[0] & 0x0f;
    if hundreds > 9 {
        return Err(DbError::MalformedBcd { offset, byte: w[0] });
    }
    let rest = bcd_to_u8(w[1], offset + 1)?;
    let count = hundreds as i64 * 100 + rest as i64;
    Ok(Duration::milliseconds(count * base))
}

/// Encode with the finest time base that represents `value` exactly.
pub fn set_s5time(buf: &mut [u8], offset: usize, value: Duration) -> Result<()> {
    let out_of_range =
        || DbError::OutOfRange(format!("{}ms is not representable as S5TIME", value.num_milliseconds()));
    let ms = whole_millis(value).filter(|ms| *ms >= 0).ok_or_else(out_of_range)?;
    let (code, count) = S5TIME_BASES
        .iter()
        .enumerate()
        .find(|(_, base)| ms % **base == 0 && ms / **base <= 999)
        .map(|(code, base)| (code as u8, (ms / base) as u16))
        .ok_or_else(out_of_range)?;
    let w = window_mut(buf, offset, 2)?;
    w[0] = (code << 4) | (count / 100) as u8;
    w[1] = u8_to_bcd((count % 100) as u8);
    Ok(())
}

// ==================== TIME ====================

pub fn get_time(buf: &[u8], offset: usize) -> Result<Duration> {
    let ms = BigEndian::read_i32(window(buf, offset, 4)?);
    Ok(Duration::milliseconds(ms as i64))
}

pub fn set_time(buf: &mut [u8], offset: usize, value: Duration) -> Result<()> {
    let ms = whole_millis(value)
        .and_then(|ms| i32::try_from(ms).ok())
        .ok_or_else(|| {
            DbError::OutOfRange(format!(
                "{}ms is not representable as TIME",
                value.num_milliseconds()
            ))
        })?;
    BigEndian::write_i32(window_mut(buf, offset, 4)?, ms);
    Ok(())
}

// ==================== DATE ====================

pub fn get_date(buf: &[u8], offset: usize) -> Result<NaiveDate> {
    let days = BigEndian::read_u16(window(buf, offset, 2)?) as i64;
    if days > MAX_DATE_DAYS {
        return Err(DbError::InvalidArgument(format!(
            "DATE value {} is past 2168-12-31",
            days
        )));
    }
    Ok(date_epoch()? + Duration::days(days))
}

pub fn set_date(buf: &mut [u8], offset: usize, value: NaiveDate) -> Result<()> {
    let days = (value - date_epoch()?).num_days();
    if !(0..=MAX_DATE_DAYS).contains(&days) {
        return Err(DbError::OutOfRange(format!(
            "{} outside 1990-01-01..=2168-12-31",
            value
        )));
    }
    BigEndian::write_u16(window_mut(buf, offset, 2)?, days as u16);
    Ok(())
}

// ==================== TIME_OF_DAY ====================

pub fn get_tod(buf: &[u8], offset: usize) -> Result<NaiveTime> {
    let ms = BigEndian::read_u32(window(buf, offset, 4)?);
    if ms >= MS_PER_DAY {
        return Err(DbError::InvalidArgument(format!(
            "TIME_OF_DAY value {}ms is not within one day",
            ms
        )));
    }
    NaiveTime::from_num_seconds_from_midnight_opt(ms / 1000, (ms % 1000) * 1_000_000)
        .ok_or_else(|| DbError::InvalidArgument(format!("invalid TIME_OF_DAY {}ms", ms)))
}

pub fn set_tod(buf: &mut [u8], offset: usize, value: NaiveTime) -> Result<()> {
    let millis = millis_of_second(&value).ok_or_else(|| {
        DbError::OutOfRange(format!("{} has sub-millisecond precision", value))
    })?;
    let ms = value.num_seconds_from_midnight() * 1000 + millis;
    BigEndian::write_u32(window_mut(buf, offset, 4)?, ms);
    Ok(())
}

// ==================== DATE_AND_TIME ====================

pub fn get_dt(buf: &[u8], offset: usize) -> Result<NaiveDateTime> {
    let w = window(buf, offset, 8)?;
    let mut d = [0u8; 7];
    for (i, slot) in d.iter_mut().enumerate() {
        *slot = bcd_to_u8(w[i], offset + i)?;
    }
    // Last byte: ms units in the high nibble, weekday in the low nibble.
    bcd_to_u8(w[7], offset + 7)?;
    let year = if d[0] >= 90 { 1900 + d[0] as i32 } else { 2000 + d[0] as i32 };
    let millis = d[6] as u32 * 10 + (w[7] >> 4) as u32;
    let date = ymd(year, d[1] as u32, d[2] as u32)?;
    let time = hms_nano(d[3] as u32, d[4] as u32, d[5] as u32, millis * 1_000_000)?;
    Ok(date.and_time(time))
}

pub fn set_dt(buf: &mut [u8], offset: usize, value: NaiveDateTime) -> Result<()> {
    if !(1990..=2089).contains(&value.year()) {
        return Err(DbError::OutOfRange(format!(
            "{} outside the DATE_AND_TIME years 1990..=2089",
            value
        )));
    }
    let millis = millis_of_second(&value).ok_or_else(|| {
        DbError::OutOfRange(format!("{} has sub-millisecond precision", value))
    })?;
    let weekday = value.weekday().number_from_sunday() as u8;
    let w = window_mut(buf, offset, 8)?;
    w[0] = u8_to_bcd((value.year() % 100) as u8);
    w[1] = u8_to_bcd(value.month() as u8);
    w[2] = u8_to_bcd(value.day() as u8);
    w[3] = u8_to_bcd(value.hour() as u8);
    w[4] = u8_to_bcd(value.minute() as u8);
    w[5] = u8_to_bcd(value.second() as u8);
    w[6] = u8_to_bcd((millis / 10) as u8);
    w[7] = (((millis % 10) as u8) << 4) | weekday;
    Ok(())
}

// ==================== DTL ====================

pub fn get_dtl(buf: &[u8], offset: usize) -> Result<NaiveDateTime> {
    let w = window(buf, offset, 12)?;
    let year = BigEndian::read_u16(&w[0..2]) as i32;
    if !(1970..=2262).contains(&year) {
        return Err(DbError::InvalidArgument(format!("DTL year {} outside 1970..=2262", year)));
    }
    let date = ymd(year, w[2] as u32, w[3] as u32)?;
    let nano = BigEndian::read_u32(&w[8..12]);
    let time = hms_nano(w[5] as u32, w[6] as u32, w[7] as u32, nano)?;
    Ok(date.and_time(time))
}

pub fn set_dtl(buf: &mut [u8], offset: usize, value: NaiveDateTime) -> Result<()> {
    if !(1970..=2262).contains(&value.year()) {
        return Err(DbError::OutOfRange(format!("{} outside the DTL years 1970..=2262", value)));
    }
    let nano = value.nanosecond();
    if nano >= 1_000_000_000 {
        return Err(DbError::OutOfRange(format!("{} is a leap second", value)));
    }
    let w = window_mut(buf, offset, 12)?;
    BigEndian::write_u16(&mut w[0..2], value.year() as u16);
    w[2] = value.month() as u8;
    w[3] = value.day() as u8;
    w[4] = value.weekday().number_from_sunday() as u8;
    w[5] = value.hour() as u8;
    w[6] = value.minute() as u8;
    w[7] = value.second() as u8;
    BigEndian::write_u32(&mut w[8..12], nano);
    Ok(())
}
