//! Integration tests: tables sliced from one buffer, row access by name and id, and device
//! round trips through a channel.

use chrono::{Duration, NaiveDate};
use s7layout::{
    parse_layout, Area, Channel, DbError, MemoryChannel, Row, Table, TableOptions, Value,
};
use thiserror::Error;

const ROW_LAYOUT: &str = r#"
0       ID        INT
2       NAME      STRING[6]
10.0    active    BOOL
10.3    alarm     BOOL
11      value     REAL
"#;

const TIME_LAYOUT: &str = r#"
0   delay     S5TIME
2   runtime   TIME
6   day       DATE
8   shift     TOD
12  stamp     DT
20  precise   DTL
"#;

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

fn two_row_table(buffer: Vec<u8>) -> Table {
    let layout = parse_layout(ROW_LAYOUT).expect("parse");
    Table::new(
        layout,
        buffer,
        TableOptions::new()
            .with_row_size(15)
            .with_row_count(2)
            .with_id_field("ID"),
    )
    .expect("table")
}

#[test]
fn test_row_slices_do_not_overlap() {
    let original = patterned(30);
    let mut table = two_row_table(original.clone());
    assert_eq!(table.row_at(1).expect("row 1").as_bytes(), &original[15..30]);

    let mut row = table.row_at_mut(1).expect("row 1");
    row.set("ID", -1i16).expect("ID");
    row.set("NAME", "x").expect("NAME");
    row.set("active", true).expect("active");
    row.set("value", f32::MAX).expect("value");

    let bytes = table.as_bytes();
    assert_eq!(bytes[..15], original[..15]);
    assert_eq!(bytes[15..17], [0xff, 0xff]);
}

#[test]
fn test_row_by_id() {
    let mut table = two_row_table(vec![0; 30]);
    for (i, mut row) in table.rows_mut().enumerate() {
        row.set("ID", i as i16 + 1).expect("ID");
    }
    table
        .row_at_mut(1)
        .expect("row 1")
        .set("NAME", "second")
        .expect("NAME");

    let row = table.row_by_id(2).expect("id 2");
    assert_eq!(row.get("NAME").expect("NAME"), Value::String("second".into()));
    assert_eq!(row.address().start, 15);
    assert!(matches!(table.row_by_id(99), Err(DbError::NotFound(_))));
}

#[test]
fn test_row_by_id_reads_current_bytes() {
    let mut table = two_row_table(vec![0; 30]);
    table.row_at_mut(0).expect("row 0").set("ID", 7i16).expect("ID");
    assert_eq!(table.row_by_id(7).expect("id 7").address().start, 0);

    table.row_at_mut(0).expect("row 0").set("ID", 8i16).expect("ID");
    assert!(matches!(table.row_by_id(7), Err(DbError::NotFound(_))));
    assert!(table.row_by_id(8u32).is_ok());
}

#[test]
fn test_string_truncation_through_row() {
    let mut table = two_row_table(vec![0; 30]);
    let mut row = table.row_at_mut(0).expect("row 0");
    row.set("NAME", "abcdefghij").expect("NAME");
    assert_eq!(row.as_bytes()[2..10], [6, 6, b'a', b'b', b'c', b'd', b'e', b'f']);
    assert_eq!(row.get("NAME").expect("NAME"), Value::String("abcdef".into()));
}

#[test]
fn test_bools_share_a_byte() {
    let mut table = two_row_table(vec![0; 30]);
    let mut row = table.row_at_mut(0).expect("row 0");
    row.set("active", true).expect("active");
    row.set("alarm", true).expect("alarm");
    row.set("active", false).expect("active");
    assert_eq!(row.as_bytes()[10], 0b0000_1000);
    assert_eq!(row.get("alarm").expect("alarm"), Value::Bool(true));
}

#[test]
fn test_unknown_field_and_codec_errors() {
    let mut table = two_row_table(vec![0; 30]);
    let mut row = table.row_at_mut(0).expect("row 0");
    assert!(matches!(row.get("missing"), Err(DbError::UnknownField(_))));
    assert!(matches!(row.set("ID", 40_000i32), Err(DbError::OutOfRange(_))));
    assert!(matches!(row.set("NAME", "grüße"), Err(DbError::InvalidArgument(_))));
    assert!(matches!(row.set("value", true), Err(DbError::TypeMismatch { .. })));
}

#[test]
fn test_layout_too_large() {
    let layout = parse_layout(ROW_LAYOUT).expect("parse");
    let err = Table::new(
        layout.clone(),
        vec![0; 29],
        TableOptions::new().with_row_size(15).with_row_count(2),
    )
    .unwrap_err();
    assert!(matches!(err, DbError::LayoutTooLarge(_)), "{:?}", err);

    let err = Table::new(
        layout.clone(),
        vec![0; 30],
        TableOptions::new().with_row_size(15).with_row_count(2).with_db_offset(1),
    )
    .unwrap_err();
    assert!(matches!(err, DbError::LayoutTooLarge(_)), "{:?}", err);

    let err = Table::new(layout, vec![0; 30], TableOptions::new().with_row_size(14)).unwrap_err();
    assert!(matches!(err, DbError::LayoutTooLarge(_)), "{:?}", err);
}

#[test]
fn test_layout_offset_and_db_offset() {
    let layout = parse_layout("4 ID INT\n6 count DINT\n").expect("parse");
    let mut table = Table::new(
        layout,
        vec![0; 3 + 2 * 6],
        TableOptions::new()
            .with_layout_offset(4)
            .with_db_offset(3)
            .with_row_count(2),
    )
    .expect("table");
    table.row_at_mut(1).expect("row 1").set("count", 0x01020304).expect("count");
    assert_eq!(table.as_bytes()[11..15], [1, 2, 3, 4]);
}

#[test]
fn test_read_and_write_through_channel() {
    let mut device = MemoryChannel::new();
    device.insert(Area::Db, 5, patterned(30));

    let layout = parse_layout(ROW_LAYOUT).expect("parse");
    let mut table = Table::new(
        layout,
        vec![0; 30],
        TableOptions::new()
            .with_db_number(5)
            .with_row_size(15)
            .with_row_count(2),
    )
    .expect("table");

    let mut row = table.row_at_mut(1).expect("row 1");
    row.read(&mut device).expect("read");
    assert_eq!(row.get("ID").expect("ID"), Value::I16(0x0f10));
    row.set("ID", 3i16).expect("ID");
    assert_eq!(device.image(Area::Db, 5).expect("image")[15..17], [15, 16]);
    row.write(&mut device).expect("write");

    let image = device.image(Area::Db, 5).expect("image");
    assert_eq!(image[15..17], [0, 3]);
    assert_eq!(image[..15], patterned(15)[..]);
    assert_eq!(table.as_bytes()[..15], [0u8; 15]);
    assert_eq!((device.reads(), device.writes()), (1, 1));
}

#[derive(Debug, Error, PartialEq)]
#[error("link down after {0} ms")]
struct LinkDown(u32);

struct Offline;

impl Channel for Offline {
    type Error = LinkDown;

    fn read(&mut self, _: Area, _: u16, _: usize, _: usize) -> Result<Vec<u8>, LinkDown> {
        Err(LinkDown(1500))
    }

    fn write(&mut self, _: Area, _: u16, _: usize, _: &[u8]) -> Result<(), LinkDown> {
        Err(LinkDown(200))
    }
}

#[test]
fn test_transport_errors_surface_unchanged() {
    let layout = parse_layout(ROW_LAYOUT).expect("parse");
    let mut row = Row::new(&layout, vec![0u8; 15]);

    match row.read(&mut Offline) {
        Err(DbError::Channel(e)) => {
            assert_eq!(e.downcast_ref::<LinkDown>(), Some(&LinkDown(1500)));
            assert_eq!(e.to_string(), "link down after 1500 ms");
        }
        other => panic!("unexpected {:?}", other),
    }
    match row.write(&mut Offline) {
        Err(DbError::Channel(e)) => assert_eq!(e.downcast_ref::<LinkDown>(), Some(&LinkDown(200))),
        other => panic!("unexpected {:?}", other),
    }
}

struct Truncating;

impl Channel for Truncating {
    type Error = std::io::Error;

    fn read(&mut self, _: Area, _: u16, _: usize, size: usize) -> Result<Vec<u8>, Self::Error> {
        Ok(vec![0xaa; size / 2])
    }

    fn write(&mut self, _: Area, _: u16, _: usize, _: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[test]
fn test_short_read_leaves_row_untouched() {
    let layout = parse_layout(ROW_LAYOUT).expect("parse");
    let mut row = Row::new(&layout, vec![1u8; 15]);
    let err = row.read(&mut Truncating).unwrap_err();
    assert!(
        matches!(err, DbError::BufferTooSmall { needed: 15, available: 7, .. }),
        "{:?}",
        err
    );
    assert_eq!(row.as_bytes(), &[1u8; 15][..]);
}

#[test]
fn test_time_types_through_row() {
    let layout = parse_layout(TIME_LAYOUT).expect("parse");
    let mut row = Row::new(&layout, vec![0u8; 32]);

    let day = NaiveDate::from_ymd_opt(2024, 2, 29).expect("date");
    let shift = chrono::NaiveTime::from_hms_milli_opt(6, 30, 0, 250).expect("time");
    let stamp = day.and_hms_milli_opt(13, 5, 9, 123).expect("stamp");
    let precise = day.and_hms_nano_opt(13, 5, 9, 123_456_789).expect("precise");

    row.set("delay", Duration::milliseconds(2500)).expect("delay");
    row.set("runtime", Duration::milliseconds(-86_400_000)).expect("runtime");
    row.set("day", day).expect("day");
    row.set("shift", shift).expect("shift");
    row.set("stamp", stamp).expect("stamp");
    row.set("precise", precise).expect("precise");

    assert_eq!(row.get("delay").expect("delay"), Value::Duration(Duration::milliseconds(2500)));
    assert_eq!(
        row.get("runtime").expect("runtime"),
        Value::Duration(Duration::milliseconds(-86_400_000))
    );
    assert_eq!(row.get("day").expect("day"), Value::Date(day));
    assert_eq!(row.get("shift").expect("shift"), Value::TimeOfDay(shift));
    assert_eq!(row.get("stamp").expect("stamp"), Value::DateTime(stamp));
    assert_eq!(row.get("precise").expect("precise"), Value::DateTime(precise));

    assert!(matches!(
        row.set("delay", Duration::milliseconds(10_000_000)),
        Err(DbError::OutOfRange(_))
    ));
}

#[test]
fn test_malformed_bcd_surfaces_from_row() {
    let layout = parse_layout(TIME_LAYOUT).expect("parse");
    let mut bytes = vec![0u8; 32];
    bytes[0] = 0x0a;
    let row = Row::new(&layout, bytes);
    assert!(matches!(row.get("delay"), Err(DbError::MalformedBcd { offset: 0, .. })));
}

#[test]
fn test_export_and_display() {
    let mut table = two_row_table(vec![0; 30]);
    {
        let mut row = table.row_at_mut(0).expect("row 0");
        row.set("ID", 1i16).expect("ID");
        row.set("NAME", "pump").expect("NAME");
        row.set("value", 2.5f32).expect("value");
    }
    let rows = table.export().expect("export");
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0],
        vec![
            ("ID".to_string(), Value::I16(1)),
            ("NAME".to_string(), Value::String("pump".into())),
            ("active".to_string(), Value::Bool(false)),
            ("alarm".to_string(), Value::Bool(false)),
            ("value".to_string(), Value::Float(2.5)),
        ]
    );

    let text = table.row_at(0).expect("row 0").to_string();
    assert!(text.contains("ID = 1\n"), "{}", text);
    assert!(text.contains("NAME = \"pump\"\n"), "{}", text);
}
