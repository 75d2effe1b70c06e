//! Text dumps of raw row bytes, layouts and decoded rows.

use crate::layout::{Field, Layout};
use crate::row::Row;

/// Three aligned lines: byte indices every five bytes, decimal byte values, and the
/// printable characters (letters, digits, space) under their bytes.
///
/// ```text
/// 0            5
/// 0,42,4,4,112,117,109,112,
///  ,  , , ,p  ,u  ,m  ,p  ,
/// ```
pub fn format_bytes(data: &[u8]) -> String {
    let mut index_line = String::new();
    let mut value_line = String::new();
    let mut char_line = String::new();

    for (i, &b) in data.iter().enumerate() {
        if i % 5 == 0 {
            let pad = value_line.len().saturating_sub(index_line.len());
            index_line.extend(std::iter::repeat(' ').take(pad));
            index_line.push_str(&i.to_string());
        }
        let text = b.to_string();
        value_line.push_str(&text);
        value_line.push(',');

        let c = b as char;
        char_line.push(if c.is_ascii_alphanumeric() || c == ' ' { c } else { ' ' });
        char_line.extend(std::iter::repeat(' ').take(text.len() - 1));
        char_line.push(',');
    }
    format!("{}\n{}\n{}", index_line, value_line, char_line)
}

pub fn hex_string(b: &[u8]) -> String {
    b.iter()
        .map(|x| format!("{:02x}", x))
        .collect::<Vec<_>>()
        .join(" ")
}

fn address(field: &Field) -> String {
    match field.bit {
        Some(bit) => format!("{}.{}", field.offset, bit),
        None => field.offset.to_string(),
    }
}

/// One line per field, in the layout text format.
pub fn format_layout(layout: &Layout) -> String {
    let name_width = layout.iter().map(|f| f.name.len()).max().unwrap_or(0);
    layout
        .iter()
        .map(|f| {
            format!(
                "{:<8}{:<width$}  {}",
                address(f),
                f.name,
                f.data_type,
                width = name_width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Each field with its decoded value; fields that fail to decode show the error instead.
pub fn format_row<B: AsRef<[u8]>>(row: &Row<'_, B>, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let layout = row.layout();
    let name_width = layout.iter().map(|f| f.name.len()).max().unwrap_or(0);
    layout
        .iter()
        .map(|f| {
            let value = match row.get(&f.name) {
                Ok(v) => v.to_string(),
                Err(e) => format!("<{}>", e),
            };
            format!(
                "{}{:<8}{:<width$}  {} = {}",
                pad,
                address(f),
                f.name,
                f.data_type,
                value,
                width = name_width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
