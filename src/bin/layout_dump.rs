//! Print a layout and, optionally, every row of a raw data block image decoded with it.
//!
//! Usage:
//!   layout_dump [OPTIONS] <LAYOUT> [<DATA> [ROW_SIZE]]
//!
//! Options:
//!   --layout-offset N   Layout address of each row's first byte (default: 0)
//!   --db-offset N       Byte in DATA where the first row starts (default: 0)
//!   --raw               Also print each row's bytes
//!
//! ROW_SIZE defaults to the bytes the layout spans. As many whole rows as DATA holds are shown.

use anyhow::{bail, Context};
use s7layout::dump::{format_bytes, format_layout, format_row};
use s7layout::{parse_layout_file, Table, TableOptions};

fn take_number(args: &mut Vec<String>, flag: &str) -> anyhow::Result<Option<usize>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    args.remove(pos);
    if pos >= args.len() {
        bail!("{} needs a value", flag);
    }
    let raw = args.remove(pos);
    let n = raw
        .parse()
        .with_context(|| format!("{}: '{}' is not a number", flag, raw))?;
    Ok(Some(n))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let layout_offset = take_number(&mut args, "--layout-offset")?.unwrap_or(0);
    let db_offset = take_number(&mut args, "--db-offset")?.unwrap_or(0);
    let raw = if let Some(pos) = args.iter().position(|a| a == "--raw") {
        args.remove(pos);
        true
    } else {
        false
    };

    let (layout_path, data_path, row_size) = match args.as_slice() {
        [l] => (l.clone(), None, None),
        [l, d] => (l.clone(), Some(d.clone()), None),
        [l, d, n] => {
            let n: usize = n
                .parse()
                .with_context(|| format!("ROW_SIZE: '{}' is not a number", n))?;
            (l.clone(), Some(d.clone()), Some(n))
        }
        _ => {
            eprintln!("Usage: layout_dump [--layout-offset N] [--db-offset N] [--raw] <LAYOUT> [<DATA> [ROW_SIZE]]");
            std::process::exit(2);
        }
    };

    let layout = parse_layout_file(&layout_path)
        .with_context(|| format!("parsing {}", layout_path))?;
    println!("{}", format_layout(&layout));

    let Some(data_path) = data_path else {
        return Ok(());
    };
    let data = std::fs::read(&data_path).with_context(|| format!("reading {}", data_path))?;

    let row_size = row_size.unwrap_or_else(|| layout.span(layout_offset));
    if row_size == 0 {
        bail!("row size is zero; pass ROW_SIZE explicitly");
    }
    let row_count = data.len().saturating_sub(db_offset) / row_size;
    let options = TableOptions::new()
        .with_row_size(row_size)
        .with_row_count(row_count)
        .with_layout_offset(layout_offset)
        .with_db_offset(db_offset);
    let table = Table::new(layout, data, options)?;

    for (i, row) in table.rows().enumerate() {
        println!();
        println!("row {} @ {}", i, row.address().start);
        if raw {
            for line in format_bytes(row.as_bytes()).lines() {
                println!("  {}", line);
            }
        }
        println!("{}", format_row(&row, 1));
    }
    Ok(())
}
