//! Parse layout text into a [`Layout`] using PEST.
//!
//! ```text
//! # Byte index    Variable name  Datatype
//! 4               ID             INT
//! 6               NAME           STRING[6]
//! 12.0            testbool1      BOOL
//! 13              testReal       REAL
//! ```
//!
//! Parsing is all-or-nothing: the first malformed line fails the whole parse with a
//! [`DbError::Parse`] naming the line. Overlapping or unordered offsets are accepted.

use crate::error::{DbError, Result};
use crate::layout::{DataType, Field, Layout};
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::collections::HashMap;
use std::path::Path;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct LayoutParser;

/// Parse layout source into an ordered field table.
pub fn parse_layout(source: &str) -> Result<Layout> {
    let mut pairs = LayoutParser::parse(Rule::layout, source).map_err(from_pest)?;
    let root = pairs.next().ok_or_else(|| DbError::parse(0, "Empty parse"))?;

    let mut fields = Vec::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    for entry in root.into_inner() {
        if entry.as_rule() != Rule::entry {
            continue;
        }
        let line = entry.as_span().start_pos().line_col().0;
        let field = build_field(entry)?;
        if let Some(prev) = first_seen.insert(field.name.clone(), line) {
            return Err(DbError::parse(
                line,
                format!("duplicate field name '{}' (first declared on line {})", field.name, prev),
            ));
        }
        tracing::trace!(
            line,
            name = %field.name,
            offset = field.offset,
            bit = ?field.bit,
            data_type = %field.data_type,
            "layout entry"
        );
        fields.push(field);
    }
    Layout::new(fields)
}

/// Read a layout file and parse it.
pub fn parse_layout_file(path: impl AsRef<Path>) -> Result<Layout> {
    let source = std::fs::read_to_string(path)?;
    parse_layout(&source)
}

fn build_field(pair: Pair<Rule>) -> Result<Field> {
    let (line, _) = pair.as_span().start_pos().line_col();
    let text = pair.as_span().start_pos().line_of().trim_end().to_string();
    let fail = |msg: String| DbError::parse(line, format!("{} in {:?}", msg, text));

    let mut offset = None;
    let mut bit = None;
    let mut name = None;
    let mut type_name = None;
    let mut length = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::offset => {
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::byte_index => {
                            offset = Some(parse_number(part.as_str()).map_err(&fail)?)
                        }
                        Rule::bit_index => {
                            let b = parse_number(part.as_str()).map_err(&fail)?;
                            if b > 7 {
                                return Err(fail(format!("bit index {} outside 0..=7", b)));
                            }
                            bit = Some(b as u8);
                        }
                        _ => {}
                    }
                }
            }
            Rule::name => name = Some(inner.as_str().to_string()),
            Rule::type_spec => {
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::type_name => type_name = Some(part.as_str().to_string()),
                        Rule::length => length = Some(parse_number(part.as_str()).map_err(&fail)?),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let offset = offset.ok_or_else(|| fail("missing offset".to_string()))?;
    let name = name.ok_or_else(|| fail("missing name".to_string()))?;
    let type_name = type_name.ok_or_else(|| fail("missing type".to_string()))?;
    let data_type = DataType::from_token(&type_name, length).map_err(&fail)?;

    match (data_type, bit) {
        (DataType::Bool, None) => {
            return Err(fail(format!("BOOL field '{}' needs a <byte>.<bit> offset", name)))
        }
        (DataType::Bool, Some(_)) => {}
        (other, Some(_)) => {
            return Err(fail(format!("bit offset is only allowed for BOOL, not {}", other)))
        }
        (_, None) => {}
    }

    Ok(Field {
        name,
        offset,
        bit,
        data_type,
    })
}

fn parse_number(s: &str) -> std::result::Result<usize, String> {
    s.parse()
        .map_err(|_| format!("number {} is too large", s))
}

fn from_pest(e: pest::error::Error<Rule>) -> DbError {
    let line = match e.line_col {
        LineColLocation::Pos((l, _)) => l,
        LineColLocation::Span((l, _), _) => l,
    };
    let text = e.line().trim_end().to_string();
    let e = e.renamed_rules(|rule| {
        match rule {
            Rule::byte_index | Rule::offset => "byte offset",
            Rule::bit_index => "bit index",
            Rule::name => "field name",
            Rule::type_name | Rule::type_spec => "type",
            Rule::length => "length",
            Rule::entry => "layout entry",
            _ => "end of line",
        }
        .to_string()
    });
    DbError::parse(line, format!("{} in {:?}", e.variant.message(), text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_comment_is_ignored() {
        let layout = parse_layout("13 testReal REAL # temperature\n").expect("parse");
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.fields()[0].data_type, DataType::Real32);
    }

    #[test]
    fn bit_above_seven_rejected() {
        let err = parse_layout("12.8 b BOOL").unwrap_err();
        assert!(matches!(err, DbError::Parse { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn error_names_offending_line() {
        let err = parse_layout("4 ID INT\n\n6 NAME STRANG[6]\n").unwrap_err();
        match err {
            DbError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("STRANG"), "{}", message);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
