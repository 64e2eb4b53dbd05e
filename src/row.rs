//! Row values and the comma-separated row format used by print and export.

use std::fmt;
use std::io::{self, Write};

/// One printable field: a stored integer or a column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowValue {
    Int(i32),
    Text(String),
}

impl fmt::Display for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValue::Int(v) => write!(f, "{}", v),
            RowValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for RowValue {
    fn from(v: i32) -> Self {
        RowValue::Int(v)
    }
}

impl From<&str> for RowValue {
    fn from(s: &str) -> Self {
        RowValue::Text(s.to_string())
    }
}

impl From<String> for RowValue {
    fn from(s: String) -> Self {
        RowValue::Text(s)
    }
}

/// Write one row as `v1, v2, ...` followed by a newline.
pub fn write_row<W: Write>(out: &mut W, values: &[RowValue]) -> io::Result<()> {
    for (i, value) in values.iter().enumerate() {
        if i != 0 {
            out.write_all(b", ")?;
        }
        write!(out, "{}", value)?;
    }
    out.write_all(b"\n")
}

/// [`write_row`] for a row of stored integers.
pub fn write_int_row<W: Write>(out: &mut W, values: &[i32]) -> io::Result<()> {
    let values: Vec<RowValue> = values.iter().copied().map(RowValue::Int).collect();
    write_row(out, &values)
}

/// [`write_row`] for a header of column names.
pub fn write_header_row<W: Write>(out: &mut W, columns: &[String]) -> io::Result<()> {
    let values: Vec<RowValue> = columns.iter().cloned().map(RowValue::Text).collect();
    write_row(out, &values)
}
