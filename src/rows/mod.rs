//! Tabular bridges: row-of-map encodings for generic table sources.

mod stream;
mod table;

pub use stream::{RowStreamReader, RowStreamWriter};
pub use table::{Table, TableSet};

use std::io::{Read, Write};

use crate::bind::{read_value, write_value};
use crate::error::Result;
use crate::types::Value;
use crate::wire::{Reader, WireType, Writer};

/// One row: column name → cell value, in wire order.
pub type Row = Vec<(String, Value)>;

pub(crate) fn write_row<W: Write>(w: &mut Writer<W>, row: &[(String, Value)]) -> Result<()> {
    let intern = w.options().use_key_interning;
    w.write_map_header(row.len())?;
    for (column, cell) in row {
        if intern {
            w.write_key(column)?;
        } else {
            w.write_str(column)?;
        }
        write_value(w, cell)?;
    }
    Ok(())
}

/// Reads one row map, counted or unbounded. Table-clearing commands in
/// front of the row are applied, so long-lived producers can bound their
/// tables between rows.
pub(crate) fn read_row<R: Read>(r: &mut Reader<R>) -> Result<Row> {
    while r.peek_type()? == WireType::Command {
        r.apply_command()?;
    }
    let mut row = Vec::new();
    match r.read_map_header()? {
        Some(count) => {
            for _ in 0..count {
                let column = r.read_key()?;
                row.push((column, read_value(r)?));
            }
        }
        None => {
            while !r.is_end()? {
                let column = r.read_key()?;
                row.push((column, read_value(r)?));
            }
            r.read_end()?;
        }
    }
    Ok(row)
}
