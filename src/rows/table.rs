//! Counted table and table-set encodings.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::types::Value;
use crate::wire::{Reader, Writer};

use super::{read_row, write_row};

/// A rectangular table: named columns, rows of cells.
///
/// On the wire a table is an array of row maps. Absent cells are nil, so
/// a decoded table is always rectangular even when the rows disagreed on
/// their column sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Appends a row. Short rows pad with nil (an absent cell); rows
    /// wider than the column set are refused.
    pub fn push_row(&mut self, mut cells: Vec<Value>) -> Result<()> {
        if cells.len() > self.columns.len() {
            return Err(Error::UnsupportedTarget("row wider than the column set"));
        }
        cells.resize(self.columns.len(), Value::Nil);
        self.rows.push(cells);
        Ok(())
    }

    /// Encodes the table as `array[rows]` of `map[columns]`. Column names
    /// go through the key table, so they intern automatically.
    pub fn encode<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_array_header(self.rows.len())?;
        for cells in &self.rows {
            let row: Vec<(String, Value)> = self
                .columns
                .iter()
                .cloned()
                .zip(cells.iter().cloned())
                .collect();
            write_row(w, &row)?;
        }
        Ok(())
    }

    /// Decodes a table, accepting counted and unbounded forms. The schema
    /// is the union of keys across all rows, in first-seen order; cells a
    /// row does not carry come back nil.
    pub fn decode<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let mut table = Table::default();
        match r.read_array_header()? {
            Some(count) => {
                for _ in 0..count {
                    let row = read_row(r)?;
                    table.absorb_row(row);
                }
            }
            None => {
                while !r.is_end()? {
                    let row = read_row(r)?;
                    table.absorb_row(row);
                }
                r.read_end()?;
            }
        }
        table.pad();
        Ok(table)
    }

    fn absorb_row(&mut self, row: Vec<(String, Value)>) {
        let mut cells = vec![Value::Nil; self.columns.len()];
        for (column, cell) in row {
            match self.columns.iter().position(|c| *c == column) {
                Some(i) => cells[i] = cell,
                None => {
                    self.columns.push(column);
                    cells.push(cell);
                }
            }
        }
        self.rows.push(cells);
    }

    fn pad(&mut self) {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, Value::Nil);
        }
    }
}

/// A set of tables: `array[table_count]` of tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    pub tables: Vec<Table>,
}

impl TableSet {
    pub fn encode<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_array_header(self.tables.len())?;
        for table in &self.tables {
            table.encode(w)?;
        }
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let mut tables = Vec::new();
        match r.read_array_header()? {
            Some(count) => {
                for _ in 0..count {
                    tables.push(Table::decode(r)?);
                }
            }
            None => {
                while !r.is_end()? {
                    tables.push(Table::decode(r)?);
                }
                r.read_end()?;
            }
        }
        Ok(Self { tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SerializeOptions;

    fn round_trip(table: &Table) -> Table {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        table.encode(&mut w).unwrap();
        Table::decode(&mut Reader::new(&bytes[..])).unwrap()
    }

    fn sample() -> Table {
        let mut t = Table::new(vec!["id".to_string(), "name".to_string()]);
        t.push_row(vec![Value::Int(1), Value::Str("one".into())])
            .unwrap();
        t.push_row(vec![Value::Int(2), Value::Str("two".into())])
            .unwrap();
        t
    }

    #[test]
    fn table_round_trips() {
        let t = sample();
        assert_eq!(round_trip(&t), t);
    }

    #[test]
    fn absent_cells_come_back_nil() {
        let mut t = Table::new(vec!["id".to_string(), "note".to_string()]);
        t.push_row(vec![Value::Int(1)]).unwrap();
        t.push_row(vec![Value::Int(2), Value::Str("hi".into())])
            .unwrap();
        let back = round_trip(&t);
        assert_eq!(back.rows()[0], vec![Value::Int(1), Value::Nil]);
        assert_eq!(back.rows()[1], vec![Value::Int(2), Value::Str("hi".into())]);
    }

    #[test]
    fn too_wide_rows_are_refused() {
        let mut t = Table::new(vec!["only".to_string()]);
        assert!(t
            .push_row(vec![Value::Int(1), Value::Int(2)])
            .is_err());
    }

    #[test]
    fn schema_is_union_of_keys_in_first_seen_order() {
        // Hand-built rows that disagree on columns.
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        w.write_array_header(2).unwrap();
        w.write_map_header(1).unwrap();
        w.write_key("a").unwrap();
        w.write_i64(1).unwrap();
        w.write_map_header(2).unwrap();
        w.write_key("b").unwrap();
        w.write_i64(2).unwrap();
        w.write_key("a").unwrap();
        w.write_i64(3).unwrap();
        drop(w);

        let t = Table::decode(&mut Reader::new(&bytes[..])).unwrap();
        assert_eq!(t.columns(), ["a".to_string(), "b".to_string()]);
        assert_eq!(t.rows()[0], vec![Value::Int(1), Value::Nil]);
        assert_eq!(t.rows()[1], vec![Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn column_names_intern_across_rows() {
        let t = sample();
        let mut interned = Vec::new();
        let mut w = Writer::new(&mut interned);
        t.encode(&mut w).unwrap();

        let mut plain = Vec::new();
        let mut w = Writer::with_options(&mut plain, SerializeOptions::plain_keys());
        t.encode(&mut w).unwrap();

        assert!(interned.len() < plain.len());
    }

    #[test]
    fn table_set_round_trips() {
        let mut second = Table::new(vec!["flag".to_string()]);
        second.push_row(vec![Value::Bool(true)]).unwrap();
        let set = TableSet {
            tables: vec![sample(), second],
        };
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        set.encode(&mut w).unwrap();
        let back = TableSet::decode(&mut Reader::new(&bytes[..])).unwrap();
        assert_eq!(back, set);
    }
}
