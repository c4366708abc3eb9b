//! Unbounded row streams for producers that do not know the row count.

use std::io::{Read, Write};

use crate::error::Result;
use crate::types::Value;
use crate::wire::{Reader, Writer};

use super::{read_row, write_row, Row};

/// Emits `BEGIN_ARRAY … row maps … END` one row at a time.
///
/// A producer that feeds a long-lived stream can call
/// [`Writer::clear_all`] between rows to bound table growth; the row
/// reader applies the clears transparently.
pub struct RowStreamWriter<'a, W: Write> {
    writer: &'a mut Writer<W>,
}

impl<'a, W: Write> RowStreamWriter<'a, W> {
    /// Opens the stream (emits `BEGIN_ARRAY`).
    pub fn begin(writer: &'a mut Writer<W>) -> Result<Self> {
        writer.begin_array()?;
        Ok(Self { writer })
    }

    /// Writes one row map. Column names intern per the writer's options.
    pub fn write_row(&mut self, row: &[(String, Value)]) -> Result<()> {
        write_row(self.writer, row)
    }

    /// Closes the stream (emits `END`).
    pub fn finish(self) -> Result<()> {
        self.writer.write_end()
    }
}

/// Pulls row maps from a counted or unbounded row array.
pub struct RowStreamReader<'a, R: Read> {
    reader: &'a mut Reader<R>,
    /// Rows left in a counted stream; `None` until the unbounded END.
    remaining: Option<usize>,
    done: bool,
}

impl<'a, R: Read> RowStreamReader<'a, R> {
    /// Reads the array header; both counted and unbounded forms work.
    pub fn begin(reader: &'a mut Reader<R>) -> Result<Self> {
        let remaining = reader.read_array_header()?;
        Ok(Self {
            reader,
            remaining,
            done: false,
        })
    }

    /// The next row, or `None` once the stream is exhausted.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        match self.remaining {
            Some(0) => {
                self.done = true;
                Ok(None)
            }
            Some(ref mut n) => {
                *n -= 1;
                Ok(Some(read_row(self.reader)?))
            }
            None => {
                if self.reader.is_end()? {
                    self.reader.read_end()?;
                    self.done = true;
                    Ok(None)
                } else {
                    Ok(Some(read_row(self.reader)?))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(i: i64) -> Row {
        vec![("event_id".to_string(), Value::Int(i))]
    }

    #[test]
    fn unbounded_stream_round_trips() {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        let mut rows = RowStreamWriter::begin(&mut w).unwrap();
        for i in 1..=5 {
            rows.write_row(&event(i)).unwrap();
        }
        rows.finish().unwrap();
        drop(w);

        let mut r = Reader::new(&bytes[..]);
        let mut stream = RowStreamReader::begin(&mut r).unwrap();
        let mut seen = Vec::new();
        while let Some(row) = stream.next_row().unwrap() {
            seen.push(row);
        }
        assert_eq!(seen, (1..=5).map(event).collect::<Vec<_>>());
        assert!(stream.next_row().unwrap().is_none());
    }

    #[test]
    fn unbounded_rows_inside_an_unbounded_stream() {
        // Rows written by hand as BEGIN_MAP … END.
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        w.begin_array().unwrap();
        for i in 1..=5 {
            w.begin_map().unwrap();
            w.write_key("event_id").unwrap();
            w.write_i64(i).unwrap();
            w.write_end().unwrap();
        }
        w.write_end().unwrap();
        drop(w);

        let mut r = Reader::new(&bytes[..]);
        assert_eq!(r.read_array_header().unwrap(), None);
        let mut count = 0i64;
        while !r.is_end().unwrap() {
            count += 1;
            let row = read_row(&mut r).unwrap();
            assert_eq!(row, event(count));
        }
        r.read_end().unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn counted_streams_work_too() {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        w.write_array_header(2).unwrap();
        write_row(&mut w, &event(1)).unwrap();
        write_row(&mut w, &event(2)).unwrap();
        drop(w);

        let mut r = Reader::new(&bytes[..]);
        let mut stream = RowStreamReader::begin(&mut r).unwrap();
        assert_eq!(stream.next_row().unwrap(), Some(event(1)));
        assert_eq!(stream.next_row().unwrap(), Some(event(2)));
        assert_eq!(stream.next_row().unwrap(), None);
    }

    #[test]
    fn clears_between_rows_are_transparent() {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        w.begin_array().unwrap();
        write_row(&mut w, &event(1)).unwrap();
        w.clear_all().unwrap();
        write_row(&mut w, &event(2)).unwrap();
        w.write_end().unwrap();
        drop(w);

        let mut r = Reader::new(&bytes[..]);
        let mut stream = RowStreamReader::begin(&mut r).unwrap();
        assert_eq!(stream.next_row().unwrap(), Some(event(1)));
        assert_eq!(stream.next_row().unwrap(), Some(event(2)));
        assert_eq!(stream.next_row().unwrap(), None);
    }
}
