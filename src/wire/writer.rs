//! Low-level token writer: markers, payloads, and commands.

use std::collections::HashMap;
use std::io::Write;

use super::{marker, varint};
use crate::error::{Error, Result};
use crate::options::SerializeOptions;

/// Writes packtern tokens to a byte sink and owns the encoder-side symbol
/// tables.
///
/// Every call writes through to the sink; nothing is buffered across
/// calls. The writer does not validate structural nesting — matching
/// headers to element counts is the caller's (usually the binder's) job.
///
/// To keep the sink after encoding, pass `&mut sink` (every `io::Write`
/// implements the trait through a mutable reference); [`Writer::into_inner`]
/// returns whatever was moved in.
pub struct Writer<W: Write> {
    sink: W,
    options: SerializeOptions,
    /// Interned key → id. Ids are dense and monotonic from 0.
    keys: HashMap<String, u32>,
    next_key_id: u32,
    next_struct_id: u32,
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, SerializeOptions::default())
    }

    pub fn with_options(sink: W, options: SerializeOptions) -> Self {
        Self {
            sink,
            options,
            keys: HashMap::new(),
            next_key_id: 0,
            next_struct_id: 0,
        }
    }

    /// The options this writer encodes under.
    pub fn options(&self) -> &SerializeOptions {
        &self.options
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Consumes the writer and returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes)?;
        Ok(())
    }

    fn put_u8(&mut self, byte: u8) -> Result<()> {
        self.put(&[byte])
    }

    fn put_varint(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        let len = varint::encode(value, &mut buf);
        self.put(&buf[..len])
    }

    // -- Primitives --

    pub fn write_nil(&mut self) -> Result<()> {
        self.put_u8(marker::NIL)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.put_u8(if value { marker::TRUE } else { marker::FALSE })
    }

    /// Writes a signed integer using the smallest signed representation:
    /// positive fixint, negative fixint, then int8/16/32/64.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        if (0..=127).contains(&value) {
            self.put_u8(value as u8)
        } else if (-16..=-1).contains(&value) {
            self.put_u8(marker::NEGFIXINT_BITS | (value + 16) as u8)
        } else if i64::from(i8::MIN) <= value && value <= i64::from(i8::MAX) {
            self.put(&[marker::INT_8, value as i8 as u8])
        } else if i64::from(i16::MIN) <= value && value <= i64::from(i16::MAX) {
            let b = (value as i16).to_be_bytes();
            self.put(&[marker::INT_16, b[0], b[1]])
        } else if i64::from(i32::MIN) <= value && value <= i64::from(i32::MAX) {
            self.put_u8(marker::INT_32)?;
            self.put(&(value as i32).to_be_bytes())
        } else {
            self.put_u8(marker::INT_64)?;
            self.put(&value.to_be_bytes())
        }
    }

    /// Writes an unsigned integer using the smallest unsigned
    /// representation: positive fixint, then uint8/16/32/64.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        if value <= 127 {
            self.put_u8(value as u8)
        } else if value <= u64::from(u8::MAX) {
            self.put(&[marker::UINT_8, value as u8])
        } else if value <= u64::from(u16::MAX) {
            let b = (value as u16).to_be_bytes();
            self.put(&[marker::UINT_16, b[0], b[1]])
        } else if value <= u64::from(u32::MAX) {
            self.put_u8(marker::UINT_32)?;
            self.put(&(value as u32).to_be_bytes())
        } else {
            self.put_u8(marker::UINT_64)?;
            self.put(&value.to_be_bytes())
        }
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_u64(u64::from(value))
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_u64(u64::from(value))
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u64(u64::from(value))
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.put_u8(marker::FLOAT_32)?;
        self.put(&value.to_be_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.put_u8(marker::FLOAT_64)?;
        self.put(&value.to_be_bytes())
    }

    /// Writes a string with the smallest length class (size is the UTF-8
    /// byte length, not the char count).
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        let len = value.len();
        if len <= usize::from(marker::FIXSTR_LEN_MASK) {
            self.put_u8(marker::FIXSTR_BITS | len as u8)?;
        } else if len <= usize::from(u8::MAX) {
            self.put(&[marker::STR_8, len as u8])?;
        } else if len <= usize::from(u16::MAX) {
            let b = (len as u16).to_be_bytes();
            self.put(&[marker::STR_16, b[0], b[1]])?;
        } else {
            let len32 = length32("string longer than u32::MAX bytes", len)?;
            self.put_u8(marker::STR_32)?;
            self.put(&len32.to_be_bytes())?;
        }
        self.put(value.as_bytes())
    }

    pub fn write_bin(&mut self, value: &[u8]) -> Result<()> {
        let len = value.len();
        if len <= usize::from(u8::MAX) {
            self.put(&[marker::BIN_8, len as u8])?;
        } else if len <= usize::from(u16::MAX) {
            let b = (len as u16).to_be_bytes();
            self.put(&[marker::BIN_16, b[0], b[1]])?;
        } else {
            let len32 = length32("binary longer than u32::MAX bytes", len)?;
            self.put_u8(marker::BIN_32)?;
            self.put(&len32.to_be_bytes())?;
        }
        self.put(value)
    }

    // -- Collection headers and framing --

    pub fn write_array_header(&mut self, count: usize) -> Result<()> {
        if count <= 15 {
            self.put_u8(marker::FIXARRAY_NIBBLE | count as u8)
        } else if count <= usize::from(u16::MAX) {
            let b = (count as u16).to_be_bytes();
            self.put(&[marker::ARRAY_16, b[0], b[1]])
        } else {
            let count32 = length32("array larger than u32::MAX elements", count)?;
            self.put_u8(marker::ARRAY_32)?;
            self.put(&count32.to_be_bytes())
        }
    }

    pub fn write_map_header(&mut self, count: usize) -> Result<()> {
        if count <= 15 {
            self.put_u8(marker::FIXMAP_NIBBLE | count as u8)
        } else if count <= usize::from(u16::MAX) {
            let b = (count as u16).to_be_bytes();
            self.put(&[marker::MAP_16, b[0], b[1]])
        } else {
            let count32 = length32("map larger than u32::MAX pairs", count)?;
            self.put_u8(marker::MAP_32)?;
            self.put(&count32.to_be_bytes())
        }
    }

    /// Opens an unbounded array; close it with [`Writer::write_end`].
    pub fn begin_array(&mut self) -> Result<()> {
        self.put_u8(marker::BEGIN_ARRAY)
    }

    /// Opens an unbounded map; close it with [`Writer::write_end`].
    pub fn begin_map(&mut self) -> Result<()> {
        self.put_u8(marker::BEGIN_MAP)
    }

    /// Closes the innermost open `BEGIN_ARRAY`/`BEGIN_MAP` frame.
    pub fn write_end(&mut self) -> Result<()> {
        self.put_u8(marker::END)
    }

    // -- Key and struct commands --

    /// Writes a map key through the key table: first sight emits
    /// `SET_KEY(id, s)`, later sights emit `USE_KEY(id)`.
    pub fn write_key(&mut self, key: &str) -> Result<()> {
        if let Some(&id) = self.keys.get(key) {
            self.use_key(id)
        } else {
            self.set_key(key)?;
            Ok(())
        }
    }

    /// Interns `key` under a fresh id and emits `SET_KEY`, regardless of
    /// whether the string was already in the table. Returns the id.
    pub fn set_key(&mut self, key: &str) -> Result<u32> {
        let id = self.next_key_id;
        self.next_key_id += 1;
        self.keys.insert(key.to_owned(), id);
        tracing::trace!(id, key, "interned key");
        self.put_u8(marker::SET_KEY)?;
        self.put_varint(id)?;
        self.write_str(key)?;
        Ok(id)
    }

    /// Emits `USE_KEY(id)`. The id must have been defined earlier in the
    /// stream; the writer does not check.
    pub fn use_key(&mut self, id: u32) -> Result<()> {
        self.put_u8(marker::USE_KEY)?;
        self.put_varint(id)
    }

    /// Defines a struct template over `names` and returns its id. Each
    /// name goes through [`Writer::write_key`], so template names intern
    /// like ordinary map keys.
    pub fn define_struct(&mut self, names: &[&str]) -> Result<u32> {
        if names.len() > marker::MAX_STRUCT_FIELDS {
            return Err(Error::UnsupportedTarget(
                "struct template with more than 255 fields",
            ));
        }
        let id = self.next_struct_id;
        self.next_struct_id += 1;
        tracing::trace!(id, fields = names.len(), "defined struct template");
        self.put_u8(marker::DEFINE_STRUCT)?;
        self.put_varint(id)?;
        self.put_u8(names.len() as u8)?;
        for name in names {
            self.write_key(name)?;
        }
        Ok(id)
    }

    /// Emits `USE_STRUCT(id)`. The caller must follow with exactly one
    /// value per template field, in declared order.
    pub fn use_struct(&mut self, id: u32) -> Result<()> {
        self.put_u8(marker::USE_STRUCT)?;
        self.put_varint(id)
    }

    /// Empties the key table; the next interned key gets id 0.
    pub fn clear_keys(&mut self) -> Result<()> {
        self.keys.clear();
        self.next_key_id = 0;
        tracing::trace!("cleared key table");
        self.put_u8(marker::CLEAR_KEYS)
    }

    /// Resets struct ids; the next template gets id 0.
    pub fn clear_structs(&mut self) -> Result<()> {
        self.next_struct_id = 0;
        tracing::trace!("cleared struct table");
        self.put_u8(marker::CLEAR_STRUCTS)
    }

    /// Both clears in one command.
    pub fn clear_all(&mut self) -> Result<()> {
        self.keys.clear();
        self.next_key_id = 0;
        self.next_struct_id = 0;
        tracing::trace!("cleared both tables");
        self.put_u8(marker::CLEAR_ALL)
    }
}

/// Lengths and counts ride 32-bit prefixes; anything larger is not
/// expressible in the format.
fn length32(over: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::UnsupportedTarget(over))
}
