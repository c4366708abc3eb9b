//! Low-level streaming token reader.

use std::collections::HashMap;
use std::io::{self, Read};

use super::{marker, varint, WireType};
use crate::error::{Error, Result};
use crate::limits::ReaderLimits;

/// Result of [`Reader::read_struct_header`].
///
/// A `Definition` registers the template and is *not* followed by values;
/// an `Instance` is followed by exactly one value per listed name, in
/// order. Consumers must treat the two cases differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructToken {
    Definition(Vec<String>),
    Instance(Vec<String>),
}

impl StructToken {
    /// The template's field names, whichever case this is.
    pub fn names(&self) -> &[String] {
        match self {
            Self::Definition(names) | Self::Instance(names) => names,
        }
    }
}

/// Reads packtern tokens from a byte source and owns the decoder-side
/// symbol tables and limits.
///
/// The source only needs to support one byte of lookahead, which the
/// reader provides itself with a single-byte pushback slot. End-of-stream
/// in the middle of a token is [`Error::Truncated`]; between top-level
/// tokens it surfaces as [`WireType::EndOfStream`] from
/// [`Reader::peek_type`].
pub struct Reader<R: Read> {
    source: R,
    peeked: Option<u8>,
    limits: ReaderLimits,
    keys: HashMap<u32, String>,
    structs: HashMap<u32, Vec<String>>,
    open_frames: usize,
}

impl<R: Read> Reader<R> {
    pub fn new(source: R) -> Self {
        Self::with_limits(source, ReaderLimits::default())
    }

    pub fn with_limits(source: R, limits: ReaderLimits) -> Self {
        Self {
            source,
            peeked: None,
            limits,
            keys: HashMap::new(),
            structs: HashMap::new(),
            open_frames: 0,
        }
    }

    /// The limits this reader decodes under.
    pub fn limits(&self) -> &ReaderLimits {
        &self.limits
    }

    /// Consumes the reader and returns the source. Any unread pushback
    /// byte is discarded.
    pub fn into_inner(self) -> R {
        self.source
    }

    // -- Byte-level plumbing --

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.peeked {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        loop {
            match self.source.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.peeked = Some(buf[0]);
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn next_byte(&mut self) -> Result<u8> {
        if let Some(b) = self.peeked.take() {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        self.source.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        if let Some(b) = self.peeked.take() {
            buf[0] = b;
            start = 1;
        }
        self.source.read_exact(&mut buf[start..])?;
        Ok(())
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.fill(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn read_varint(&mut self) -> Result<u32> {
        let first = self.next_byte()?;
        let (extra, mut acc) = varint::decode_first(first)?;
        for _ in 0..extra {
            acc = (acc << 8) | u32::from(self.next_byte()?);
        }
        Ok(acc)
    }

    /// Maps an unexpected marker at a typed read to the right failure:
    /// unassigned/reserved bytes are malformed, anything else is a
    /// mismatch against `expected`.
    fn unexpected(expected: &'static str, m: u8) -> Error {
        match marker::classify(m) {
            WireType::Unknown => Error::MalformedToken(m),
            found => Error::mismatch(expected, found),
        }
    }

    // -- Type inspection --

    /// The raw marker byte the next token starts with, without consuming
    /// it. `None` at end of stream.
    pub(crate) fn peek_marker(&mut self) -> Result<Option<u8>> {
        self.peek_byte()
    }

    /// Classifies the next token without consuming anything.
    pub fn peek_type(&mut self) -> Result<WireType> {
        Ok(match self.peek_byte()? {
            Some(m) => marker::classify(m),
            None => WireType::EndOfStream,
        })
    }

    /// Consumes the next marker byte and returns its classification. The
    /// payload (if any) is left unread, so this is only useful to callers
    /// that go on to parse the token themselves.
    pub fn read_type(&mut self) -> Result<WireType> {
        Ok(marker::classify(self.next_byte()?))
    }

    /// True when the next token is the `END` of an unbounded collection.
    pub fn is_end(&mut self) -> Result<bool> {
        Ok(self.peek_byte()? == Some(marker::END))
    }

    // -- Typed reads --

    pub fn read_nil(&mut self) -> Result<()> {
        match self.next_byte()? {
            marker::NIL => Ok(()),
            m => Err(Self::unexpected("nil", m)),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.next_byte()? {
            marker::FALSE => Ok(false),
            marker::TRUE => Ok(true),
            m => Err(Self::unexpected("boolean", m)),
        }
    }

    /// Reads any integer-family token as i64. Unsigned 64-bit values
    /// above `i64::MAX` do not fit and fail as a mismatch.
    pub fn read_i64(&mut self) -> Result<i64> {
        match self.next_byte()? {
            m @ 0x00..=0x7F => Ok(i64::from(m)),
            m @ 0xE0..=0xEF => Ok(i64::from(m & 0x0F) - 16),
            marker::INT_8 => Ok(i64::from(self.next_byte()? as i8)),
            marker::INT_16 => {
                let mut b = [0u8; 2];
                self.fill(&mut b)?;
                Ok(i64::from(i16::from_be_bytes(b)))
            }
            marker::INT_32 => {
                let mut b = [0u8; 4];
                self.fill(&mut b)?;
                Ok(i64::from(i32::from_be_bytes(b)))
            }
            marker::INT_64 => {
                let mut b = [0u8; 8];
                self.fill(&mut b)?;
                Ok(i64::from_be_bytes(b))
            }
            marker::UINT_8 => Ok(i64::from(self.next_byte()?)),
            marker::UINT_16 => Ok(i64::from(self.read_u16_be()?)),
            marker::UINT_32 => Ok(i64::from(self.read_u32_be()?)),
            marker::UINT_64 => {
                let mut b = [0u8; 8];
                self.fill(&mut b)?;
                i64::try_from(u64::from_be_bytes(b))
                    .map_err(|_| Error::mismatch("i64", WireType::Integer))
            }
            m => Err(Self::unexpected("integer", m)),
        }
    }

    /// Reads any integer-family token as u64; negative values fail as a
    /// mismatch.
    pub fn read_u64(&mut self) -> Result<u64> {
        match self.peek_byte()? {
            Some(marker::UINT_64) => {
                self.next_byte()?;
                let mut b = [0u8; 8];
                self.fill(&mut b)?;
                Ok(u64::from_be_bytes(b))
            }
            _ => {
                let v = self.read_i64()?;
                u64::try_from(v).map_err(|_| Error::mismatch("u64", WireType::Integer))
            }
        }
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        let v = self.read_i64()?;
        i8::try_from(v).map_err(|_| Error::mismatch("i8", WireType::Integer))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let v = self.read_i64()?;
        i16::try_from(v).map_err(|_| Error::mismatch("i16", WireType::Integer))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let v = self.read_i64()?;
        i32::try_from(v).map_err(|_| Error::mismatch("i32", WireType::Integer))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.read_u64()?;
        u8::try_from(v).map_err(|_| Error::mismatch("u8", WireType::Integer))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let v = self.read_u64()?;
        u16::try_from(v).map_err(|_| Error::mismatch("u16", WireType::Integer))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self.read_u64()?;
        u32::try_from(v).map_err(|_| Error::mismatch("u32", WireType::Integer))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        match self.next_byte()? {
            marker::FLOAT_32 => {
                let mut b = [0u8; 4];
                self.fill(&mut b)?;
                Ok(f32::from_be_bytes(b))
            }
            m => Err(Self::unexpected("f32", m)),
        }
    }

    /// Reads a float token; float32 widens losslessly.
    pub fn read_f64(&mut self) -> Result<f64> {
        match self.next_byte()? {
            marker::FLOAT_32 => {
                let mut b = [0u8; 4];
                self.fill(&mut b)?;
                Ok(f64::from(f32::from_be_bytes(b)))
            }
            marker::FLOAT_64 => {
                let mut b = [0u8; 8];
                self.fill(&mut b)?;
                Ok(f64::from_be_bytes(b))
            }
            m => Err(Self::unexpected("float", m)),
        }
    }

    fn read_str_len(&mut self, m: u8) -> Result<usize> {
        let len = match m {
            0xA0..=0xBF => usize::from(m & marker::FIXSTR_LEN_MASK),
            marker::STR_8 => usize::from(self.next_byte()?),
            marker::STR_16 => usize::from(self.read_u16_be()?),
            marker::STR_32 => self.read_u32_be()? as usize,
            _ => return Err(Self::unexpected("string", m)),
        };
        self.limits.check_string(len)?;
        Ok(len)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let m = self.next_byte()?;
        let len = self.read_str_len(m)?;
        let mut data = vec![0u8; len];
        self.fill(&mut data)?;
        Ok(String::from_utf8(data)?)
    }

    pub fn read_bin(&mut self) -> Result<Vec<u8>> {
        let len = match self.next_byte()? {
            marker::BIN_8 => usize::from(self.next_byte()?),
            marker::BIN_16 => usize::from(self.read_u16_be()?),
            marker::BIN_32 => self.read_u32_be()? as usize,
            m => return Err(Self::unexpected("binary", m)),
        };
        self.limits.check_binary(len)?;
        let mut data = vec![0u8; len];
        self.fill(&mut data)?;
        Ok(data)
    }

    // -- Collection headers and framing --

    /// Reads an array header. `Some(n)` is a counted array of `n`
    /// elements; `None` is an unbounded array terminated by `END`.
    pub fn read_array_header(&mut self) -> Result<Option<usize>> {
        match self.next_byte()? {
            m @ 0x90..=0x9F => Ok(Some(usize::from(m & 0x0F))),
            marker::ARRAY_16 => Ok(Some(usize::from(self.read_u16_be()?))),
            marker::ARRAY_32 => Ok(Some(self.read_u32_be()? as usize)),
            marker::BEGIN_ARRAY => {
                self.open_frames += 1;
                Ok(None)
            }
            m => Err(Self::unexpected("array", m)),
        }
    }

    /// Reads a map header. `Some(n)` is a counted map of `n` pairs;
    /// `None` is an unbounded map terminated by `END`.
    pub fn read_map_header(&mut self) -> Result<Option<usize>> {
        match self.next_byte()? {
            m @ 0x80..=0x8F => Ok(Some(usize::from(m & 0x0F))),
            marker::MAP_16 => Ok(Some(usize::from(self.read_u16_be()?))),
            marker::MAP_32 => Ok(Some(self.read_u32_be()? as usize)),
            marker::BEGIN_MAP => {
                self.open_frames += 1;
                Ok(None)
            }
            m => Err(Self::unexpected("map", m)),
        }
    }

    /// Consumes the `END` closing the innermost unbounded collection.
    pub fn read_end(&mut self) -> Result<()> {
        match self.next_byte()? {
            marker::END => {
                if self.open_frames == 0 {
                    return Err(Error::InvalidNesting("END with no open frame"));
                }
                self.open_frames -= 1;
                Ok(())
            }
            m => Err(Self::unexpected("end", m)),
        }
    }

    // -- Keys, structs, commands --

    /// Reads a map key: `USE_KEY` dereferences the table, `SET_KEY`
    /// records a new entry, and anything else is an inline string that
    /// bypasses the table.
    pub fn read_key(&mut self) -> Result<String> {
        match self.peek_byte()? {
            Some(marker::USE_KEY) => {
                self.next_byte()?;
                let id = self.read_varint()?;
                self.keys.get(&id).cloned().ok_or(Error::UnknownKeyId(id))
            }
            Some(marker::SET_KEY) => {
                self.next_byte()?;
                let id = self.read_varint()?;
                let key = self.read_str()?;
                if !self.keys.contains_key(&id) {
                    self.limits.check_key_table(self.keys.len() + 1)?;
                }
                tracing::trace!(id, key = %key, "recorded interned key");
                self.keys.insert(id, key.clone());
                Ok(key)
            }
            _ => self.read_str(),
        }
    }

    /// Reads a `DEFINE_STRUCT` (registering the template) or `USE_STRUCT`
    /// (table lookup) token. See [`StructToken`] for what follows each.
    pub fn read_struct_header(&mut self) -> Result<StructToken> {
        match self.next_byte()? {
            marker::DEFINE_STRUCT => {
                let id = self.read_varint()?;
                let count = usize::from(self.next_byte()?);
                let mut names = Vec::with_capacity(count);
                for _ in 0..count {
                    names.push(self.read_key()?);
                }
                if !self.structs.contains_key(&id) {
                    self.limits.check_struct_table(self.structs.len() + 1)?;
                }
                tracing::trace!(id, fields = names.len(), "recorded struct template");
                self.structs.insert(id, names.clone());
                Ok(StructToken::Definition(names))
            }
            marker::USE_STRUCT => {
                let id = self.read_varint()?;
                self.structs
                    .get(&id)
                    .cloned()
                    .map(StructToken::Instance)
                    .ok_or(Error::UnknownStructId(id))
            }
            m => Err(Self::unexpected("struct", m)),
        }
    }

    /// Consumes a table-clearing command and applies it.
    pub fn apply_command(&mut self) -> Result<()> {
        match self.next_byte()? {
            marker::CLEAR_KEYS => {
                self.keys.clear();
                tracing::trace!("cleared key table");
                Ok(())
            }
            marker::CLEAR_STRUCTS => {
                self.structs.clear();
                tracing::trace!("cleared struct table");
                Ok(())
            }
            marker::CLEAR_ALL => {
                self.keys.clear();
                self.structs.clear();
                tracing::trace!("cleared both tables");
                Ok(())
            }
            m => Err(Self::unexpected("command", m)),
        }
    }

    // -- Structural skip --

    /// Consumes exactly one logical value and its whole subtree,
    /// including unbounded collections through the matching `END`.
    ///
    /// Skipping never mutates the symbol tables and never allocates for
    /// payloads; callers that need commands applied must read them, not
    /// skip them.
    pub fn skip(&mut self) -> Result<()> {
        let m = self.next_byte()?;
        self.skip_token(m)
    }

    fn skip_token(&mut self, m: u8) -> Result<()> {
        match m {
            0x00..=0x7F | 0xE0..=0xEF => Ok(()),
            marker::NIL | marker::FALSE | marker::TRUE => Ok(()),
            marker::CLEAR_KEYS | marker::CLEAR_STRUCTS | marker::CLEAR_ALL => Ok(()),
            marker::INT_8 | marker::UINT_8 => self.discard(1),
            marker::INT_16 | marker::UINT_16 => self.discard(2),
            marker::INT_32 | marker::UINT_32 | marker::FLOAT_32 => self.discard(4),
            marker::INT_64 | marker::UINT_64 | marker::FLOAT_64 => self.discard(8),
            0xA0..=0xBF => self.discard(usize::from(m & marker::FIXSTR_LEN_MASK)),
            marker::STR_8 | marker::BIN_8 => {
                let n = usize::from(self.next_byte()?);
                self.discard(n)
            }
            marker::STR_16 | marker::BIN_16 => {
                let n = usize::from(self.read_u16_be()?);
                self.discard(n)
            }
            marker::STR_32 | marker::BIN_32 => {
                let n = self.read_u32_be()? as usize;
                self.discard(n)
            }
            0x90..=0x9F => self.skip_values(usize::from(m & 0x0F)),
            marker::ARRAY_16 => {
                let n = usize::from(self.read_u16_be()?);
                self.skip_values(n)
            }
            marker::ARRAY_32 => {
                let n = self.read_u32_be()? as usize;
                self.skip_values(n)
            }
            0x80..=0x8F => self.skip_pairs(usize::from(m & 0x0F)),
            marker::MAP_16 => {
                let n = usize::from(self.read_u16_be()?);
                self.skip_pairs(n)
            }
            marker::MAP_32 => {
                let n = self.read_u32_be()? as usize;
                self.skip_pairs(n)
            }
            marker::SET_KEY => {
                self.read_varint()?;
                // The string token that carries the key text.
                self.skip()
            }
            marker::USE_KEY | marker::USE_STRUCT => {
                self.read_varint()?;
                Ok(())
            }
            marker::DEFINE_STRUCT => {
                self.read_varint()?;
                let n = usize::from(self.next_byte()?);
                for _ in 0..n {
                    self.skip()?;
                }
                Ok(())
            }
            marker::BEGIN_ARRAY => {
                while !self.is_end()? {
                    self.skip()?;
                }
                self.next_byte()?;
                Ok(())
            }
            marker::BEGIN_MAP => {
                while !self.is_end()? {
                    self.skip()?;
                    self.skip()?;
                }
                self.next_byte()?;
                Ok(())
            }
            marker::END => Err(Error::InvalidNesting("END with no open frame")),
            _ => Err(Error::MalformedToken(m)),
        }
    }

    fn skip_values(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.skip()?;
        }
        Ok(())
    }

    fn skip_pairs(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.skip()?;
            self.skip()?;
        }
        Ok(())
    }

    fn discard(&mut self, mut n: usize) -> Result<()> {
        let mut chunk = [0u8; 512];
        while n > 0 {
            let take = n.min(chunk.len());
            self.fill(&mut chunk[..take])?;
            n -= take;
        }
        Ok(())
    }
}
