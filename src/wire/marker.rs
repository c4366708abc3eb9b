//! Marker byte constants for the packtern wire format.

// Positive fixint: 0x00..=0x7F (value is the marker itself, 0..127)

// Fixmap: 0x80..=0x8F (low nibble = pair count 0..15)
pub const FIXMAP_NIBBLE: u8 = 0x80;

// Fixarray: 0x90..=0x9F (low nibble = element count 0..15)
pub const FIXARRAY_NIBBLE: u8 = 0x90;

// Fixstr: 0xA0..=0xBF (low 5 bits = UTF-8 byte length 0..31)
pub const FIXSTR_BITS: u8 = 0xA0;
pub const FIXSTR_LEN_MASK: u8 = 0x1F;

// Nil and Boolean
pub const NIL: u8 = 0xC0;
pub const FALSE: u8 = 0xC1;
pub const TRUE: u8 = 0xC2;

// Binary (length prefix is u8/u16/u32 big-endian)
pub const BIN_8: u8 = 0xC3;
pub const BIN_16: u8 = 0xC4;
pub const BIN_32: u8 = 0xC5;

// Float (IEEE 754 big-endian)
pub const FLOAT_32: u8 = 0xC6;
pub const FLOAT_64: u8 = 0xC7;

// Unsigned integers (big-endian)
pub const UINT_8: u8 = 0xC8;
pub const UINT_16: u8 = 0xC9;
pub const UINT_32: u8 = 0xCA;
pub const UINT_64: u8 = 0xCB;

// Signed integers (big-endian two's complement)
pub const INT_8: u8 = 0xCC;
pub const INT_16: u8 = 0xCD;
pub const INT_32: u8 = 0xCE;
pub const INT_64: u8 = 0xCF;

// String (length prefix then UTF-8 bytes)
pub const STR_8: u8 = 0xD0;
pub const STR_16: u8 = 0xD1;
pub const STR_32: u8 = 0xD2;

// Array (element count then elements)
pub const ARRAY_16: u8 = 0xD3;
pub const ARRAY_32: u8 = 0xD4;

// Map (pair count then pairs)
pub const MAP_16: u8 = 0xD5;
pub const MAP_32: u8 = 0xD6;

// 0xD7..=0xDF are unassigned and rejected by the decoder.

// Negative fixint: 0xE0..=0xEF, value = (marker & 0x0F) - 16, range -16..-1
pub const NEGFIXINT_BITS: u8 = 0xE0;

// Commands: 0xF0..=0xF9
pub const SET_KEY: u8 = 0xF0;
pub const USE_KEY: u8 = 0xF1;
pub const DEFINE_STRUCT: u8 = 0xF2;
pub const USE_STRUCT: u8 = 0xF3;
pub const CLEAR_KEYS: u8 = 0xF4;
pub const CLEAR_STRUCTS: u8 = 0xF5;
pub const CLEAR_ALL: u8 = 0xF6;
pub const BEGIN_ARRAY: u8 = 0xF7;
pub const END: u8 = 0xF8;
pub const BEGIN_MAP: u8 = 0xF9;

// 0xFA..=0xFF are reserved and rejected by the decoder.

/// Maximum field count in a struct template (wire carries it as one byte).
pub const MAX_STRUCT_FIELDS: usize = 255;

/// Coarse classification of the token a marker byte introduces.
///
/// This is what [`Reader::peek_type`](super::Reader::peek_type) reports;
/// the binder drives its dispatch loop off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Binary,
    Array,
    Map,
    /// `SET_KEY` or `USE_KEY` — an interned map key.
    Key,
    /// `DEFINE_STRUCT` or `USE_STRUCT` — a struct template token.
    Struct,
    /// A table-clearing command (`CLEAR_KEYS`/`CLEAR_STRUCTS`/`CLEAR_ALL`).
    Command,
    /// `END` of an unbounded collection.
    End,
    /// No more top-level tokens in the source.
    EndOfStream,
    /// Unassigned or reserved marker.
    Unknown,
}

impl std::fmt::Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Nil => "nil",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Array => "array",
            Self::Map => "map",
            Self::Key => "key",
            Self::Struct => "struct",
            Self::Command => "command",
            Self::End => "end",
            Self::EndOfStream => "end-of-stream",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classifies a marker byte. Never fails; unassigned and reserved markers
/// map to [`WireType::Unknown`] and the caller decides whether that is fatal.
pub fn classify(marker: u8) -> WireType {
    match marker {
        0x00..=0x7F => WireType::Integer,
        0x80..=0x8F => WireType::Map,
        0x90..=0x9F => WireType::Array,
        0xA0..=0xBF => WireType::String,
        NIL => WireType::Nil,
        FALSE | TRUE => WireType::Boolean,
        BIN_8 | BIN_16 | BIN_32 => WireType::Binary,
        FLOAT_32 | FLOAT_64 => WireType::Float,
        UINT_8..=UINT_64 => WireType::Integer,
        INT_8..=INT_64 => WireType::Integer,
        STR_8 | STR_16 | STR_32 => WireType::String,
        ARRAY_16 | ARRAY_32 => WireType::Array,
        MAP_16 | MAP_32 => WireType::Map,
        0xD7..=0xDF => WireType::Unknown,
        0xE0..=0xEF => WireType::Integer,
        SET_KEY | USE_KEY => WireType::Key,
        DEFINE_STRUCT | USE_STRUCT => WireType::Struct,
        CLEAR_KEYS | CLEAR_STRUCTS | CLEAR_ALL => WireType::Command,
        BEGIN_ARRAY => WireType::Array,
        BEGIN_MAP => WireType::Map,
        END => WireType::End,
        0xFA..=0xFF => WireType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_fix_ranges() {
        assert_eq!(classify(0x00), WireType::Integer);
        assert_eq!(classify(0x7F), WireType::Integer);
        assert_eq!(classify(0x80), WireType::Map);
        assert_eq!(classify(0x8F), WireType::Map);
        assert_eq!(classify(0x90), WireType::Array);
        assert_eq!(classify(0x9F), WireType::Array);
        assert_eq!(classify(0xA0), WireType::String);
        assert_eq!(classify(0xBF), WireType::String);
        assert_eq!(classify(0xE0), WireType::Integer);
        assert_eq!(classify(0xEF), WireType::Integer);
    }

    #[test]
    fn classify_commands() {
        assert_eq!(classify(SET_KEY), WireType::Key);
        assert_eq!(classify(USE_KEY), WireType::Key);
        assert_eq!(classify(DEFINE_STRUCT), WireType::Struct);
        assert_eq!(classify(USE_STRUCT), WireType::Struct);
        assert_eq!(classify(CLEAR_KEYS), WireType::Command);
        assert_eq!(classify(CLEAR_STRUCTS), WireType::Command);
        assert_eq!(classify(CLEAR_ALL), WireType::Command);
        assert_eq!(classify(BEGIN_ARRAY), WireType::Array);
        assert_eq!(classify(BEGIN_MAP), WireType::Map);
        assert_eq!(classify(END), WireType::End);
    }

    #[test]
    fn classify_unassigned_and_reserved() {
        for m in 0xD7..=0xDF {
            assert_eq!(classify(m), WireType::Unknown, "marker 0x{m:02X}");
        }
        for m in 0xFA..=0xFF {
            assert_eq!(classify(m), WireType::Unknown, "marker 0x{m:02X}");
        }
    }
}
