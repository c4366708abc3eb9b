//! Wire-level codec: markers, varints, and the token writer/reader.
//!
//! Everything is big-endian. One leading marker byte classifies every
//! token; commands (`0xF0..=0xF9`) drive the symbol tables and unbounded
//! collection framing.

pub mod marker;
pub mod reader;
pub mod varint;
pub mod writer;

pub use marker::{classify, WireType};
pub use reader::{Reader, StructToken};
pub use writer::Writer;

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::{Reader, Writer};

    fn encode(f: impl FnOnce(&mut Writer<&mut Vec<u8>>)) -> Vec<u8> {
        let mut out = Vec::new();
        let mut w = Writer::new(&mut out);
        f(&mut w);
        out
    }

    proptest! {
        #[test]
        fn signed_integers_round_trip(v in any::<i64>()) {
            let bytes = encode(|w| w.write_i64(v).unwrap());
            prop_assert_eq!(Reader::new(&bytes[..]).read_i64().unwrap(), v);
        }

        #[test]
        fn unsigned_integers_round_trip(v in any::<u64>()) {
            let bytes = encode(|w| w.write_u64(v).unwrap());
            prop_assert_eq!(Reader::new(&bytes[..]).read_u64().unwrap(), v);
        }

        #[test]
        fn floats_round_trip(v in any::<f64>()) {
            let bytes = encode(|w| w.write_f64(v).unwrap());
            let back = Reader::new(&bytes[..]).read_f64().unwrap();
            prop_assert_eq!(v.to_bits(), back.to_bits());
        }

        #[test]
        fn strings_round_trip(s in ".{0,64}") {
            let bytes = encode(|w| w.write_str(&s).unwrap());
            prop_assert_eq!(Reader::new(&bytes[..]).read_str().unwrap(), s);
        }

        #[test]
        fn binaries_round_trip(b in proptest::collection::vec(any::<u8>(), 0..512)) {
            let bytes = encode(|w| w.write_bin(&b).unwrap());
            prop_assert_eq!(Reader::new(&bytes[..]).read_bin().unwrap(), b);
        }

        #[test]
        fn skip_lands_on_the_next_token(v in any::<i64>(), s in ".{0,40}") {
            let mut bytes = encode(|w| {
                w.write_str(&s).unwrap();
                w.write_i64(v).unwrap();
            });
            bytes.push(0xC0);
            let mut r = Reader::new(&bytes[..]);
            r.skip().unwrap();
            prop_assert_eq!(r.read_i64().unwrap(), v);
            r.read_nil().unwrap();
        }
    }
}
