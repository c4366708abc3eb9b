//! Any-typed encode and decode over the dynamic [`Value`] tree.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::types::Value;
use crate::wire::{marker, Reader, StructToken, WireType, Writer};

/// Writes a dynamic value; the runtime shape picks the markers. Map keys
/// follow the writer's key-interning option.
pub fn write_value<W: Write>(w: &mut Writer<W>, value: &Value) -> Result<()> {
    match value {
        Value::Nil => w.write_nil(),
        Value::Bool(b) => w.write_bool(*b),
        Value::Int(i) => w.write_i64(*i),
        Value::UInt(u) => w.write_u64(*u),
        Value::F32(f) => w.write_f32(*f),
        Value::F64(f) => w.write_f64(*f),
        Value::Str(s) => w.write_str(s),
        Value::Bin(b) => w.write_bin(b),
        Value::Array(items) => {
            w.write_array_header(items.len())?;
            for item in items {
                write_value(w, item)?;
            }
            Ok(())
        }
        Value::Map(pairs) => {
            let intern = w.options().use_key_interning;
            w.write_map_header(pairs.len())?;
            for (key, item) in pairs {
                if intern {
                    w.write_key(key)?;
                } else {
                    w.write_str(key)?;
                }
                write_value(w, item)?;
            }
            Ok(())
        }
    }
}

/// Reads one dynamic value.
///
/// Widenings apply: integers come back as `Int` (`UInt` only when the
/// value exceeds `i64::MAX`), float32 as `F64`. Commands encountered at
/// value position are processed: clears are applied, struct definitions
/// registered, struct instances materialized as maps, interned keys
/// resolved to strings. Unbounded collections cannot land in a counted
/// `Value` and fail with [`Error::InvalidNesting`]; consume those through
/// the low-level reader instead.
pub fn read_value<R: Read>(r: &mut Reader<R>) -> Result<Value> {
    read_value_at(r, 1)
}

/// `depth` counts enclosing containers, this value's own container
/// included when it is one; checked against `max_depth` on every
/// container entry.
pub(crate) fn read_value_at<R: Read>(r: &mut Reader<R>, depth: usize) -> Result<Value> {
    loop {
        return match r.peek_type()? {
            WireType::Nil => {
                r.read_nil()?;
                Ok(Value::Nil)
            }
            WireType::Boolean => Ok(Value::Bool(r.read_bool()?)),
            WireType::Integer => read_integer(r),
            WireType::Float => Ok(Value::F64(r.read_f64()?)),
            WireType::String => Ok(Value::Str(r.read_str()?)),
            WireType::Binary => Ok(Value::Bin(r.read_bin()?)),
            WireType::Array => {
                r.limits().check_depth(depth)?;
                match r.read_array_header()? {
                    Some(n) => {
                        // Wire counts are untrusted; cap the preallocation.
                        let mut items = Vec::with_capacity(n.min(1024));
                        for _ in 0..n {
                            items.push(read_value_at(r, depth + 1)?);
                        }
                        Ok(Value::Array(items))
                    }
                    None => Err(Error::InvalidNesting(
                        "unbounded array into a counted target",
                    )),
                }
            }
            WireType::Map => {
                r.limits().check_depth(depth)?;
                match r.read_map_header()? {
                    Some(n) => {
                        let mut pairs = Vec::with_capacity(n.min(1024));
                        for _ in 0..n {
                            let key = r.read_key()?;
                            pairs.push((key, read_value_at(r, depth + 1)?));
                        }
                        Ok(Value::Map(pairs))
                    }
                    None => Err(Error::InvalidNesting(
                        "unbounded map into a counted target",
                    )),
                }
            }
            WireType::Key => Ok(Value::Str(r.read_key()?)),
            WireType::Struct => match r.read_struct_header()? {
                // A definition carries no values; the actual value follows.
                StructToken::Definition(_) => continue,
                StructToken::Instance(names) => {
                    r.limits().check_depth(depth)?;
                    let mut pairs = Vec::with_capacity(names.len());
                    for name in names {
                        let item = read_value_at(r, depth + 1)?;
                        pairs.push((name, item));
                    }
                    Ok(Value::Map(pairs))
                }
            },
            WireType::Command => {
                r.apply_command()?;
                continue;
            }
            WireType::End => Err(Error::InvalidNesting("END at value position")),
            WireType::EndOfStream => Err(Error::Truncated),
            WireType::Unknown => match r.peek_marker()? {
                Some(m) => Err(Error::MalformedToken(m)),
                None => Err(Error::Truncated),
            },
        };
    }
}

fn read_integer<R: Read>(r: &mut Reader<R>) -> Result<Value> {
    if r.peek_marker()? == Some(marker::UINT_64) {
        let v = r.read_u64()?;
        return Ok(match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::UInt(v),
        });
    }
    Ok(Value::Int(r.read_i64()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::ReaderLimits;

    fn round_trip(value: &Value) -> Value {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        write_value(&mut w, value).unwrap();
        read_value(&mut Reader::new(&bytes[..])).unwrap()
    }

    #[test]
    fn scalars_round_trip() {
        for v in [
            Value::Nil,
            Value::Bool(true),
            Value::Int(-42),
            Value::Int(i64::MAX),
            Value::F64(2.25),
            Value::Str("hello".into()),
            Value::Bin(vec![1, 2, 3]),
        ] {
            assert_eq!(round_trip(&v), v);
        }
    }

    #[test]
    fn integers_widen_to_int() {
        // A u64 that fits i64 comes back widened as Int.
        assert_eq!(round_trip(&Value::UInt(500)), Value::Int(500));
        // One that does not stays UInt.
        assert_eq!(round_trip(&Value::UInt(u64::MAX)), Value::UInt(u64::MAX));
    }

    #[test]
    fn float32_widens() {
        assert_eq!(round_trip(&Value::F32(2.5)), Value::F64(2.5));
    }

    #[test]
    fn trees_round_trip() {
        let v = Value::Map(vec![
            ("id".to_string(), Value::Int(7)),
            (
                "tags".to_string(),
                Value::Array(vec![Value::Str("a".into()), Value::Str("b".into())]),
            ),
            (
                "inner".to_string(),
                Value::Map(vec![("id".to_string(), Value::Nil)]),
            ),
        ]);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn repeated_keys_intern_and_resolve() {
        let row = |i: i64| {
            Value::Map(vec![
                ("name".to_string(), Value::Str(format!("user{i}"))),
                ("age".to_string(), Value::Int(i)),
            ])
        };
        let v = Value::Array(vec![row(1), row(2), row(3)]);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn interning_off_emits_plain_strings() {
        let v = Value::Map(vec![("k".to_string(), Value::Int(1))]);
        let mut bytes = Vec::new();
        let mut w = Writer::with_options(&mut bytes, crate::SerializeOptions::plain_keys());
        write_value(&mut w, &v).unwrap();
        // fixmap(1), fixstr "k", 1 — no command markers anywhere.
        assert_eq!(bytes, [0x81, 0xA1, b'k', 0x01]);
    }

    #[test]
    fn struct_instances_materialize_as_maps() {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        w.define_struct(&["name", "age"]).unwrap();
        w.use_struct(0).unwrap();
        w.write_str("Ada").unwrap();
        w.write_i64(36).unwrap();
        drop(w);

        let v = read_value(&mut Reader::new(&bytes[..])).unwrap();
        assert_eq!(
            v,
            Value::Map(vec![
                ("name".to_string(), Value::Str("Ada".into())),
                ("age".to_string(), Value::Int(36)),
            ])
        );
    }

    #[test]
    fn one_definition_many_instances() {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        let id = w.define_struct(&["name", "age", "city"]).unwrap();
        let people = [("Ann", 30i64, "Oslo"), ("Ben", 31, "Bern"), ("Cay", 32, "Cork")];
        for (name, age, city) in people {
            w.use_struct(id).unwrap();
            w.write_str(name).unwrap();
            w.write_i64(age).unwrap();
            w.write_str(city).unwrap();
        }
        drop(w);

        let mut r = Reader::new(&bytes[..]);
        for (name, age, city) in people {
            // The definition rides in front of the first instance and
            // carries no values of its own.
            let v = read_value(&mut r).unwrap();
            assert_eq!(
                v,
                Value::Map(vec![
                    ("name".to_string(), Value::Str(name.into())),
                    ("age".to_string(), Value::Int(age)),
                    ("city".to_string(), Value::Str(city.into())),
                ])
            );
        }
        assert_eq!(r.peek_type().unwrap(), crate::WireType::EndOfStream);
    }

    #[test]
    fn clears_apply_mid_stream() {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        w.write_key("k").unwrap();
        w.clear_all().unwrap();
        w.write_key("k").unwrap();
        drop(w);

        let mut r = Reader::new(&bytes[..]);
        assert_eq!(read_value(&mut r).unwrap(), Value::Str("k".into()));
        // The clear sits in front of the second key; the dynamic reader
        // applies it and carries on.
        assert_eq!(read_value(&mut r).unwrap(), Value::Str("k".into()));
    }

    #[test]
    fn unbounded_collections_are_refused() {
        let mut r = Reader::new(&[0xF7, 0xF8][..]);
        assert!(matches!(
            read_value(&mut r),
            Err(Error::InvalidNesting(_))
        ));
    }

    #[test]
    fn depth_limit_bounds_recursion() {
        let mut bytes = Vec::new();
        let mut w = Writer::new(&mut bytes);
        for _ in 0..6 {
            w.write_array_header(1).unwrap();
        }
        w.write_i64(1).unwrap();
        drop(w);

        let limits = ReaderLimits {
            max_depth: 5,
            ..ReaderLimits::default()
        };
        let mut r = Reader::with_limits(&bytes[..], limits);
        assert!(matches!(
            read_value(&mut r),
            Err(Error::LimitExceeded { what: "nesting depth", .. })
        ));

        let mut r = Reader::new(&bytes[..]);
        assert!(read_value(&mut r).is_ok());
    }
}
