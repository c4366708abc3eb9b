//! Object binding: records to map encodings and back.
//!
//! The binder is schema-driven and tolerant of drift. Encoding walks the
//! type's [`TypeDescriptor`] in `(order, name)` order; decoding matches
//! incoming keys against it and survives unknown keys (skipped), missing
//! keys (defaults kept), and wire/declared type mismatches (value
//! skipped, record continues).

mod descriptor;
mod dynamic;
mod field;

pub use descriptor::{FieldDescriptor, TypeDescriptor};
pub use dynamic::{read_value, write_value};
pub use field::FieldType;

use std::io::{Read, Write};

use crate::error::Result;
use crate::types::Value;
use crate::wire::{Reader, Writer};

/// A type the binder can serialize and deserialize.
///
/// Implementations come from the [`record!`](crate::record) macro, which
/// also parks the descriptor in a per-type static — the process-wide
/// descriptor cache.
pub trait Record: Default {
    fn descriptor() -> &'static TypeDescriptor<Self>;
}

/// Encodes a record as a counted map of its non-ignored fields.
pub fn encode_record<T: Record + 'static, W: Write>(w: &mut Writer<W>, record: &T) -> Result<()> {
    let desc = T::descriptor();
    let intern = desc
        .intern_keys()
        .unwrap_or(w.options().use_key_interning);
    w.write_map_header(desc.fields().len())?;
    for field in desc.fields() {
        if intern {
            w.write_key(field.name)?;
        } else {
            w.write_str(field.name)?;
        }
        write_value(w, &(field.get)(record))?;
    }
    Ok(())
}

/// Decodes a map (counted or unbounded) into a record.
pub fn decode_record<T: Record + 'static, R: Read>(r: &mut Reader<R>) -> Result<T> {
    decode_record_at(r, 1)
}

fn decode_record_at<T: Record + 'static, R: Read>(r: &mut Reader<R>, depth: usize) -> Result<T> {
    r.limits().check_depth(depth)?;
    let mut out = T::default();
    match r.read_map_header()? {
        Some(count) => {
            for _ in 0..count {
                decode_field(r, &mut out, depth)?;
            }
        }
        None => {
            while !r.is_end()? {
                decode_field(r, &mut out, depth)?;
            }
            r.read_end()?;
        }
    }
    Ok(out)
}

fn decode_field<T: Record + 'static, R: Read>(r: &mut Reader<R>, out: &mut T, depth: usize) -> Result<()> {
    let key = r.read_key()?;
    let Some(field) = T::descriptor().field(&key) else {
        tracing::debug!(key = %key, "skipping unknown field");
        return r.skip();
    };
    let found = r.peek_type()?;
    if !(field.accepts)(found) {
        tracing::debug!(key = %key, %found, "skipping type-mismatched field");
        return r.skip();
    }
    let value = dynamic::read_value_at(r, depth + 1)?;
    (field.set)(out, value);
    Ok(())
}

/// The record's map form in the dynamic tree, fields in emit order.
pub fn record_to_value<T: Record + 'static>(record: &T) -> Value {
    Value::Map(
        T::descriptor()
            .fields()
            .iter()
            .map(|f| (f.name.to_string(), (f.get)(record)))
            .collect(),
    )
}

/// Binds already-decoded map pairs into a record, with the same
/// tolerance as the streaming path. Nested records decode through here.
pub fn record_from_pairs<T: Record + 'static>(pairs: Vec<(String, Value)>) -> T {
    let desc = T::descriptor();
    let mut out = T::default();
    for (key, value) in pairs {
        match desc.field(&key) {
            Some(field) => (field.set)(&mut out, value),
            None => tracing::debug!(key = %key, "ignoring unknown field"),
        }
    }
    out
}
