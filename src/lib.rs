//! packtern — a compact, self-describing binary serialization format.
//!
//! The wire format is a MessagePack-like type-tagged byte stream extended
//! with in-stream commands: repeated map keys intern through a key table,
//! field-name lists define reusable struct templates, and unbounded
//! collections frame with BEGIN/END. Highly homogeneous payloads (record
//! lists, tabular data, event streams) encode their keys only once.
//!
//! # Architecture
//!
//! - **`wire`** — marker alphabet, command varints, and the low-level
//!   token [`Writer`]/[`Reader`] with the symbol-table machinery
//! - **`bind`** — the object binder: [`record!`]-declared types to map
//!   encodings and back, tolerant of schema drift
//! - **`rows`** — row-of-map bridges for tabular sources and unbounded
//!   row streams
//! - **`types`** — the dynamic [`Value`] tree
//! - **`error`** / **`limits`** / **`options`** — failure taxonomy,
//!   decode limits, encode options
//!
//! There is no stream header, magic, or version byte: the top-level token
//! is the value itself. This crate speaks format v1.2.0.
//!
//! # Example
//!
//! ```
//! use packtern::record;
//!
//! record! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct User {
//!         name ("Name"): String,
//!         age ("Age"): i32,
//!     }
//! }
//!
//! let user = User { name: "Alice".into(), age: 30 };
//! let bytes = packtern::to_vec(&user).unwrap();
//! let back: User = packtern::from_slice(&bytes).unwrap();
//! assert_eq!(back, user);
//! ```

pub mod bind;
pub mod error;
pub mod limits;
#[macro_use]
mod macros;
pub mod options;
pub mod rows;
pub mod types;
pub mod wire;

pub use error::{Error, Result};
pub use limits::ReaderLimits;
pub use options::SerializeOptions;
pub use types::Value;
pub use wire::{Reader, StructToken, Writer, WireType};

use std::io::{Read, Write};

use bind::Record;

/// Encodes a record to bytes with default options.
pub fn to_vec<T: Record + 'static>(value: &T) -> Result<Vec<u8>> {
    to_vec_with(value, &SerializeOptions::default())
}

/// Encodes a record to bytes.
pub fn to_vec_with<T: Record + 'static>(value: &T, options: &SerializeOptions) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut w = Writer::with_options(&mut bytes, options.clone());
    bind::encode_record(&mut w, value)?;
    Ok(bytes)
}

/// Encodes a record to an already-open byte sink and flushes it.
pub fn to_writer<T: Record + 'static, W: Write>(
    sink: W,
    value: &T,
    options: &SerializeOptions,
) -> Result<()> {
    let mut w = Writer::with_options(sink, options.clone());
    bind::encode_record(&mut w, value)?;
    w.flush()
}

/// Decodes a record from bytes with default limits.
pub fn from_slice<T: Record + 'static>(data: &[u8]) -> Result<T> {
    from_slice_with(data, ReaderLimits::default())
}

/// Decodes a record from bytes.
pub fn from_slice_with<T: Record + 'static>(data: &[u8], limits: ReaderLimits) -> Result<T> {
    bind::decode_record(&mut Reader::with_limits(data, limits))
}

/// Decodes a record from an already-open byte source.
pub fn from_reader<T: Record + 'static, R: Read>(source: R, limits: ReaderLimits) -> Result<T> {
    bind::decode_record(&mut Reader::with_limits(source, limits))
}

/// Encodes a dynamic value to bytes.
pub fn value_to_vec(value: &Value, options: &SerializeOptions) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut w = Writer::with_options(&mut bytes, options.clone());
    bind::write_value(&mut w, value)?;
    Ok(bytes)
}

/// Decodes a dynamic value from bytes with default limits.
pub fn value_from_slice(data: &[u8]) -> Result<Value> {
    value_from_slice_with(data, ReaderLimits::default())
}

/// Decodes a dynamic value from bytes.
pub fn value_from_slice_with(data: &[u8], limits: ReaderLimits) -> Result<Value> {
    bind::read_value(&mut Reader::with_limits(data, limits))
}
