//! Data-model types shared by every layer of the codec.

mod value;

pub use value::Value;
