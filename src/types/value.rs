//! The dynamic value tree.

use std::fmt;

/// A dynamically-typed value in the packtern data model.
///
/// This is what the any-typed reader produces and what record getters hand
/// to the encoder. Maps are ordered pair lists because the wire format
/// defines a map as an ordered sequence of (key, value) pairs.
///
/// Dynamic reads widen: every integer marker decodes to `Int` unless the
/// value only fits an unsigned 64 (then `UInt`), and float32 decodes to
/// `F64`. `F32` exists so a field declared as `f32` can still emit the
/// 4-byte wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Returns the value as a string slice, if it is a `Str` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64, widening `UInt` when it fits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Returns the value as an f64, if it is a float variant.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::F32(f) => Some(f64::from(*f)),
            Self::F64(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a bool, if it is a `Bool` variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Looks up a key in a `Map` value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// True for the `Nil` variant.
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

// -- Convenience conversions --

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::F64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bin(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<(String, Value)>> for Value {
    fn from(pairs: Vec<(String, Value)>) -> Self {
        Self::Map(pairs)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bin(b) => write!(f, "<{} bytes>", b.len()),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_lookup() {
        let v = Value::Map(vec![
            ("name".to_string(), Value::Str("Alice".into())),
            ("age".to_string(), Value::Int(30)),
        ]);
        assert_eq!(v.get("age").and_then(Value::as_int), Some(30));
        assert_eq!(v.get("missing"), None);
    }

    #[test]
    fn uint_widens_when_it_fits() {
        assert_eq!(Value::UInt(7).as_int(), Some(7));
        assert_eq!(Value::UInt(u64::MAX).as_int(), None);
    }

    #[test]
    fn display_is_compact() {
        let v = Value::Map(vec![(
            "xs".to_string(),
            Value::Array(vec![Value::Int(1), Value::Nil, Value::Bool(true)]),
        )]);
        assert_eq!(v.to_string(), "{xs: [1, nil, true]}");
    }
}
