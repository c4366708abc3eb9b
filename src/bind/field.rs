//! Wire compatibility and value conversion per declared field type.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use uuid::Uuid;

use crate::types::Value;
use crate::wire::WireType;

/// 100 ns units per second, the tick resolution durations ride the wire in.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// A type that can live in a record field.
///
/// `accepts` is the wire→declared-type compatibility test the decoder
/// runs on the peeked marker before reading the value; `from_value`
/// converts the decoded dynamic value, returning `None` when it does not
/// fit (the field then keeps its default).
pub trait FieldType: Sized {
    fn accepts(ty: WireType) -> bool;
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldType for bool {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Boolean
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! signed_field {
    ($($t:ty),*) => {$(
        impl FieldType for $t {
            fn accepts(ty: WireType) -> bool {
                ty == WireType::Integer
            }

            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Int(i) => <$t>::try_from(i).ok(),
                    Value::UInt(u) => <$t>::try_from(u).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($t:ty),*) => {$(
        impl FieldType for $t {
            fn accepts(ty: WireType) -> bool {
                ty == WireType::Integer
            }

            fn to_value(&self) -> Value {
                Value::UInt(u64::from(*self))
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Int(i) => <$t>::try_from(i).ok(),
                    Value::UInt(u) => <$t>::try_from(u).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

signed_field!(i8, i16, i32, i64);
unsigned_field!(u8, u16, u32, u64);

impl FieldType for f32 {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Float
    }

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::F32(f) => Some(f),
            // Dynamic reads widen float32 to F64; narrowing back is exact
            // for values that started as float32.
            Value::F64(f) => Some(f as f32),
            _ => None,
        }
    }
}

impl FieldType for f64 {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Float
    }

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_float()
    }
}

impl FieldType for String {
    fn accepts(ty: WireType) -> bool {
        matches!(ty, WireType::String | WireType::Key)
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FieldType for Bytes {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Binary
    }

    fn to_value(&self) -> Value {
        Value::Bin(self.to_vec())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bin(b) => Some(Bytes::from(b)),
            _ => None,
        }
    }
}

impl FieldType for Uuid {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Binary
    }

    /// RFC 4122 network byte order.
    fn to_value(&self) -> Value {
        Value::Bin(self.as_bytes().to_vec())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bin(b) => Uuid::from_slice(&b).ok(),
            _ => None,
        }
    }
}

impl FieldType for DateTime<Utc> {
    fn accepts(ty: WireType) -> bool {
        matches!(ty, WireType::Integer | WireType::String | WireType::Key)
    }

    /// Unix milliseconds UTC, the portable moment form.
    fn to_value(&self) -> Value {
        Value::Int(self.timestamp_millis())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(ms) => DateTime::<Utc>::from_timestamp_millis(ms),
            Value::Str(s) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }
}

impl FieldType for DateTime<FixedOffset> {
    fn accepts(ty: WireType) -> bool {
        matches!(ty, WireType::Integer | WireType::String | WireType::Key)
    }

    fn to_value(&self) -> Value {
        Value::Int(self.timestamp_millis())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(ms) => {
                DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.fixed_offset())
            }
            Value::Str(s) => DateTime::parse_from_rfc3339(&s).ok(),
            _ => None,
        }
    }
}

impl FieldType for TimeDelta {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Integer
    }

    /// Ticks: 100 ns units, like the source host's duration type.
    fn to_value(&self) -> Value {
        let ticks = self
            .num_seconds()
            .saturating_mul(TICKS_PER_SECOND)
            .saturating_add(i64::from(self.subsec_nanos() / 100));
        Value::Int(ticks)
    }

    fn from_value(value: Value) -> Option<Self> {
        let ticks = value.as_int()?;
        let seconds = ticks.div_euclid(TICKS_PER_SECOND);
        let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        TimeDelta::new(seconds, nanos)
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Nil || T::accepts(ty)
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Nil,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Nil => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Array
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FieldType::to_value).collect())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: FieldType> FieldType for HashMap<String, T> {
    fn accepts(ty: WireType) -> bool {
        ty == WireType::Map
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Map(pairs) => pairs
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            _ => None,
        }
    }
}

impl FieldType for Value {
    fn accepts(ty: WireType) -> bool {
        matches!(
            ty,
            WireType::Nil
                | WireType::Boolean
                | WireType::Integer
                | WireType::Float
                | WireType::String
                | WireType::Binary
                | WireType::Array
                | WireType::Map
                | WireType::Key
                | WireType::Struct
        )
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_narrow_checked() {
        assert_eq!(i8::from_value(Value::Int(-128)), Some(-128));
        assert_eq!(i8::from_value(Value::Int(128)), None);
        assert_eq!(u8::from_value(Value::Int(-1)), None);
        assert_eq!(u64::from_value(Value::UInt(u64::MAX)), Some(u64::MAX));
        assert_eq!(i64::from_value(Value::UInt(u64::MAX)), None);
    }

    #[test]
    fn floats_accept_only_floats() {
        assert!(f64::accepts(WireType::Float));
        assert!(!f64::accepts(WireType::Integer));
        assert_eq!(f32::from_value(Value::F64(2.5)), Some(2.5));
    }

    #[test]
    fn option_maps_nil() {
        assert_eq!(Option::<i32>::from_value(Value::Nil), Some(None));
        assert_eq!(Option::<i32>::from_value(Value::Int(5)), Some(Some(5)));
        assert!(Option::<i32>::accepts(WireType::Nil));
        assert!(Option::<i32>::accepts(WireType::Integer));
        assert!(!Option::<i32>::accepts(WireType::String));
    }

    #[test]
    fn uuid_is_rfc4122_bytes() {
        let id = Uuid::new_v4();
        let v = id.to_value();
        assert_eq!(v, Value::Bin(id.as_bytes().to_vec()));
        assert_eq!(Uuid::from_value(v), Some(id));
        assert_eq!(Uuid::from_value(Value::Bin(vec![0; 15])), None);
    }

    #[test]
    fn moments_ride_unix_millis() {
        let dt = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(dt.to_value(), Value::Int(1_700_000_000_123));
        assert_eq!(DateTime::<Utc>::from_value(Value::Int(1_700_000_000_123)), Some(dt));
    }

    #[test]
    fn moments_parse_from_strings() {
        let parsed =
            DateTime::<Utc>::from_value(Value::Str("2024-01-02T03:04:05Z".into())).unwrap();
        assert_eq!(parsed.timestamp(), 1_704_164_645);
        assert_eq!(
            DateTime::<Utc>::from_value(Value::Str("not a moment".into())),
            None
        );
    }

    #[test]
    fn durations_ride_ticks() {
        let delta = TimeDelta::new(90, 500_000_000).unwrap();
        // 90.5 s = 905_000_000 ticks.
        assert_eq!(delta.to_value(), Value::Int(905_000_000));
        assert_eq!(TimeDelta::from_value(Value::Int(905_000_000)), Some(delta));

        let negative = TimeDelta::milliseconds(-1500);
        let v = negative.to_value();
        assert_eq!(v, Value::Int(-15_000_000));
        assert_eq!(TimeDelta::from_value(v), Some(negative));
    }

    #[test]
    fn vectors_convert_element_wise() {
        let v = vec![1i32, 2, 3].to_value();
        assert_eq!(
            v,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(Vec::<i32>::from_value(v), Some(vec![1, 2, 3]));
        // One bad element rejects the whole field.
        let mixed = Value::Array(vec![Value::Int(1), Value::Str("x".into())]);
        assert_eq!(Vec::<i32>::from_value(mixed), None);
    }
}
