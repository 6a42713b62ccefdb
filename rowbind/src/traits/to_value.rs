//! ToValue trait for converting Rust types to bound arguments

use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// Trait for types that can be converted to a database value.
///
/// This is implemented for common Rust types and can be implemented
/// manually for custom types (e.g., enums). Vectors and slices of the
/// scalar types convert into [`Value::List`] so they can feed an
/// `IN (...)` expansion; `Vec<u8>` and `&[u8]` stay binary.
pub trait ToValue {
    /// Convert this value to a database value.
    fn to_value(&self) -> Value;
}

macro_rules! impl_to_value_copy {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }
            }
        )*
    };
}

impl_to_value_copy! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    NaiveTime => Time,
    Decimal => Decimal,
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToValue for &[u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

// Sequences become lists; u8 is excluded because byte vectors are blobs.
macro_rules! impl_to_value_list {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToValue for Vec<$ty> {
                fn to_value(&self) -> Value {
                    Value::List(self.iter().map(ToValue::to_value).collect())
                }
            }

            impl ToValue for [$ty] {
                fn to_value(&self) -> Value {
                    Value::List(self.iter().map(ToValue::to_value).collect())
                }
            }
        )*
    };
}

impl_to_value_list! {
    bool, i8, i16, i32, i64, u16, u32, u64, f32, f64,
    String, &str, NaiveDate, NaiveDateTime, NaiveTime, Decimal, Value,
}

// Implement for Option<T>
impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

// Implement for references
impl<T: ToValue> ToValue for &T {
    fn to_value(&self) -> Value {
        (*self).to_value()
    }
}
