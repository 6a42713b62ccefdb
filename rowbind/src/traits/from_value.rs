//! FromValue trait for decoding scanned column values into Rust types

use crate::error::{Error, Result};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// Trait for types that can be constructed from a scanned column value.
///
/// Every leaf field of a record decodes through this trait, and so does a
/// direct-scan destination (`Vec<i64>`, `String`, a `#[rowbind(direct)]`
/// record). Implement it manually for custom column types (e.g., enums).
pub trait FromValue: Sized {
    /// Convert a database value to this type.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> Result<T> {
    Err(Error::TypeConversion {
        expected,
        actual: value.type_name().to_string(),
    })
}

fn out_of_range<T>(expected: &'static str, actual: impl std::fmt::Display) -> Result<T> {
    Err(Error::TypeConversion {
        expected,
        actual: format!("{} out of range", actual),
    })
}

// Drivers report integers with whatever width the protocol carries, so every
// integer target accepts every integer variant as long as the value fits.
macro_rules! impl_from_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    const EXPECTED: &str = stringify!($ty);
                    match value {
                        Value::I8(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::I16(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::I32(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::I64(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::U8(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::U16(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::U32(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::U64(v) => <$ty>::try_from(v).or_else(|_| out_of_range(EXPECTED, v)),
                        Value::Bool(v) => Ok(<$ty>::from(v)),
                        Value::String(ref s) => s.trim().parse::<$ty>().map_err(|_| Error::TypeConversion {
                            expected: EXPECTED,
                            actual: format!("invalid integer string: {}", s),
                        }),
                        ref other => mismatch(EXPECTED, other),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_from_value_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    const EXPECTED: &str = stringify!($ty);
                    match value {
                        Value::F32(v) => Ok(v as $ty),
                        Value::F64(v) => Ok(v as $ty),
                        Value::I8(v) => Ok(v as $ty),
                        Value::I16(v) => Ok(v as $ty),
                        Value::I32(v) => Ok(v as $ty),
                        Value::I64(v) => Ok(v as $ty),
                        Value::U8(v) => Ok(v as $ty),
                        Value::U16(v) => Ok(v as $ty),
                        Value::U32(v) => Ok(v as $ty),
                        Value::U64(v) => Ok(v as $ty),
                        Value::String(ref s) => s.trim().parse::<$ty>().map_err(|_| Error::TypeConversion {
                            expected: EXPECTED,
                            actual: format!("invalid float string: {}", s),
                        }),
                        ref other => mismatch(EXPECTED, other),
                    }
                }
            }
        )*
    };
}

impl_from_value_float!(f32, f64);

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::String(ref s) if s == "0" || s == "1" => Ok(s == "1"),
            other => i64::from_value(other)
                .map(|v| v != 0)
                .map_err(|_| Error::TypeConversion {
                    expected: "bool",
                    actual: "non-integer value".to_string(),
                }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(v) => Ok(v),
            Value::Bytes(v) => String::from_utf8(v).map_err(|e| Error::TypeConversion {
                expected: "utf8 string",
                actual: format!("invalid utf8: {}", e),
            }),
            Value::Decimal(v) => Ok(v.to_string()),
            ref other => mismatch("string", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::String(v) => Ok(v.into_bytes()),
            ref other => mismatch("bytes", other),
        }
    }
}

// Lists only come from the argument side; decoding them back keeps records
// with list fields usable as both scan targets and named-argument sources.
macro_rules! impl_from_value_list {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for Vec<$ty> {
                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::List(items) => items.into_iter().map(<$ty>::from_value).collect(),
                        ref other => mismatch("list", other),
                    }
                }
            }
        )*
    };
}

impl_from_value_list! {
    bool, i8, i16, i32, i64, u16, u32, u64, f32, f64,
    String, NaiveDate, NaiveDateTime, NaiveTime, Decimal, Value,
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(v) => Ok(v),
            Value::DateTime(v) => Ok(v.date()),
            ref other => mismatch("date", other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
            ref other => mismatch("datetime", other),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(v) => Ok(v),
            Value::DateTime(v) => Ok(v.time()),
            ref other => mismatch("time", other),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(v) => Ok(v),
            Value::I64(v) => Ok(Decimal::from(v)),
            Value::U64(v) => Ok(Decimal::from(v)),
            Value::String(v) => v.parse().map_err(|_| Error::TypeConversion {
                expected: "decimal",
                actual: format!("invalid decimal string: {}", v),
            }),
            ref other => mismatch("decimal", other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(v),
            Value::String(v) => serde_json::from_str(&v).map_err(|e| Error::TypeConversion {
                expected: "json",
                actual: format!("invalid json: {}", e),
            }),
            ref other => mismatch("json", other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

// Implement for Option<T>
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(value)?)),
        }
    }
}
