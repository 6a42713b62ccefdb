//! FromRow trait: scan destinations, either a single column or a whole record

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::reflect::FieldPath;
use crate::traits::{FromValue, Record, RecordRef};
use crate::value::Value;

/// How a destination type consumes a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanKind {
    /// The row must have exactly one column, decoded with `FromValue`
    Direct,
    /// Columns are matched to fields through the mapper
    Structured,
}

/// Trait for types that rows can be scanned into.
///
/// Scalars (`i64`, `String`, `Option<T>`, ...) decode directly from a
/// one-column row. Records implement this through `#[derive(Record)]` and
/// are populated field by field; whether a record is actually scanned
/// structurally is decided once by the mapper (see
/// [`FieldMap::kind`](crate::reflect::FieldMap::kind)). `Box<T>` delegates to
/// `T`, so `Vec<Box<T>>` destinations behave like `Vec<T>`.
pub trait FromRow: Sized {
    /// The record shape of this destination, `None` for scalars.
    fn record() -> Option<RecordRef> {
        None
    }

    /// Decode a one-column row.
    fn from_column(value: Value) -> Result<Self>;

    /// Decode a row whose column `i` belongs to the field at `fields[i]`.
    /// Values are taken out of the buffer; empty paths are skipped.
    fn from_fields(values: &mut [Value], fields: &[FieldPath]) -> Result<Self>;
}

/// Build a record from a scanned value buffer and its resolved field paths.
pub fn decode_record<R: Record>(values: &mut [Value], fields: &[FieldPath]) -> Result<R> {
    let mut record = R::default();
    for (value, path) in values.iter_mut().zip(fields) {
        if path.is_empty() {
            continue;
        }
        record.set_field(path.as_slice(), value.take())?;
    }
    Ok(record)
}

fn not_a_record<T>() -> Error {
    Error::TypeMismatch(format!(
        "{} is not a record and cannot be scanned field by field",
        std::any::type_name::<T>()
    ))
}

macro_rules! impl_from_row_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_column(value: Value) -> Result<Self> {
                    <$ty as FromValue>::from_value(value)
                }

                fn from_fields(_: &mut [Value], _: &[FieldPath]) -> Result<Self> {
                    Err(not_a_record::<$ty>())
                }
            }
        )*
    };
}

impl_from_row_scalar! {
    bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64,
    String, Vec<u8>, NaiveDate, NaiveDateTime, NaiveTime, Decimal,
    serde_json::Value, Value,
}

impl<T: FromValue> FromRow for Option<T> {
    fn from_column(value: Value) -> Result<Self> {
        <Option<T> as FromValue>::from_value(value)
    }

    fn from_fields(_: &mut [Value], _: &[FieldPath]) -> Result<Self> {
        Err(not_a_record::<Self>())
    }
}

impl<T: FromRow> FromRow for Box<T> {
    fn record() -> Option<RecordRef> {
        T::record()
    }

    fn from_column(value: Value) -> Result<Self> {
        T::from_column(value).map(Box::new)
    }

    fn from_fields(values: &mut [Value], fields: &[FieldPath]) -> Result<Self> {
        T::from_fields(values, fields).map(Box::new)
    }
}
