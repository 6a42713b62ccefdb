//! Record trait: a runtime description of a struct's fields plus index-path accessors

use std::any::TypeId;
use std::fmt;

use crate::error::Result;
use crate::value::Value;

/// A handle to a record type that can be described lazily.
///
/// Nested fields store one of these instead of a full [`RecordType`] so that
/// a self-referencing record (through `Box`/`Option<Box>`) can be described
/// without recursing forever; the mapper detects the cycle instead.
#[derive(Clone, Copy)]
pub struct RecordRef {
    /// Identity of the described type, the cache key of the mapper
    pub type_id: TypeId,
    /// Rust type name, for error messages
    pub type_name: &'static str,
    /// Builds the field description on demand
    pub describe: fn() -> RecordType,
}

impl RecordRef {
    /// The handle for `R`.
    pub fn of<R: Record>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
            describe: R::record_type,
        }
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRef")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// How a field participates in name resolution.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A leaf field decoded with `FromValue`
    Value,
    /// A nested record; with `flatten` and no rename its fields are inlined
    Record { record: RecordRef, flatten: bool },
}

/// One mappable field of a record, in declaration order.
///
/// Skipped fields are not described at all; the position of a descriptor in
/// [`RecordType::fields`] is the index used in a `FieldPath`.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// The Rust field identifier
    pub ident: &'static str,
    /// Explicit column name, bypasses the naming convention
    pub rename: Option<&'static str>,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn value(ident: &'static str, rename: Option<&'static str>) -> Self {
        Self {
            ident,
            rename,
            kind: FieldKind::Value,
        }
    }

    pub const fn record(
        ident: &'static str,
        rename: Option<&'static str>,
        record: RecordRef,
        flatten: bool,
    ) -> Self {
        Self {
            ident,
            rename,
            kind: FieldKind::Record { record, flatten },
        }
    }
}

/// Field-level description of a record type.
#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: &'static str,
    pub type_id: TypeId,
    /// Declared `#[rowbind(direct)]`: decoded from a single column via `FromValue`
    pub direct: bool,
    pub fields: Vec<FieldDescriptor>,
}

/// A struct whose fields can be located by index path.
///
/// Implemented by `#[derive(Record)]`. The derive also implements
/// [`FromRow`](crate::FromRow) and [`NamedArgs`](crate::NamedArgs) for the
/// type, so a record can be both a scan destination and a named-argument
/// source.
///
/// # Manual Implementation
///
/// ```ignore
/// use rowbind::{FieldDescriptor, FromValue, Record, RecordType, Result, Value};
///
/// #[derive(Default)]
/// pub struct User {
///     pub id: i64,
///     pub name: String,
/// }
///
/// impl Record for User {
///     fn record_type() -> RecordType {
///         RecordType {
///             name: "User",
///             type_id: std::any::TypeId::of::<Self>(),
///             direct: false,
///             fields: vec![
///                 FieldDescriptor::value("id", None),
///                 FieldDescriptor::value("name", None),
///             ],
///         }
///     }
///
///     fn set_field(&mut self, path: &[usize], value: Value) -> Result<()> {
///         match path {
///             [0] => self.id = FromValue::from_value(value)?,
///             [1] => self.name = FromValue::from_value(value)?,
///             _ => return Err(rowbind::invalid_path::<Self>(path)),
///         }
///         Ok(())
///     }
///
///     fn field_value(&self, path: &[usize]) -> Result<Value> {
///         match path {
///             [0] => Ok(rowbind::ToValue::to_value(&self.id)),
///             [1] => Ok(rowbind::ToValue::to_value(&self.name)),
///             _ => Err(rowbind::invalid_path::<Self>(path)),
///         }
///     }
/// }
/// ```
pub trait Record: Default + Send + 'static {
    /// Describe the mappable fields of this type.
    fn record_type() -> RecordType;

    /// Decode `value` into the leaf field at `path`, allocating optional
    /// nested records on the way down.
    fn set_field(&mut self, path: &[usize], value: Value) -> Result<()>;

    /// Read the leaf field at `path`. A `None` nested record reads as `Null`.
    fn field_value(&self, path: &[usize]) -> Result<Value>;

    /// Lazily-described handle for this type.
    fn record_ref() -> RecordRef
    where
        Self: Sized,
    {
        RecordRef::of::<Self>()
    }
}

/// Error for a path that does not address a leaf field of `R`.
pub fn invalid_path<R: Record>(path: &[usize]) -> crate::Error {
    crate::Error::TypeMismatch(format!(
        "field path {:?} does not address a field of {}",
        path,
        std::any::type_name::<R>()
    ))
}
