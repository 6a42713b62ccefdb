//! Derive macro for rowbind records
//!
//! `#[derive(Record)]` is re-exported from the `rowbind` crate, so users
//! typically don't need to depend on this crate directly.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attrs;
mod record;

/// Derive macro describing a struct as a rowbind record.
///
/// Generates `Record` (field descriptions and index-path accessors),
/// `FromRow` (so the struct can be a scan destination) and `NamedArgs` (so
/// it can supply `:name` parameters). The struct must implement `Default`;
/// leaf fields must implement both `FromValue` and `ToValue`.
///
/// # Attributes
///
/// Field level:
///
/// - `#[rowbind(rename = "column_name")]` - Use this column name instead of
///   the naming convention
/// - `#[rowbind(skip)]` - Leave this field out of mapping; it keeps its
///   `Default` value
/// - `#[rowbind(nested)]` - The field is a record; its fields answer to
///   `field.sub_field`
/// - `#[rowbind(flatten)]` - The field is a record whose fields answer to
///   their own names, as if declared here (with `rename`, the rename is used
///   as a prefix instead)
///
/// Record fields may be `T`, `Box<T>`, `Option<T>` or `Option<Box<T>>`.
///
/// Struct level:
///
/// - `#[rowbind(direct)]` - Scan the struct from a single column through its
///   own `FromValue` implementation
///
/// # Example
///
/// ```ignore
/// use rowbind::Record;
///
/// #[derive(Record, Default)]
/// pub struct Audit {
///     pub created_by: String,
/// }
///
/// #[derive(Record, Default)]
/// pub struct User {
///     pub id: i64,
///     #[rowbind(rename = "user_name")]
///     pub username: String,
///     #[rowbind(flatten)]
///     pub audit: Audit,
///     #[rowbind(skip)]
///     pub cached: Option<String>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(rowbind))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
