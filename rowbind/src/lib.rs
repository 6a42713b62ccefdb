//! rowbind - rows to records, records to parameters
//!
//! A mapping layer between an SQL executor and strongly-typed records. It
//! resolves result columns to (possibly nested) struct fields once per type,
//! scans rows into records or scalars, binds `:name` parameters from maps or
//! records, expands list arguments for `IN (?)` and rewrites `?` placeholders
//! into the dialect of the driver.
//!
//! # Features
//!
//! - **Derive Macro**: `#[derive(Record)]` describes a struct's fields, with
//!   `rename`, `skip`, `flatten` and `nested` attributes
//! - **Cached Mapping**: column-to-field paths are resolved once per type
//!   and naming convention
//! - **Named Parameters**: `:name` markers bound from maps or records
//! - **IN Expansion**: list arguments become one placeholder per element
//! - **Dialects**: `?`, `$1`, `:name` and `@p1` placeholders
//!
//! # Example
//!
//! ```ignore
//! use rowbind::{Db, MySqlPool, Record};
//!
//! #[derive(Record, Default)]
//! pub struct User {
//!     pub id: i64,
//!     #[rowbind(rename = "user_name")]
//!     pub name: String,
//!     #[rowbind(nested)]
//!     pub address: Address,
//! }
//!
//! async fn find_user(db: &Db<MySqlPool>, id: i64) -> rowbind::Result<User> {
//!     db.named_query("SELECT * FROM users WHERE id = :id", &[("id", id)])
//!         .await?
//!         .collect::<User>()?
//!         .pop()
//!         .ok_or(rowbind::Error::NoRows)
//! }
//! ```

// lets `#[derive(Record)]` name `rowbind::` paths inside this crate too
extern crate self as rowbind;

pub mod bind;
pub mod config;
pub mod db;
pub mod error;
pub mod expand;
pub mod must;
pub mod mysql;
pub mod query;
pub mod reflect;
pub mod scan;
pub mod traits;
pub mod types;
pub mod value;

// Re-export the derive macro
pub use rowbind_derive::Record;

// Re-export main types
pub use crate::config::Options;
pub use bind::{
    bind_named, bind_named_with, bind_type, compile_named_query, rebind, record_args, BindType,
    NamedArgs, NamedQuery,
};
pub use db::{Db, Row, Rows};
pub use error::{Error, Result};
pub use expand::{expand_in, expand_in_with, EmptyListPolicy};
pub use must::MustExt;
pub use mysql::MySqlPool;
pub use query::Query;
pub use reflect::{
    default_mapper, set_default_convention, FieldMap, FieldPath, Mapper, NameConvention,
};
pub use scan::{map_scan, scan_all, scan_row, slice_scan};
pub use traits::{
    decode_record, invalid_path, BufferedRows, ExecuteResult, Executor, FieldDescriptor,
    FieldKind, FromRow, FromValue, Record, RecordRef, RecordType, RowCursor, ScanKind, ToValue,
};
pub use types::{BitBool, GzippedText, JsonText, NullJsonText};
pub use value::Value;
