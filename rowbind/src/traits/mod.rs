//! Core traits for rowbind

mod cursor;
mod executor;
mod from_row;
mod from_value;
mod record;
mod to_value;

pub use cursor::{BufferedRows, RowCursor};
pub use executor::{ExecuteResult, Executor};
pub use from_row::{decode_record, FromRow, ScanKind};
pub use from_value::FromValue;
pub use record::{invalid_path, FieldDescriptor, FieldKind, Record, RecordRef, RecordType};
pub use to_value::ToValue;
