//! Row scanning: decode cursor rows into scalars, records, slices and maps

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::reflect::{missing_field, FieldPath, Mapper};
use crate::traits::{FromRow, RowCursor, ScanKind};
use crate::value::Value;

/// How one result set decodes into a destination type, worked out once and
/// reused for every row.
#[derive(Debug)]
pub(crate) struct ScanPlan {
    kind: ScanKind,
    record: Option<TypeId>,
    fields: Vec<FieldPath>,
    buffer: Vec<Value>,
}

impl ScanPlan {
    /// Classify `T` and resolve its fields against `columns`.
    ///
    /// Direct destinations need exactly one column. Structured ones need a
    /// field for every column unless `permissive`, in which case unmatched
    /// columns are read and dropped.
    pub(crate) fn new<T: FromRow>(
        columns: &[String],
        mapper: &Mapper,
        permissive: bool,
    ) -> Result<Self> {
        let record = T::record();
        let map = match record {
            Some(record) => Some(mapper.type_map(record)?),
            None => None,
        };

        let (kind, fields) = match map {
            Some(map) if map.kind() == ScanKind::Structured => {
                let fields = map.traversals(columns);
                if !permissive {
                    if let Some(i) = missing_field(&fields) {
                        return Err(Error::MissingField {
                            column: columns[i].clone(),
                            type_name: map.type_name(),
                        });
                    }
                }
                (ScanKind::Structured, fields)
            }
            _ => {
                if columns.len() != 1 {
                    return Err(Error::ScalarColumnCount {
                        type_name: std::any::type_name::<T>(),
                        columns: columns.len(),
                    });
                }
                (ScanKind::Direct, Vec::new())
            }
        };

        Ok(Self {
            kind,
            record: record.map(|r| r.type_id),
            fields,
            buffer: vec![Value::Null; columns.len()],
        })
    }

    pub(crate) fn kind(&self) -> ScanKind {
        self.kind
    }

    /// The record type this plan was resolved for.
    pub(crate) fn record(&self) -> Option<TypeId> {
        self.record
    }

    /// Decode the cursor's current row.
    pub(crate) fn decode<T: FromRow, C: RowCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<T> {
        cursor.scan(&mut self.buffer)?;
        match self.kind {
            ScanKind::Direct => T::from_column(self.buffer[0].take()),
            ScanKind::Structured => T::from_fields(&mut self.buffer, &self.fields),
        }
    }
}

/// Decode the cursor's current row into `T`.
///
/// The cursor must already be positioned on a row. Scalars and direct
/// records require a one-column result; records are matched by column name.
pub fn scan_row<T: FromRow, C: RowCursor + ?Sized>(
    cursor: &mut C,
    mapper: &Mapper,
    permissive: bool,
) -> Result<T> {
    let columns = cursor.columns()?;
    ScanPlan::new::<T>(&columns, mapper, permissive)?.decode(cursor)
}

/// Decode every remaining row of `cursor`, appending to `dest`.
///
/// `dest` is cleared first. The destination is classified and resolved
/// once, before any row is read, so a column mismatch fails without
/// consuming the cursor. If row N fails, the N - 1 rows already appended
/// stay in `dest` (best-effort partial result on error). The cursor is not
/// closed.
pub fn scan_all<T: FromRow, C: RowCursor + ?Sized>(
    cursor: &mut C,
    dest: &mut Vec<T>,
    mapper: &Mapper,
    permissive: bool,
) -> Result<()> {
    dest.clear();
    let columns = cursor.columns()?;
    let mut plan = ScanPlan::new::<T>(&columns, mapper, permissive)?;
    while cursor.advance()? {
        dest.push(plan.decode(cursor)?);
    }
    Ok(())
}

/// The current row's values in column order.
pub fn slice_scan<C: RowCursor + ?Sized>(cursor: &mut C) -> Result<Vec<Value>> {
    let mut values = vec![Value::Null; cursor.columns()?.len()];
    cursor.scan(&mut values)?;
    Ok(values)
}

/// The current row keyed by column name; a later duplicate column
/// overwrites an earlier one.
pub fn map_scan<C: RowCursor + ?Sized>(cursor: &mut C) -> Result<HashMap<String, Value>> {
    let columns = cursor.columns()?;
    let mut values = vec![Value::Null; columns.len()];
    cursor.scan(&mut values)?;
    Ok(columns.into_iter().zip(values).collect())
}
