//! RowCursor trait and an in-memory cursor implementation

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::value::Value;

/// A forward-only handle over the rows of one result set.
///
/// This is the seam between rowbind and whatever actually talks to the
/// database: the scanner only ever asks for the column names, moves to the
/// next row, copies the current row into a slot buffer, and releases the
/// cursor. A cursor is owned by one scan sequence at a time.
pub trait RowCursor {
    /// Column names of the result set, in result order.
    fn columns(&self) -> Result<Vec<String>>;

    /// Move to the next row. Returns `Ok(false)` once the rows are exhausted;
    /// an error encountered while iterating is returned instead.
    fn advance(&mut self) -> Result<bool>;

    /// Move the values of the current row into `slots`, one slot per column.
    fn scan(&mut self, slots: &mut [Value]) -> Result<()>;

    /// Release the cursor. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

impl<C: RowCursor + ?Sized> RowCursor for Box<C> {
    fn columns(&self) -> Result<Vec<String>> {
        (**self).columns()
    }

    fn advance(&mut self) -> Result<bool> {
        (**self).advance()
    }

    fn scan(&mut self, slots: &mut [Value]) -> Result<()> {
        (**self).scan(slots)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// A cursor over rows that were fetched up front.
///
/// Backends that materialize a result before handing it over (the MySQL
/// executor does) return this, and it doubles as a fixture in tests.
#[derive(Debug, Clone, Default)]
pub struct BufferedRows {
    columns: Vec<String>,
    pending: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    closed: bool,
}

impl BufferedRows {
    /// Create a cursor over `rows`; every row must have one value per column.
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(Error::InvalidArgument(format!(
                "row has {} values but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            pending: rows.into(),
            current: None,
            closed: false,
        })
    }

    /// An empty result with the given columns.
    pub fn empty<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Rows not yet visited.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowCursor for BufferedRows {
    fn columns(&self) -> Result<Vec<String>> {
        if self.closed {
            return Err(Error::CursorClosed);
        }
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn scan(&mut self, slots: &mut [Value]) -> Result<()> {
        if self.closed {
            return Err(Error::CursorClosed);
        }
        let row = self
            .current
            .as_mut()
            .ok_or_else(|| Error::Query("scan called without a current row".to_string()))?;
        if slots.len() != row.len() {
            return Err(Error::InvalidArgument(format!(
                "expected {} destination arguments in scan, not {}",
                row.len(),
                slots.len()
            )));
        }
        for (slot, value) in slots.iter_mut().zip(row.iter_mut()) {
            *slot = value.take();
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.pending.clear();
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rows() -> BufferedRows {
        BufferedRows::new(
            ["id", "name"],
            vec![
                vec![Value::I64(1), Value::from("a")],
                vec![Value::I64(2), Value::from("b")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_iterates_in_order() {
        let mut rows = two_rows();
        let mut slots = vec![Value::Null; 2];
        assert!(rows.advance().unwrap());
        rows.scan(&mut slots).unwrap();
        assert_eq!(slots[0], Value::I64(1));
        assert!(rows.advance().unwrap());
        rows.scan(&mut slots).unwrap();
        assert_eq!(slots[1], Value::from("b"));
        assert!(!rows.advance().unwrap());
    }

    #[test]
    fn test_scan_checks_slot_count() {
        let mut rows = two_rows();
        rows.advance().unwrap();
        let mut slots = vec![Value::Null; 1];
        assert!(matches!(
            rows.scan(&mut slots),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut rows = two_rows();
        rows.close().unwrap();
        rows.close().unwrap();
        assert!(rows.is_closed());
        assert!(!rows.advance().unwrap());
        assert!(matches!(rows.columns(), Err(Error::CursorClosed)));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = BufferedRows::new(["a", "b"], vec![vec![Value::Null]]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
