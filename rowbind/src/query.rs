//! Query builder for rowbind

use crate::db::Db;
use crate::error::{Error, Result};
use crate::traits::{ExecuteResult, Executor, FromRow, FromValue, ToValue};
use crate::value::Value;

/// A query builder that supports fluent parameter binding.
///
/// The SQL is written with `?` placeholders. Before running, list arguments
/// are expanded (`IN (?)` becomes `IN (?, ?, ?)`) and the query is rebound
/// to the dialect of the `Db` it runs on.
///
/// # Example
///
/// ```ignore
/// use rowbind::{Db, MySqlPool, Query};
///
/// async fn find_users(db: &Db<MySqlPool>, ids: &[i64]) -> rowbind::Result<Vec<User>> {
///     Query::new("SELECT * FROM users WHERE id IN (?) AND active = ?")
///         .bind_list(ids)
///         .bind(true)
///         .fetch_all(db)
///         .await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Query<'q> {
    sql: &'q str,
    params: Vec<Value>,
}

impl<'q> Query<'q> {
    /// Create a new query with the given SQL.
    pub fn new(sql: &'q str) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    /// Bind a single value to the query.
    ///
    /// Values are bound in order, replacing `?` placeholders.
    pub fn bind<T: ToValue>(mut self, value: T) -> Self {
        self.params.push(value.to_value());
        self
    }

    /// Bind one value per element, each to its own `?`.
    pub fn bind_all<T: ToValue>(mut self, values: &[T]) -> Self {
        for value in values {
            self.params.push(value.to_value());
        }
        self
    }

    /// Bind all elements to a single `?`, which expands to one placeholder
    /// per element.
    pub fn bind_list<T: ToValue>(mut self, values: &[T]) -> Self {
        self.params
            .push(Value::List(values.iter().map(ToValue::to_value).collect()));
        self
    }

    /// Get the SQL string.
    pub fn sql(&self) -> &str {
        self.sql
    }

    /// Get the bound parameters.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Take ownership of the parameters.
    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    /// Execute the query and return the result.
    pub async fn execute<E: Executor>(self, db: &Db<E>) -> Result<ExecuteResult> {
        db.in_exec(self.sql, self.params).await
    }

    /// Fetch all matching rows.
    pub async fn fetch_all<T: FromRow, E: Executor>(self, db: &Db<E>) -> Result<Vec<T>> {
        db.in_select(self.sql, self.params).await
    }

    /// Fetch a single optional row.
    pub async fn fetch_optional<T: FromRow, E: Executor>(self, db: &Db<E>) -> Result<Option<T>> {
        match db.in_get(self.sql, self.params).await {
            Ok(row) => Ok(Some(row)),
            Err(Error::NoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch exactly one row.
    pub async fn fetch_one<T: FromRow, E: Executor>(self, db: &Db<E>) -> Result<T> {
        db.in_get(self.sql, self.params).await
    }

    /// Fetch a scalar value (first column of first row).
    pub async fn fetch_scalar<T: FromValue, E: Executor>(self, db: &Db<E>) -> Result<T> {
        let (sql, params) = db.expand_in(self.sql, self.params)?;
        let mut values = db.query_row(&sql, params).await?.slice_scan()?;
        if values.is_empty() {
            return Err(Error::Query("Expected at least one column".to_string()));
        }
        T::from_value(values.swap_remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_variants() {
        let query = Query::new("SELECT * FROM t WHERE a = ? AND b IN (?) AND c = ? AND d = ?")
            .bind(1i64)
            .bind_list(&["x", "y"])
            .bind_all(&[true, false]);
        assert_eq!(
            query.params(),
            &[
                Value::I64(1),
                Value::List(vec![Value::from("x"), Value::from("y")]),
                Value::Bool(true),
                Value::Bool(false),
            ]
        );
        assert_eq!(query.into_params().len(), 4);
    }

    #[test]
    fn test_bind_option_as_null() {
        let query = Query::new("SELECT ?").bind(None::<i32>);
        assert_eq!(query.params(), &[Value::Null]);
    }
}
