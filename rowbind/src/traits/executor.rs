//! Executor trait: the query-execution collaborator rowbind runs on top of

use crate::error::Result;
use crate::traits::RowCursor;
use crate::value::Value;
use async_trait::async_trait;

/// Result of a statement execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Number of rows affected by the statement
    pub rows_affected: u64,
    /// Last insert ID (for INSERT statements)
    pub last_insert_id: Option<u64>,
}

/// Something that can run SQL with positional arguments.
///
/// rowbind never opens connections or prepares statements itself; a
/// backend implements this trait and [`Db`](crate::Db) layers mapping and
/// binding on top. The SQL handed to an executor is already rewritten for the
/// dialect selected by [`driver_name`](Executor::driver_name), and no
/// argument is a [`Value::List`].
#[async_trait]
pub trait Executor: Send + Sync {
    /// The cursor type returned by [`query`](Executor::query).
    type Cursor: RowCursor + Send;

    /// Identity of the driver, used to pick the placeholder dialect.
    fn driver_name(&self) -> &str;

    /// Run a row-returning query.
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Self::Cursor>;

    /// Run a statement and report the affected rows.
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult>;
}
