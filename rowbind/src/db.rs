//! The caller-facing surface: a `Db` handle over an executor, plus the
//! `Rows` and `Row` cursor wrappers it returns

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bind::{bind_named_with, bind_type, rebind, BindType, NamedArgs};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::expand::{expand_in_with, EmptyListPolicy};
use crate::reflect::{default_mapper, Mapper, NameConvention};
use crate::scan::{self, ScanPlan};
use crate::traits::{ExecuteResult, Executor, FromRow, RowCursor, ScanKind};
use crate::value::Value;

/// An executor together with the mapping and binding settings used for
/// every query run through it.
///
/// Cloning is cheap: clones share the executor and the mapper.
///
/// # Example
///
/// ```ignore
/// use rowbind::{Db, MySqlPool, Record, Value};
///
/// #[derive(Record, Default)]
/// pub struct User {
///     pub id: i64,
///     pub name: String,
/// }
///
/// async fn active(db: &Db<MySqlPool>, ids: Vec<i64>) -> rowbind::Result<Vec<User>> {
///     db.in_select("SELECT id, name FROM users WHERE id IN (?)", vec![Value::list(ids)]).await
/// }
/// ```
pub struct Db<E: Executor> {
    executor: Arc<E>,
    bind_type: BindType,
    mapper: Arc<Mapper>,
    unsafe_columns: bool,
    empty_lists: EmptyListPolicy,
}

impl<E: Executor> Clone for Db<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            bind_type: self.bind_type,
            mapper: Arc::clone(&self.mapper),
            unsafe_columns: self.unsafe_columns,
            empty_lists: self.empty_lists,
        }
    }
}

impl<E: Executor> std::fmt::Debug for Db<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.executor.driver_name())
            .field("bind_type", &self.bind_type)
            .field("mapper", &self.mapper)
            .field("unsafe_columns", &self.unsafe_columns)
            .field("empty_lists", &self.empty_lists)
            .finish()
    }
}

impl<E: Executor> Db<E> {
    /// Wrap an executor using the process-wide default mapper.
    pub fn new(executor: E) -> Self {
        Self::from_arc(Arc::new(executor))
    }

    /// Wrap a shared executor.
    pub fn from_arc(executor: Arc<E>) -> Self {
        let bind_type = bind_type(executor.driver_name());
        Self {
            executor,
            bind_type,
            mapper: default_mapper(),
            unsafe_columns: false,
            empty_lists: EmptyListPolicy::default(),
        }
    }

    /// Wrap an executor with explicit options.
    ///
    /// The handle gets its own mapper for `options.naming`.
    pub fn with_options(executor: E, options: &Options) -> Result<Self> {
        options.validate()?;
        let mut db = Self::new(executor);
        db.mapper = Arc::new(Mapper::new(options.naming));
        db.unsafe_columns = options.unsafe_columns;
        db.empty_lists = options.empty_lists;
        if let Some(bind_type) = options.bind_type() {
            db.bind_type = bind_type;
        }
        debug!(
            "Configured {:?} for driver {} ({:?})",
            db.mapper,
            db.driver_name(),
            db.bind_type
        );
        Ok(db)
    }

    /// The wrapped executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn driver_name(&self) -> &str {
        self.executor.driver_name()
    }

    pub fn bind_type(&self) -> BindType {
        self.bind_type
    }

    pub fn mapper(&self) -> &Arc<Mapper> {
        &self.mapper
    }

    /// Use `mapper` for every query from this handle.
    pub fn with_mapper(mut self, mapper: Arc<Mapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Switch this handle to a fresh mapper using `convention`.
    ///
    /// Other handles, including clones made earlier, keep their mapper.
    pub fn map_names(&mut self, convention: NameConvention) {
        self.mapper = Arc::new(Mapper::new(convention));
    }

    /// A copy of this handle in permissive mode: result columns without a
    /// destination field are silently dropped instead of failing the scan.
    pub fn unsafe_columns(&self) -> Self {
        let mut db = self.clone();
        db.unsafe_columns = true;
        db
    }

    pub fn is_unsafe(&self) -> bool {
        self.unsafe_columns
    }

    /// A copy of this handle with another empty-list policy.
    pub fn with_empty_lists(&self, policy: EmptyListPolicy) -> Self {
        let mut db = self.clone();
        db.empty_lists = policy;
        db
    }

    pub fn empty_lists(&self) -> EmptyListPolicy {
        self.empty_lists
    }

    /// Rewrite `?` placeholders into this connection's dialect.
    pub fn rebind(&self, query: &str) -> String {
        rebind(self.bind_type, query)
    }

    /// Bind `:name` markers from `args` for this connection's dialect.
    pub fn bind_named<A: NamedArgs + ?Sized>(
        &self,
        query: &str,
        args: &A,
    ) -> Result<(String, Vec<Value>)> {
        bind_named_with(self.bind_type, query, args, &self.mapper, self.empty_lists)
    }

    /// Expand list arguments and rebind to this connection's dialect.
    pub fn expand_in(&self, query: &str, args: Vec<Value>) -> Result<(String, Vec<Value>)> {
        let (query, args) = expand_in_with(query, args, self.empty_lists)?;
        Ok((self.rebind(&query), args))
    }

    fn rows(&self, cursor: E::Cursor) -> Rows<E::Cursor> {
        Rows::new(cursor, Arc::clone(&self.mapper), self.unsafe_columns)
    }

    /// Run a query and return its rows. `sql` is passed through unchanged.
    pub async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Rows<E::Cursor>> {
        let cursor = self.executor.query(sql, params).await?;
        Ok(self.rows(cursor))
    }

    /// Run a query expected to return at most one row.
    pub async fn query_row(&self, sql: &str, params: Vec<Value>) -> Result<Row<E::Cursor>> {
        Ok(Row::new(self.query(sql, params).await?))
    }

    /// Run a statement that returns no rows.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
        self.executor.execute(sql, params).await
    }

    /// All rows of a query, decoded into `T`.
    pub async fn select<T: FromRow>(&self, sql: &str, params: Vec<Value>) -> Result<Vec<T>> {
        let mut dest = Vec::new();
        self.select_into(&mut dest, sql, params).await?;
        Ok(dest)
    }

    /// Replace the contents of `dest` with the rows of a query.
    ///
    /// If a row fails to decode, the rows before it remain in `dest`
    /// (best-effort partial result on error).
    pub async fn select_into<T: FromRow>(
        &self,
        dest: &mut Vec<T>,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<()> {
        let mut rows = self.query(sql, params).await?;
        let scanned = rows.scan_all(dest);
        let closed = rows.close();
        scanned?;
        closed
    }

    /// Exactly one row of a query, decoded into `T`; [`Error::NoRows`] when
    /// the query returns nothing. Extra rows are ignored.
    pub async fn get<T: FromRow>(&self, sql: &str, params: Vec<Value>) -> Result<T> {
        self.query_row(sql, params).await?.scan()
    }

    /// Bind `:name` markers from `args`, then run the query.
    pub async fn named_query<A: NamedArgs + ?Sized>(
        &self,
        sql: &str,
        args: &A,
    ) -> Result<Rows<E::Cursor>> {
        let (sql, params) = self.bind_named(sql, args)?;
        self.query(&sql, params).await
    }

    /// Bind `:name` markers from `args`, then run the statement.
    pub async fn named_exec<A: NamedArgs + ?Sized>(
        &self,
        sql: &str,
        args: &A,
    ) -> Result<ExecuteResult> {
        let (sql, params) = self.bind_named(sql, args)?;
        self.execute(&sql, params).await
    }

    /// [`select`](Db::select) after expanding list arguments and rebinding.
    pub async fn in_select<T: FromRow>(&self, sql: &str, params: Vec<Value>) -> Result<Vec<T>> {
        let (sql, params) = self.expand_in(sql, params)?;
        self.select(&sql, params).await
    }

    /// [`get`](Db::get) after expanding list arguments and rebinding.
    pub async fn in_get<T: FromRow>(&self, sql: &str, params: Vec<Value>) -> Result<T> {
        let (sql, params) = self.expand_in(sql, params)?;
        self.get(&sql, params).await
    }

    /// [`execute`](Db::execute) after expanding list arguments and rebinding.
    pub async fn in_exec(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
        let (sql, params) = self.expand_in(sql, params)?;
        self.execute(&sql, params).await
    }
}

/// The rows of a query, read one at a time.
///
/// The cursor is closed when the rows run out, on [`close`](Rows::close), or
/// when the value is dropped.
pub struct Rows<C: RowCursor> {
    cursor: C,
    mapper: Arc<Mapper>,
    unsafe_columns: bool,
    plan: Option<ScanPlan>,
    closed: bool,
}

impl<C: RowCursor> Rows<C> {
    pub fn new(cursor: C, mapper: Arc<Mapper>, unsafe_columns: bool) -> Self {
        Self {
            cursor,
            mapper,
            unsafe_columns,
            plan: None,
            closed: false,
        }
    }

    pub fn columns(&self) -> Result<Vec<String>> {
        self.cursor.columns()
    }

    /// Move to the next row; `false` once the rows are exhausted, at which
    /// point the cursor is released.
    pub fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        match self.cursor.advance() {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.close()?;
                Ok(false)
            }
            Err(e) => {
                let _ = self.close();
                Err(e)
            }
        }
    }

    /// Decode the current row into `T`, scalar or record.
    pub fn scan<T: FromRow>(&mut self) -> Result<T> {
        scan::scan_row(&mut self.cursor, &self.mapper, self.unsafe_columns)
    }

    /// Decode the current row into the record `T`.
    ///
    /// Field resolution and the value buffer are set up on the first call
    /// and reused for later rows. Every call on one `Rows` must use the same
    /// record type; another type fails with [`Error::TypeMismatch`].
    pub fn struct_scan<T: FromRow>(&mut self) -> Result<T> {
        let record = T::record().ok_or_else(|| not_structured::<T>())?;

        if self.plan.is_none() {
            let columns = self.cursor.columns()?;
            let plan = ScanPlan::new::<T>(&columns, &self.mapper, self.unsafe_columns)?;
            if plan.kind() != ScanKind::Structured {
                return Err(not_structured::<T>());
            }
            self.plan = Some(plan);
        }

        let plan = self.plan.as_mut().ok_or(Error::CursorClosed)?;
        if plan.record() != Some(record.type_id) {
            return Err(Error::TypeMismatch(format!(
                "struct_scan into {} on rows already resolved for another type",
                std::any::type_name::<T>()
            )));
        }
        plan.decode(&mut self.cursor)
    }

    /// The current row's values in column order.
    pub fn slice_scan(&mut self) -> Result<Vec<Value>> {
        scan::slice_scan(&mut self.cursor)
    }

    /// The current row keyed by column name.
    pub fn map_scan(&mut self) -> Result<HashMap<String, Value>> {
        scan::map_scan(&mut self.cursor)
    }

    /// Replace `dest` with every remaining row. See [`scan::scan_all`].
    pub fn scan_all<T: FromRow>(&mut self, dest: &mut Vec<T>) -> Result<()> {
        scan::scan_all(&mut self.cursor, dest, &self.mapper, self.unsafe_columns)
    }

    /// Every remaining row decoded into `T`; the cursor is closed afterwards.
    pub fn collect<T: FromRow>(mut self) -> Result<Vec<T>> {
        let mut dest = Vec::new();
        let scanned = self.scan_all(&mut dest);
        let closed = self.close();
        scanned?;
        closed?;
        Ok(dest)
    }

    /// Release the cursor. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.plan = None;
        self.cursor.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<C: RowCursor> Drop for Rows<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close rows: {}", e);
        }
    }
}

fn not_structured<T>() -> Error {
    Error::TypeMismatch(format!(
        "{} is scanned directly; struct_scan needs a record with mappable fields",
        std::any::type_name::<T>()
    ))
}

/// A query result of which only the first row is used.
///
/// Each scan method consumes the row and releases the cursor whatever the
/// outcome. A result with no rows fails with [`Error::NoRows`].
pub struct Row<C: RowCursor> {
    rows: Rows<C>,
}

impl<C: RowCursor> Row<C> {
    pub fn new(rows: Rows<C>) -> Self {
        Self { rows }
    }

    pub fn columns(&self) -> Result<Vec<String>> {
        self.rows.columns()
    }

    fn first<R>(mut self, read: impl FnOnce(&mut Rows<C>) -> Result<R>) -> Result<R> {
        let result = match self.rows.advance() {
            Ok(true) => read(&mut self.rows),
            Ok(false) => Err(Error::NoRows),
            Err(e) => Err(e),
        };
        let closed = self.rows.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Decode the row into `T`, scalar or record.
    pub fn scan<T: FromRow>(self) -> Result<T> {
        self.first(|rows| rows.scan())
    }

    /// Decode the row into the record `T`; scalars are rejected.
    pub fn struct_scan<T: FromRow>(self) -> Result<T> {
        self.first(|rows| rows.struct_scan())
    }

    pub fn slice_scan(self) -> Result<Vec<Value>> {
        self.first(|rows| rows.slice_scan())
    }

    pub fn map_scan(self) -> Result<HashMap<String, Value>> {
        self.first(|rows| rows.map_scan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BufferedRows;
    use crate::Record;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackedCursor {
        inner: BufferedRows,
        open: Arc<AtomicUsize>,
        released: bool,
    }

    impl RowCursor for TrackedCursor {
        fn columns(&self) -> Result<Vec<String>> {
            self.inner.columns()
        }
        fn advance(&mut self) -> Result<bool> {
            self.inner.advance()
        }
        fn scan(&mut self, slots: &mut [Value]) -> Result<()> {
            self.inner.scan(slots)
        }
        fn close(&mut self) -> Result<()> {
            if !self.released {
                self.released = true;
                self.open.fetch_sub(1, Ordering::SeqCst);
            }
            self.inner.close()
        }
    }

    struct FakeExecutor {
        driver: &'static str,
        columns: Vec<&'static str>,
        rows: Vec<Vec<Value>>,
        open: Arc<AtomicUsize>,
        seen: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl FakeExecutor {
        fn new(driver: &'static str, columns: Vec<&'static str>, rows: Vec<Vec<Value>>) -> Self {
            Self {
                driver,
                columns,
                rows,
                open: Arc::new(AtomicUsize::new(0)),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last(&self) -> (String, Vec<Value>) {
            self.seen.lock().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Executor for FakeExecutor {
        type Cursor = TrackedCursor;

        fn driver_name(&self) -> &str {
            self.driver
        }

        async fn query(&self, sql: &str, params: Vec<Value>) -> Result<TrackedCursor> {
            self.seen.lock().push((sql.to_string(), params));
            self.open.fetch_add(1, Ordering::SeqCst);
            Ok(TrackedCursor {
                inner: BufferedRows::new(self.columns.iter().copied(), self.rows.clone())?,
                open: Arc::clone(&self.open),
                released: false,
            })
        }

        async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
            let affected = params.len() as u64;
            self.seen.lock().push((sql.to_string(), params));
            Ok(ExecuteResult {
                rows_affected: affected,
                last_insert_id: None,
            })
        }
    }

    #[derive(Record, Default, Debug, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    #[derive(Record, Default, Debug)]
    struct Tag {
        label: String,
    }

    fn users() -> FakeExecutor {
        FakeExecutor::new(
            "postgres",
            vec!["id", "name"],
            vec![
                vec![Value::I64(1), Value::from("ann")],
                vec![Value::I64(2), Value::from("bob")],
            ],
        )
    }

    #[tokio::test]
    async fn test_select_and_release() {
        let db = Db::new(users());
        let all: Vec<User> = db.select("SELECT id, name FROM users", vec![]).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].name, "bob");
        assert_eq!(db.executor().open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_no_rows_releases_cursor() {
        let db = Db::new(FakeExecutor::new("postgres", vec!["id", "name"], vec![]));
        let err = db.get::<User>("SELECT id, name FROM users", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::NoRows));
        assert_eq!(db.executor().open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_failure_releases_cursor() {
        let db = Db::new(users());
        let err = db.get::<i64>("SELECT id, name FROM users", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::ScalarColumnCount { columns: 2, .. }));
        assert_eq!(db.executor().open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_field_and_unsafe() {
        let db = Db::new(users());
        let err = db.select::<Tag>("SELECT * FROM users", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::MissingField { ref column, .. } if column == "id"));

        let permissive = db.unsafe_columns();
        assert!(permissive.is_unsafe());
        assert!(!db.is_unsafe());
        let tags: Vec<Tag> = permissive.select("SELECT * FROM users", vec![]).await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].label, "");
        assert_eq!(db.executor().open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_named_exec_rebinds_for_driver() {
        let db = Db::new(users());
        let user = User {
            id: 5,
            name: "cy".into(),
        };
        db.named_exec("UPDATE users SET name = :name WHERE id = :id", &user)
            .await
            .unwrap();
        let (sql, params) = db.executor().last();
        assert_eq!(sql, "UPDATE users SET name = $1 WHERE id = $2");
        assert_eq!(params, vec![Value::from("cy"), Value::I64(5)]);
    }

    #[tokio::test]
    async fn test_in_select_expands_and_rebinds() {
        let db = Db::new(users());
        let _: Vec<User> = db
            .in_select(
                "SELECT id, name FROM users WHERE id IN (?) AND name <> ?",
                vec![Value::list([1i64, 2]), Value::from("x")],
            )
            .await
            .unwrap();
        let (sql, params) = db.executor().last();
        assert_eq!(sql, "SELECT id, name FROM users WHERE id IN ($1, $2) AND name <> $3");
        assert_eq!(params.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_list_policy_per_handle() {
        let db = Db::new(users());
        let err = db
            .in_exec("DELETE FROM users WHERE id IN (?)", vec![Value::List(vec![])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let lenient = db.with_empty_lists(EmptyListPolicy::Null);
        lenient
            .in_exec("DELETE FROM users WHERE id IN (?)", vec![Value::List(vec![])])
            .await
            .unwrap();
        assert_eq!(db.executor().last().0, "DELETE FROM users WHERE id IN (NULL)");
    }

    #[tokio::test]
    async fn test_struct_scan_reuses_plan() {
        let db = Db::new(users());
        let mut rows = db.query("SELECT id, name FROM users", vec![]).await.unwrap();
        let mut seen = Vec::new();
        while rows.advance().unwrap() {
            let user: User = rows.struct_scan().unwrap();
            seen.push(user.id);
        }
        assert_eq!(seen, vec![1, 2]);
        assert!(rows.is_closed());
        assert_eq!(db.executor().open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_struct_scan_rejects_scalars_and_type_switch() {
        let db = Db::new(users());
        let mut rows = db.query("SELECT id, name FROM users", vec![]).await.unwrap();
        assert!(rows.advance().unwrap());
        assert!(matches!(
            rows.struct_scan::<i64>(),
            Err(Error::TypeMismatch(_))
        ));
        let _: User = rows.struct_scan().unwrap();
        assert!(rows.advance().unwrap());
        assert!(matches!(
            rows.struct_scan::<Tag>(),
            Err(Error::TypeMismatch(_))
        ));
        drop(rows);
        assert_eq!(db.executor().open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_row_scan_variants() {
        let db = Db::new(users());
        let row = db.query_row("SELECT id, name FROM users", vec![]).await.unwrap();
        assert_eq!(row.columns().unwrap(), vec!["id", "name"]);
        let values = row.slice_scan().unwrap();
        assert_eq!(values, vec![Value::I64(1), Value::from("ann")]);

        let map = db
            .query_row("SELECT id, name FROM users", vec![])
            .await
            .unwrap()
            .map_scan()
            .unwrap();
        assert_eq!(map["name"], Value::from("ann"));

        let user: User = db
            .query_row("SELECT id, name FROM users", vec![])
            .await
            .unwrap()
            .struct_scan()
            .unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(db.executor().open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_map_names_uses_new_convention() {
        fn prefixed(ident: &str) -> String {
            format!("u_{}", ident)
        }
        let mut db = Db::new(FakeExecutor::new(
            "mysql",
            vec!["u_id", "u_name"],
            vec![vec![Value::I64(9), Value::from("zed")]],
        ));
        assert!(db.get::<User>("SELECT 1", vec![]).await.is_err());
        db.map_names(NameConvention::Custom(prefixed));
        let user: User = db.get("SELECT 1", vec![]).await.unwrap();
        assert_eq!(user.name, "zed");
    }

    #[tokio::test]
    async fn test_with_options() {
        let options = Options {
            unsafe_columns: true,
            driver: Some("sqlserver".into()),
            ..Default::default()
        };
        let db = Db::with_options(users(), &options).unwrap();
        assert!(db.is_unsafe());
        assert_eq!(db.bind_type(), BindType::At);
        assert_eq!(db.rebind("a = ? AND b = ?"), "a = @p1 AND b = @p2");
    }
}
