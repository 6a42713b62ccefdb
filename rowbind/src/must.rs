//! Panicking shortcuts for statements that are not expected to fail
//! (schema setup, fixtures). Import [`MustExt`] to opt in.

use async_trait::async_trait;

use crate::db::Db;
use crate::traits::{ExecuteResult, Executor};
use crate::value::Value;

#[async_trait]
pub trait MustExt {
    /// [`Db::execute`], panicking on error.
    async fn must_execute(&self, sql: &str, params: Vec<Value>) -> ExecuteResult;

    /// [`Db::in_exec`], panicking on error.
    async fn must_in_execute(&self, sql: &str, params: Vec<Value>) -> ExecuteResult;
}

#[async_trait]
impl<E: Executor> MustExt for Db<E> {
    async fn must_execute(&self, sql: &str, params: Vec<Value>) -> ExecuteResult {
        match self.execute(sql, params).await {
            Ok(result) => result,
            Err(e) => panic!("statement failed: {}: {}", sql, e),
        }
    }

    async fn must_in_execute(&self, sql: &str, params: Vec<Value>) -> ExecuteResult {
        match self.in_exec(sql, params).await {
            Ok(result) => result,
            Err(e) => panic!("statement failed: {}: {}", sql, e),
        }
    }
}
