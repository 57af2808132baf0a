//! Seams to the database driver, and the registry of named connections.

mod registry;

#[cfg(test)]
pub(crate) mod mock;

use {
    crate::{
        error::DatabaseError,
        types::{Row, Value},
    },
    std::{fmt, future::Future, pin::Pin},
};

pub use registry::{Config, Connection, Connector, Registry};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub last_insert_id: u64,
    pub rows_affected: u64,
}

/// A driver or pool able to run positional (`?`) statements.
pub trait Database: fmt::Debug + Send + Sync {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, DatabaseError>>;

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult, DatabaseError>>;

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction<'_> + '_>, DatabaseError>>;
}

/// Open transaction. Dropping it without [`commit`](Self::commit) is up to the driver.
pub trait Transaction<'t>: Send {
    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult, DatabaseError>>;

    fn commit(self: Box<Self>) -> BoxFuture<'t, Result<(), DatabaseError>>;

    fn rollback(self: Box<Self>) -> BoxFuture<'t, Result<(), DatabaseError>>;
}

/// Runs one statement inside its own transaction, rolling back on failure.
pub async fn exec(
    db: &dyn Database,
    sql: &str,
    args: &[Value],
) -> Result<ExecResult, DatabaseError> {
    let mut tx = db.begin().await?;
    match tx.execute(sql, args).await {
        Ok(result) => {
            tx.commit().await?;
            Ok(result)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(%sql, error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}
