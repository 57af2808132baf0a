use {
    super::{BoxFuture, Database, ExecResult, Transaction},
    crate::{
        error::DatabaseError,
        types::{Row, Value},
    },
    std::{
        fmt,
        sync::{
            atomic::{AtomicU64, AtomicUsize, Ordering},
            Mutex,
        },
    },
};

type Handler = Box<dyn Fn(&str, &[Value]) -> Result<Vec<Row>, DatabaseError> + Send + Sync>;

/// Records statements and answers queries through a closure.
#[derive(Default)]
pub(crate) struct MockDatabase {
    handler: Option<Handler>,
    queries: Mutex<Vec<(String, Vec<Value>)>>,
    executions: Mutex<Vec<(String, Vec<Value>)>>,
    last_insert_id: AtomicU64,
    fail_exec: bool,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

impl fmt::Debug for MockDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDatabase")
            .field("queries", &self.queries)
            .field("executions", &self.executions)
            .finish()
    }
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows<F>(handler: F) -> Self
    where
        F: Fn(&str, &[Value]) -> Vec<Row> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Box::new(move |sql, args| Ok(handler(sql, args)))),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            handler: Some(Box::new(|_, _| Err(DatabaseError::msg("connection refused")))),
            fail_exec: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<(String, Vec<Value>)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn executions(&self) -> Vec<(String, Vec<Value>)> {
        self.executions.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len() + self.executions.lock().unwrap().len()
    }
}

impl Database for MockDatabase {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, DatabaseError>> {
        Box::pin(async move {
            self.queries
                .lock()
                .unwrap()
                .push((sql.to_owned(), args.to_vec()));
            match &self.handler {
                Some(handler) => handler(sql, args),
                None => Ok(Vec::new()),
            }
        })
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult, DatabaseError>> {
        Box::pin(async move {
            self.executions
                .lock()
                .unwrap()
                .push((sql.to_owned(), args.to_vec()));
            if self.fail_exec {
                return Err(DatabaseError::msg("read-only"));
            }
            Ok(ExecResult {
                last_insert_id: self.last_insert_id.fetch_add(1, Ordering::SeqCst) + 1,
                rows_affected: 1,
            })
        })
    }

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction<'_> + '_>, DatabaseError>> {
        Box::pin(async move { Ok(Box::new(MockTransaction { db: self }) as Box<dyn Transaction<'_>>) })
    }
}

struct MockTransaction<'t> {
    db: &'t MockDatabase,
}

impl<'t> Transaction<'t> for MockTransaction<'t> {
    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecResult, DatabaseError>> {
        self.db.execute(sql, args)
    }

    fn commit(self: Box<Self>) -> BoxFuture<'t, Result<(), DatabaseError>> {
        Box::pin(async move {
            self.db.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'t, Result<(), DatabaseError>> {
        Box::pin(async move {
            self.db.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use {
        super::MockDatabase,
        crate::{database::exec, types::Value},
        std::sync::atomic::Ordering,
    };

    #[tokio::test]
    async fn exec_commits() {
        let db = MockDatabase::new();
        let result = exec(&db, "update `t` set `a` = ?", &[Value::Int(1)])
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(db.commits.load(Ordering::SeqCst), 1);
        assert_eq!(db.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exec_rolls_back() {
        let db = MockDatabase::failing();
        assert!(exec(&db, "delete from `t`", &[]).await.is_err());
        assert_eq!(db.commits.load(Ordering::SeqCst), 0);
        assert_eq!(db.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(db.executions().len(), 1);
    }
}
