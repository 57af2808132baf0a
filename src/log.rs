use {
    crate::types::Value,
    std::{fmt, time::Instant},
};

/// One database round trip, logged when it finishes.
pub(crate) struct OpLog<'a> {
    op: &'static str,
    table: &'a str,
    sql: &'a str,
    args: &'a [Value],
    start: Instant,
}

impl<'a> OpLog<'a> {
    pub fn start(op: &'static str, table: &'a str, sql: &'a str, args: &'a [Value]) -> Self {
        Self {
            op,
            table,
            sql,
            args,
            start: Instant::now(),
        }
    }

    pub fn finish<T, E: fmt::Display>(self, result: &Result<T, E>) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(_) => tracing::debug!(
                op = self.op,
                table = self.table,
                sql = self.sql,
                args = ?self.args,
                elapsed_ms,
                "statement executed"
            ),
            Err(error) => tracing::error!(
                op = self.op,
                table = self.table,
                sql = self.sql,
                args = ?self.args,
                elapsed_ms,
                %error,
                "statement failed"
            ),
        }
    }
}
