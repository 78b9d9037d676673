//! Scripted in-memory executor for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::database::executor::{QueryExecutor, QueryParams, SqlRow, SqlValue};
use crate::errors::{DbError, DbResult};

enum Reply {
    Rows(Vec<SqlRow>),
    Fail(i64),
}

/// Answers queries by matching a substring of the query text. Unmatched
/// queries return no rows. Every call is recorded.
pub struct ScriptedExecutor {
    replies: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on(self, needle: &str, rows: Vec<SqlRow>) -> Self {
        self.replies.lock().unwrap().push((needle.to_string(), Reply::Rows(rows)));
        self
    }

    pub fn on_values(self, needle: &str, column: &str, values: &[&str]) -> Self {
        let rows = values.iter().map(|v| SqlRow::new().with(column, *v)).collect();
        self.on(needle, rows)
    }

    pub fn failing(self, needle: &str, code: i64) -> Self {
        self.replies.lock().unwrap().push((needle.to_string(), Reply::Fail(code)));
        self
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|sql| sql.contains(needle)).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn answer(&self, sql: &str) -> DbResult<Vec<SqlRow>> {
        self.calls.lock().unwrap().push(sql.to_string());
        let replies = self.replies.lock().unwrap();
        match replies.iter().find(|(needle, _)| sql.contains(needle.as_str())) {
            Some((_, Reply::Rows(rows))) => Ok(rows.clone()),
            Some((_, Reply::Fail(code))) => Err(DbError::Provider {
                code: *code,
                message: "scripted failure".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute_query(&self, sql: &str, _params: &QueryParams) -> DbResult<Vec<SqlRow>> {
        self.answer(sql)
    }

    async fn execute_scalar(&self, sql: &str, params: &QueryParams) -> DbResult<SqlValue> {
        let rows = self.execute_query(sql, params).await?;
        Ok(rows.first().and_then(|r| r.first().cloned()).unwrap_or(SqlValue::Null))
    }

    async fn test_connection(&self) -> (bool, String) {
        (true, "Connection successful".to_string())
    }
}
