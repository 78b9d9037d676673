use async_trait::async_trait;
use regex::Regex;
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::sync::OnceLock;

use crate::database::executor::{QueryExecutor, QueryParams, SqlRow, SqlValue};
use crate::errors::{DbError, DbResult};

fn named_param_regex() -> &'static Regex {
    static NAMED_PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
    NAMED_PARAM_REGEX.get_or_init(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").unwrap())
}

/// Rewrite `@name` placeholders to positional `?` and return the names in
/// binding order. A name used twice is bound twice.
pub fn rewrite_named_params(sql: &str) -> (String, Vec<String>) {
    let mut names = Vec::new();
    let rewritten = named_param_regex().replace_all(sql, |caps: &regex::Captures| {
        names.push(caps[1].to_string());
        "?".to_string()
    });
    (rewritten.into_owned(), names)
}

/// sqlx-backed query executor over a SQLite pool
pub struct SqliteQueryExecutor {
    pool: SqlitePool,
}

impl SqliteQueryExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn bind_all<'q>(
        mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
        names: &[String],
        params: &QueryParams,
    ) -> DbResult<sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>> {
        for name in names {
            let value = params
                .get(name)
                .ok_or_else(|| DbError::Query(format!("Missing value for parameter @{}", name)))?;
            query = match value.clone() {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Int(i) => query.bind(i),
                SqlValue::Float(f) => query.bind(f),
                SqlValue::Text(s) => query.bind(s),
                SqlValue::Bool(b) => query.bind(b),
            };
        }
        Ok(query)
    }
}

fn convert_row(row: &SqliteRow) -> DbResult<SqlRow> {
    let mut out = SqlRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            out.push(column.name(), SqlValue::Null);
            continue;
        }
        let kind = raw.type_info().name().to_string();
        let decode_err = |e: sqlx::Error| DbError::Decode {
            column: column.name().to_string(),
            reason: e.to_string(),
        };
        let value = match kind.as_str() {
            "INTEGER" => SqlValue::Int(row.try_get_unchecked::<i64, _>(idx).map_err(decode_err)?),
            "REAL" => SqlValue::Float(row.try_get_unchecked::<f64, _>(idx).map_err(decode_err)?),
            "BOOLEAN" => SqlValue::Bool(row.try_get_unchecked::<bool, _>(idx).map_err(decode_err)?),
            "BLOB" => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx).map_err(decode_err)?;
                SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => SqlValue::Text(row.try_get_unchecked::<String, _>(idx).map_err(decode_err)?),
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

#[async_trait]
impl QueryExecutor for SqliteQueryExecutor {
    async fn execute_query(&self, sql: &str, params: &QueryParams) -> DbResult<Vec<SqlRow>> {
        let (rewritten, names) = rewrite_named_params(sql);
        let query = Self::bind_all(sqlx::query(&rewritten), &names, params)?;
        let rows = query.fetch_all(&self.pool).await?;
        log::debug!("query returned {} rows", rows.len());
        rows.iter().map(convert_row).collect()
    }

    async fn execute_scalar(&self, sql: &str, params: &QueryParams) -> DbResult<SqlValue> {
        let rows = self.execute_query(sql, params).await?;
        Ok(rows
            .first()
            .and_then(|row| row.first().cloned())
            .unwrap_or(SqlValue::Null))
    }

    async fn test_connection(&self) -> (bool, String) {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => (true, "Connection successful".to_string()),
            Err(e) => {
                let err = DbError::from(e);
                log::warn!("connection test failed: {}", err);
                (false, err.describe())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConnectionFailure;

    async fn memory_executor() -> SqliteQueryExecutor {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteQueryExecutor::new(pool)
    }

    #[test]
    fn rewrites_named_placeholders_in_order() {
        let (sql, names) = rewrite_named_params("SELECT * FROM t WHERE a = @chain AND b = @id OR c = @chain");
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b = ? OR c = ?");
        assert_eq!(names, vec!["chain", "id", "chain"]);
    }

    #[tokio::test]
    async fn executes_parameterised_queries() {
        let exec = memory_executor().await;
        sqlx::query("CREATE TABLE accounts (pid TEXT, chain TEXT, qty INTEGER, price REAL)")
            .execute(exec.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO accounts VALUES ('100200', 'WMT', 4, 1.5), ('300400', 'CPH', NULL, 2.0)")
            .execute(exec.pool())
            .await
            .unwrap();

        let rows = exec
            .execute_query(
                "SELECT pid, qty, price FROM accounts WHERE chain = @chain",
                &QueryParams::new().with("chain", "WMT"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_text("PID").as_deref(), Some("100200"));
        assert_eq!(rows[0].get("qty"), Some(&SqlValue::Int(4)));
        assert_eq!(rows[0].get("price"), Some(&SqlValue::Float(1.5)));

        let count = exec
            .execute_scalar("SELECT COUNT(*) FROM accounts WHERE qty IS NULL", &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(count.as_i64(), Some(1));
    }

    #[tokio::test]
    async fn missing_parameter_is_a_query_error() {
        let exec = memory_executor().await;
        let err = exec
            .execute_query("SELECT @missing", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
    }

    #[tokio::test]
    async fn scalar_on_empty_result_is_null() {
        let exec = memory_executor().await;
        let value = exec
            .execute_scalar("SELECT 1 WHERE 1 = 0", &QueryParams::new())
            .await
            .unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn unopenable_database_is_classified_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("missing").join("ref.db").display());
        let err = match SqliteQueryExecutor::connect(&url).await {
            Ok(_) => panic!("connect should fail for {}", url),
            Err(e) => e,
        };
        assert!(matches!(err, DbError::Sqlx(_)), "{:?}", err);
        assert_eq!(err.failure(), ConnectionFailure::InvalidDatabase);
        assert_eq!(err.describe(), "Invalid database");
    }

    #[tokio::test]
    async fn connection_test_reports_success() {
        let exec = memory_executor().await;
        let (ok, message) = exec.test_connection().await;
        assert!(ok);
        assert_eq!(message, "Connection successful");
    }
}
