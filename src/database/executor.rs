use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DbResult;

/// A single value read from or bound to the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Textual rendering of the value, `None` for NULL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Bool(b) => Some(if *b { "1".to_string() } else { "0".to_string() }),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Float(f) => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Bool(b) => Some(*b as i64),
            SqlValue::Null => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One result row. Column order is preserved; lookups by name ignore case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: &str, value: impl Into<SqlValue>) {
        self.columns.push((column.to_string(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Non-null, non-blank text of a column.
    pub fn get_text(&self, column: &str) -> Option<String> {
        self.get(column)
            .and_then(SqlValue::as_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn first(&self) -> Option<&SqlValue> {
        self.columns.first().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Named query parameters, referenced in query text as `@name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    values: Vec<(String, SqlValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        let name = name.trim_start_matches('@').to_string();
        match self.values.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value.into(),
            None => self.values.push((name, value.into())),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        let name = name.trim_start_matches('@');
        self.values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Boundary to the relational reference store. Each call owns its own
/// connection checkout; failures come back as `DbError` with the provider
/// detail intact.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute_query(&self, sql: &str, params: &QueryParams) -> DbResult<Vec<SqlRow>>;

    /// First column of the first row, `SqlValue::Null` when there are no rows.
    async fn execute_scalar(&self, sql: &str, params: &QueryParams) -> DbResult<SqlValue>;

    /// Probe the store. Never fails; the message is suitable for display.
    async fn test_connection(&self) -> (bool, String);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_ignores_case_and_blank_text() {
        let row = SqlRow::new()
            .with("AccountNumber", "  445566 ")
            .with("HID", "")
            .with("Cnt", 3i64);
        assert_eq!(row.get_text("accountnumber").as_deref(), Some("445566"));
        assert_eq!(row.get_text("hid"), None);
        assert_eq!(row.get("CNT").and_then(SqlValue::as_i64), Some(3));
        assert_eq!(row.first(), Some(&SqlValue::Text("  445566 ".into())));
    }

    #[test]
    fn params_replace_duplicate_names() {
        let params = QueryParams::new().with("@chain", "WMT").with("chain", "CPH");
        assert_eq!(params.get("chain"), Some(&SqlValue::Text("CPH".into())));
        assert_eq!(params.get("@CHAIN"), Some(&SqlValue::Text("CPH".into())));
    }

    #[test]
    fn option_values_become_null() {
        let v: SqlValue = Option::<String>::None.into();
        assert!(v.is_null());
        assert_eq!(SqlValue::Text(" 12 ".into()).as_i64(), Some(12));
    }
}
