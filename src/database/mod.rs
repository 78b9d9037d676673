// Query executor boundary and its sqlx implementation
pub mod executor;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod testing;

pub use executor::{QueryExecutor, QueryParams, SqlRow, SqlValue};
pub use sqlite::SqliteQueryExecutor;
