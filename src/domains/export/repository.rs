use async_trait::async_trait;
use std::sync::Arc;

use crate::database::{QueryExecutor, QueryParams, SqlRow};
use crate::errors::DbResult;

const OUTBOUND_ROWS_SQL: &str = "
    SELECT *
    FROM OutboundFile
    WHERE RequestExecutionID = @RequestExecutionID
    ORDER BY datecreated DESC
    LIMIT @Limit";

/// Previously produced outbound rows for an execution id
#[async_trait]
pub trait OutboundRepository: Send + Sync {
    /// Most recent rows first, at most `limit`.
    async fn fetch_rows(&self, execution_id: &str, limit: u32) -> DbResult<Vec<SqlRow>>;
}

pub struct SqlOutboundRepository {
    executor: Arc<dyn QueryExecutor>,
}

impl SqlOutboundRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl OutboundRepository for SqlOutboundRepository {
    async fn fetch_rows(&self, execution_id: &str, limit: u32) -> DbResult<Vec<SqlRow>> {
        let params = QueryParams::new()
            .with("RequestExecutionID", execution_id)
            .with("Limit", limit as i64);
        let rows = self.executor.execute_query(OUTBOUND_ROWS_SQL, &params).await?;
        log::info!("fetched {} outbound rows for {}", rows.len(), execution_id);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::reference::repository::tests::reference_executor;

    #[tokio::test]
    async fn fetches_most_recent_first() {
        let repo = SqlOutboundRepository::new(reference_executor().await);
        let rows = repo.fetch_rows("REQ-0001", 100).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_text("PID").as_deref(), Some("100300"));
        assert_eq!(rows[1].get_text("Account_Number").as_deref(), Some("445566"));

        let limited = repo.fetch_rows("REQ-0001", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert!(repo.fetch_rows("REQ-0404", 100).await.unwrap().is_empty());
    }
}
