use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::database::{QueryExecutor, QueryParams, SqlRow};
use crate::errors::DbResult;

use super::types::{BillingCodes, DrugStatus};

const PHARMACY_IDS_SQL: &str = "
    SELECT pa.PID
    FROM PharmacyAccounts pa
    INNER JOIN Pharmacy p ON p.VID = pa.VID
    INNER JOIN ChainStoreGroupAssignments csga ON csga.ChainID = p.ChainID
    INNER JOIN ChainStoreGroups csg ON csg.CSGID = csga.CSGID
    WHERE csg.ChainFileAbbrev = @ChainAbbrev";

const SECONDARY_IDS_SQL: &str = "
    SELECT DISTINCT p.HID
    FROM Pharmacy p
    INNER JOIN ChainStoreGroupAssignments csga ON csga.ChainID = p.ChainID
    INNER JOIN ChainStoreGroups csg ON csg.CSGID = csga.CSGID
    WHERE csg.ChainFileAbbrev = @ChainAbbrev
    AND p.HID IS NOT NULL";

const DRUG_CODES_SQL: &str = "
    SELECT DISTINCT a.NDC
    FROM Accumulations a
    WHERE a.AccountType = '340B'
    AND a.NDC IS NOT NULL";

const UNITS_OF_MEASURE_SQL: &str = "
    SELECT DISTINCT u.UOM
    FROM UnitsOfMeasure u
    WHERE u.UOM IS NOT NULL";

const DRUG_STATUS_SQL: &str = "
    SELECT CASE
        WHEN n.IsDiscontinued = 1 THEN 'D'
        WHEN n.IsActive = 1 THEN 'A'
        ELSE 'I'
    END AS Status
    FROM NDCMaster n
    WHERE n.NDCCode = @NDC
    LIMIT 1";

const BILLING_CODES_SQL: &str = "
    SELECT b.CreditRequestType, b.DebitRequestType
    FROM NDCBilling b
    WHERE b.NDC = @NDC
    LIMIT 1";

const EXECUTION_ID_COUNT_SQL: &str = "
    SELECT COUNT(*) AS Count
    FROM OutboundFile
    WHERE RequestExecutionID = @RequestExecutionID";

const FIRST_ACCOUNT_NUMBER_SQL: &str = "
    SELECT p.AccountNumber
    FROM Pharmacy p
    INNER JOIN ChainStoreGroupAssignments csga ON csga.ChainID = p.ChainID
    INNER JOIN ChainStoreGroups csg ON csg.CSGID = csga.CSGID
    WHERE csg.ChainFileAbbrev = @ChainAbbrev
    AND p.AccountNumber IS NOT NULL
    LIMIT 1";

const FIRST_SECONDARY_ID_SQL: &str = "
    SELECT p.HID
    FROM Pharmacy p
    INNER JOIN ChainStoreGroupAssignments csga ON csga.ChainID = p.ChainID
    INNER JOIN ChainStoreGroups csg ON csg.CSGID = csga.CSGID
    WHERE csg.ChainFileAbbrev = @ChainAbbrev
    AND p.HID IS NOT NULL
    LIMIT 1";

const FIRST_UNIT_OF_MEASURE_SQL: &str = "
    SELECT u.UOM
    FROM UnitsOfMeasure u
    WHERE u.UOM IS NOT NULL
    ORDER BY u.UOM
    LIMIT 1";

/// Loaders for each reference data category
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn load_pharmacy_ids(&self, chain_code: &str) -> DbResult<HashSet<String>>;
    async fn load_secondary_ids(&self, chain_code: &str) -> DbResult<HashSet<String>>;
    async fn load_drug_codes(&self) -> DbResult<HashSet<String>>;
    async fn load_units_of_measure(&self) -> DbResult<HashSet<String>>;
    async fn drug_status(&self, ndc: &str) -> DbResult<DrugStatus>;
    /// `None` when the drug code has no billing row.
    async fn billing_codes(&self, ndc: &str) -> DbResult<Option<BillingCodes>>;
    async fn execution_id_count(&self, execution_id: &str) -> DbResult<i64>;
    async fn first_account_number(&self, chain_code: &str) -> DbResult<Option<String>>;
    async fn first_secondary_id(&self, chain_code: &str) -> DbResult<Option<String>>;
    async fn first_unit_of_measure(&self) -> DbResult<Option<String>>;
}

/// Reference repository issuing SQL through a `QueryExecutor`
pub struct SqlReferenceRepository {
    executor: Arc<dyn QueryExecutor>,
}

impl SqlReferenceRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    fn chain_params(chain_code: &str) -> QueryParams {
        QueryParams::new().with("ChainAbbrev", chain_code)
    }

    async fn load_column(&self, sql: &str, params: &QueryParams, column: &str) -> DbResult<HashSet<String>> {
        let rows = self.executor.execute_query(sql, params).await?;
        Ok(collect_column(&rows, column))
    }

    async fn first_text(&self, sql: &str, params: &QueryParams) -> DbResult<Option<String>> {
        let value = self.executor.execute_scalar(sql, params).await?;
        Ok(value.as_text().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }
}

fn collect_column(rows: &[SqlRow], column: &str) -> HashSet<String> {
    rows.iter().filter_map(|row| row.get_text(column)).collect()
}

#[async_trait]
impl ReferenceRepository for SqlReferenceRepository {
    async fn load_pharmacy_ids(&self, chain_code: &str) -> DbResult<HashSet<String>> {
        self.load_column(PHARMACY_IDS_SQL, &Self::chain_params(chain_code), "PID").await
    }

    async fn load_secondary_ids(&self, chain_code: &str) -> DbResult<HashSet<String>> {
        self.load_column(SECONDARY_IDS_SQL, &Self::chain_params(chain_code), "HID").await
    }

    async fn load_drug_codes(&self) -> DbResult<HashSet<String>> {
        let rows = self.executor.execute_query(DRUG_CODES_SQL, &QueryParams::new()).await?;
        // stored codes may carry separators
        Ok(collect_column(&rows, "NDC")
            .into_iter()
            .map(|ndc| crate::validation::normalize_ndc(&ndc))
            .collect())
    }

    async fn load_units_of_measure(&self) -> DbResult<HashSet<String>> {
        let rows = self.executor.execute_query(UNITS_OF_MEASURE_SQL, &QueryParams::new()).await?;
        Ok(collect_column(&rows, "UOM").into_iter().map(|u| u.to_uppercase()).collect())
    }

    async fn drug_status(&self, ndc: &str) -> DbResult<DrugStatus> {
        let params = QueryParams::new().with("NDC", ndc);
        Ok(self
            .first_text(DRUG_STATUS_SQL, &params)
            .await?
            .map(|code| DrugStatus::from_code(&code))
            .unwrap_or(DrugStatus::Unknown))
    }

    async fn billing_codes(&self, ndc: &str) -> DbResult<Option<BillingCodes>> {
        let params = QueryParams::new().with("NDC", ndc);
        let rows = self.executor.execute_query(BILLING_CODES_SQL, &params).await?;
        Ok(rows.first().and_then(|row| {
            match (row.get_text("CreditRequestType"), row.get_text("DebitRequestType")) {
                (Some(credit), Some(debit)) => Some(BillingCodes::new(&credit, &debit)),
                _ => None,
            }
        }))
    }

    async fn execution_id_count(&self, execution_id: &str) -> DbResult<i64> {
        let params = QueryParams::new().with("RequestExecutionID", execution_id);
        let value = self.executor.execute_scalar(EXECUTION_ID_COUNT_SQL, &params).await?;
        Ok(value.as_i64().unwrap_or(0))
    }

    async fn first_account_number(&self, chain_code: &str) -> DbResult<Option<String>> {
        self.first_text(FIRST_ACCOUNT_NUMBER_SQL, &Self::chain_params(chain_code)).await
    }

    async fn first_secondary_id(&self, chain_code: &str) -> DbResult<Option<String>> {
        self.first_text(FIRST_SECONDARY_ID_SQL, &Self::chain_params(chain_code)).await
    }

    async fn first_unit_of_measure(&self) -> DbResult<Option<String>> {
        Ok(self
            .first_text(FIRST_UNIT_OF_MEASURE_SQL, &QueryParams::new())
            .await?
            .map(|u| u.to_uppercase()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::SqliteQueryExecutor;
    use sqlx::sqlite::SqlitePoolOptions;

    pub(crate) const REFERENCE_SCHEMA: &[&str] = &[
        "CREATE TABLE ChainStoreGroups (CSGID INTEGER PRIMARY KEY, ChainFileAbbrev TEXT)",
        "CREATE TABLE ChainStoreGroupAssignments (CSGID INTEGER, ChainID INTEGER)",
        "CREATE TABLE Pharmacy (VID INTEGER PRIMARY KEY, ChainID INTEGER, HID TEXT, AccountNumber TEXT)",
        "CREATE TABLE PharmacyAccounts (VID INTEGER, PID TEXT)",
        "CREATE TABLE Accumulations (NDC TEXT, AccountType TEXT)",
        "CREATE TABLE UnitsOfMeasure (UOM TEXT)",
        "CREATE TABLE NDCMaster (NDCCode TEXT, IsActive INTEGER, IsDiscontinued INTEGER)",
        "CREATE TABLE NDCBilling (NDC TEXT, CreditRequestType TEXT, DebitRequestType TEXT)",
        "CREATE TABLE OutboundFile (RequestExecutionID TEXT, PID TEXT, NDC TEXT, HID TEXT, Account_Number TEXT, Account_Type TEXT, Total_Pkgs INTEGER, datecreated TEXT)",
        "INSERT INTO ChainStoreGroups VALUES (1, 'WMT'), (2, 'CPH')",
        "INSERT INTO ChainStoreGroupAssignments VALUES (1, 10), (2, 20)",
        "INSERT INTO Pharmacy VALUES (1, 10, '7001', '445566'), (2, 10, NULL, NULL), (3, 20, '8001', '990011')",
        "INSERT INTO PharmacyAccounts VALUES (1, '100200'), (2, '100300'), (3, '200400')",
        "INSERT INTO Accumulations VALUES ('12345-6789-01', '340B'), ('1111122222', '340B'), ('9999988888', 'WAC')",
        "INSERT INTO UnitsOfMeasure VALUES ('EA'), ('cs')",
        "INSERT INTO NDCMaster VALUES ('12345678901', 1, 0), ('1111122222', 0, 1)",
        "INSERT INTO NDCBilling VALUES ('12345678901', 'CS', 'ZPD3')",
        "INSERT INTO OutboundFile VALUES ('REQ-0001', '100200', '12345678901', '7001', '445566', '340B', 3, '2026-10-01'), ('REQ-0001', '100300', '1111122222', NULL, NULL, NULL, NULL, '2026-10-02')",
    ];

    pub(crate) async fn reference_executor() -> Arc<SqliteQueryExecutor> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for stmt in REFERENCE_SCHEMA {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        Arc::new(SqliteQueryExecutor::new(pool))
    }

    #[tokio::test]
    async fn loads_chain_scoped_sets() {
        let repo = SqlReferenceRepository::new(reference_executor().await);
        let wmt = repo.load_pharmacy_ids("WMT").await.unwrap();
        assert!(wmt.contains("100200"));
        assert!(wmt.contains("100300"));
        assert!(!wmt.contains("200400"));

        let hids = repo.load_secondary_ids("WMT").await.unwrap();
        assert_eq!(hids.len(), 1);
        assert!(hids.contains("7001"));
    }

    #[tokio::test]
    async fn loads_global_sets() {
        let repo = SqlReferenceRepository::new(reference_executor().await);
        let ndcs = repo.load_drug_codes().await.unwrap();
        assert!(ndcs.contains("12345678901"));
        assert!(!ndcs.contains("9999988888"));
        let units = repo.load_units_of_measure().await.unwrap();
        assert!(units.contains("CS"));
    }

    #[tokio::test]
    async fn scalar_lookups() {
        let repo = SqlReferenceRepository::new(reference_executor().await);
        assert_eq!(repo.drug_status("12345678901").await.unwrap(), DrugStatus::Active);
        assert_eq!(repo.drug_status("1111122222").await.unwrap(), DrugStatus::Discontinued);
        assert_eq!(repo.drug_status("0000000000").await.unwrap(), DrugStatus::Unknown);
        assert_eq!(
            repo.billing_codes("12345678901").await.unwrap(),
            Some(BillingCodes::new("CS", "ZPD3"))
        );
        assert_eq!(repo.billing_codes("1111122222").await.unwrap(), None);
        assert_eq!(repo.execution_id_count("REQ-0001").await.unwrap(), 2);
        assert_eq!(repo.execution_id_count("REQ-0404").await.unwrap(), 0);
        assert_eq!(repo.first_account_number("WMT").await.unwrap().as_deref(), Some("445566"));
        assert_eq!(repo.first_secondary_id("CPH").await.unwrap().as_deref(), Some("8001"));
        assert_eq!(repo.first_account_number("KRG").await.unwrap(), None);
        assert_eq!(repo.first_unit_of_measure().await.unwrap().as_deref(), Some("EA"));
    }
}
