use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::database::SqlRow;
use crate::domains::export::record::{Column, NormalizedRecord};
use crate::domains::export::repository::OutboundRepository;
use crate::domains::export::types::RecordSourceKind;
use crate::domains::reference::fallback::{DEFAULT_CREDIT_REQUEST_TYPE, DEFAULT_DEBIT_REQUEST_TYPE};
use crate::validation::result_message;

pub const DEFAULT_ACCOUNT_NUMBER: &str = "123456";
pub const DEFAULT_ACCOUNT_TYPE: &str = "340B";
pub const DEFAULT_ALTERNATE_UOM: &str = "1";

/// Request-level values every record starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefaults {
    pub execution_id: String,
    pub pid: String,
    pub ndc: String,
    /// Representative account for the chain. Procedural records draw a
    /// random account when this is `None`.
    pub account_number: Option<String>,
    pub reason_code: String,
    pub credit_request_type: String,
    pub debit_request_type: String,
    pub alternate_uom: String,
    /// `yyyyMMdd`
    pub reference_date: String,
}

impl RecordDefaults {
    pub fn new(execution_id: &str, pid: &str, ndc: &str, reason_code: &str, reference_date: &str) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            pid: pid.to_string(),
            ndc: ndc.to_string(),
            account_number: None,
            reason_code: reason_code.to_string(),
            credit_request_type: DEFAULT_CREDIT_REQUEST_TYPE.to_string(),
            debit_request_type: DEFAULT_DEBIT_REQUEST_TYPE.to_string(),
            alternate_uom: DEFAULT_ALTERNATE_UOM.to_string(),
            reference_date: reference_date.to_string(),
        }
    }
}

/// Deterministic generator: the record at a position depends only on the
/// run seed and the position.
#[derive(Debug, Clone, Copy)]
pub struct ProceduralSource {
    seed: u64,
}

impl ProceduralSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, position: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ position.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn generate(&self, position: u64, defaults: &RecordDefaults) -> NormalizedRecord {
        let mut rng = self.rng_for(position);
        let mut record = NormalizedRecord::new();

        record.set(Column::RequestExecutionId, defaults.execution_id.as_str());
        record.set(Column::Id340B, "340B");
        record.set(Column::Pid, defaults.pid.as_str());
        let account = match &defaults.account_number {
            Some(account) => account.clone(),
            None => rng.random_range(100_000..1_000_000u32).to_string(),
        };
        record.set(Column::AccountNumber, account);
        record.set(Column::AccountType, DEFAULT_ACCOUNT_TYPE);
        record.set(Column::Ndc, defaults.ndc.as_str());
        record.set(Column::TotalPkgs, rng.random_range(1..10u32).to_string());
        record.set(
            Column::ContractPharmacyAccountNumber,
            rng.random_range(500_000..600_000u32).to_string(),
        );

        record.set(Column::CreditRequestType, defaults.credit_request_type.as_str());
        record.set(Column::CreditRequestNumber, "1");
        record.set(
            Column::CreditRequestLine,
            rng.random_range(1_000_000_000..2_000_000_000u32).to_string(),
        );
        record.set(Column::CreditMemoType, "R");
        record.set(Column::CreditMemoPo, "0");
        record.set(Column::CreditMemoNumber, rng.random_range(10_000..20_000u32).to_string());
        record.set(Column::CreditMemoLine, "1");

        record.set(Column::MaterialNumber, "CM23219-GM");
        record.set(Column::MaterialDescription, "VRR Test batch");
        record.set(Column::MaterialStatus, "");
        record.set(Column::RetailPrice, "133.75");
        record.set(Column::CreditQty, "1");
        record.set(Column::ReferenceInvoiceDate, defaults.reference_date.as_str());
        record.set(Column::CoveredEntityAccountNumber, "3377");

        record.set(Column::DebitRequestType, defaults.debit_request_type.as_str());
        record.set(Column::DebitRequestNumber, "1");
        record.set(Column::DebitRequestLine, "1");
        record.set(Column::DebitMemoType, "R");
        record.set(Column::DebitMemoPo, "0");
        record.set(Column::DebitMemoNumber, "1");
        record.set(Column::DebitMemoLine, "1");
        record.set(Column::DebitQty, "1");

        record.set(Column::Price340B, "0");
        record.set(Column::DepartmentCode, "TESTDEPT");
        record.set(Column::PackageUom, "0");
        record.set(Column::AlternateUom, defaults.alternate_uom.as_str());
        record.set(Column::AlternateUomQty, "1");
        record.set(Column::UpcNumber, "20231026");
        record.set(Column::RetailWarehouse, "9.3");
        record.set(Column::ReasonCode, defaults.reason_code.as_str());
        record.set(Column::VrrMessage, result_message(&defaults.reason_code));
        record
    }
}

/// Rows fetched for the execution id, addressed by position.
#[derive(Debug, Clone, Default)]
pub struct IndexedSource {
    rows: Vec<SqlRow>,
}

impl IndexedSource {
    pub fn new(rows: Vec<SqlRow>) -> Self {
        Self { rows }
    }

    pub fn get(&self, position: u64) -> Option<&SqlRow> {
        usize::try_from(position).ok().and_then(|i| self.rows.get(i))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Single entry point from position to record. Positions covered by a
/// fetched row take that row's values; anything the row lacks, and every
/// position past the fetched rows, comes from the procedural source.
#[derive(Debug, Clone)]
pub struct RecordResolver {
    defaults: RecordDefaults,
    indexed: IndexedSource,
    procedural: ProceduralSource,
}

impl RecordResolver {
    pub fn new(defaults: RecordDefaults, indexed: IndexedSource, procedural: ProceduralSource) -> Self {
        Self { defaults, indexed, procedural }
    }

    pub fn procedural(defaults: RecordDefaults, seed: u64) -> Self {
        Self::new(defaults, IndexedSource::default(), ProceduralSource::new(seed))
    }

    pub fn kind(&self) -> RecordSourceKind {
        if self.indexed.is_empty() {
            RecordSourceKind::Procedural
        } else {
            RecordSourceKind::Fetched { rows: self.indexed.len() }
        }
    }

    pub fn defaults(&self) -> &RecordDefaults {
        &self.defaults
    }

    pub fn resolve(&self, position: u64) -> NormalizedRecord {
        let mut record = self.procedural.generate(position, &self.defaults);
        if let Some(row) = self.indexed.get(position) {
            let account_default = self
                .defaults
                .account_number
                .clone()
                .unwrap_or_else(|| DEFAULT_ACCOUNT_NUMBER.to_string());
            record.set(Column::Pid, row.get_text("PID").unwrap_or_else(|| self.defaults.pid.clone()));
            record.set(Column::Ndc, row.get_text("NDC").unwrap_or_else(|| self.defaults.ndc.clone()));
            record.set(Column::AccountNumber, row.get_text("Account_Number").unwrap_or(account_default));
            record.set(
                Column::AccountType,
                row.get_text("Account_Type").unwrap_or_else(|| DEFAULT_ACCOUNT_TYPE.to_string()),
            );
            if let Some(pkgs) = row.get_text("Total_Pkgs") {
                record.set(Column::TotalPkgs, pkgs);
            }
        }
        record
    }
}

/// Picks the record source for a run.
pub struct RecordSourceResolver {
    outbound: Option<Arc<dyn OutboundRepository>>,
    fetch_limit: u32,
}

impl RecordSourceResolver {
    pub fn new(outbound: Option<Arc<dyn OutboundRepository>>, fetch_limit: u32) -> Self {
        Self { outbound, fetch_limit }
    }

    /// Without a data source every record is procedural.
    pub fn procedural_only() -> Self {
        Self::new(None, 0)
    }

    /// Fetched rows when there are any; a failed fetch degrades to
    /// procedural records.
    pub async fn resolve_for(&self, defaults: RecordDefaults, seed: u64) -> RecordResolver {
        let rows = match &self.outbound {
            Some(repo) if self.fetch_limit > 0 => {
                match repo.fetch_rows(&defaults.execution_id, self.fetch_limit).await {
                    Ok(rows) => rows,
                    Err(err) => {
                        log::warn!(
                            target: "degraded",
                            "could not fetch outbound rows for {} ({}), generating records",
                            defaults.execution_id,
                            err.describe()
                        );
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };
        if rows.is_empty() {
            log::info!("no outbound rows for {}, records are generated", defaults.execution_id);
        } else {
            log::info!("using {} outbound rows for {}", rows.len(), defaults.execution_id);
        }
        RecordResolver::new(defaults, IndexedSource::new(rows), ProceduralSource::new(seed))
    }
}
