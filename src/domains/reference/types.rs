use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache keys for sets of valid values. Chain-scoped variants carry the
/// normalised chain code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetKey {
    PharmacyIds(String),
    SecondaryIds(String),
    DrugCodes,
    UnitsOfMeasure,
}

/// Cache keys for single looked-up values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKey {
    DrugStatus(String),
    BillingCodes(String),
    ExecutionIdCount(String),
    FirstAccountNumber(String),
    FirstSecondaryId(String),
    FirstUnitOfMeasure,
}

impl SetKey {
    pub fn category(&self) -> &'static str {
        match self {
            SetKey::PharmacyIds(_) => "pharmacy_ids",
            SetKey::SecondaryIds(_) => "secondary_ids",
            SetKey::DrugCodes => "drug_codes",
            SetKey::UnitsOfMeasure => "units_of_measure",
        }
    }
}

impl ScalarKey {
    pub fn category(&self) -> &'static str {
        match self {
            ScalarKey::DrugStatus(_) => "drug_status",
            ScalarKey::BillingCodes(_) => "billing_codes",
            ScalarKey::ExecutionIdCount(_) => "execution_id_count",
            ScalarKey::FirstAccountNumber(_) => "first_account_number",
            ScalarKey::FirstSecondaryId(_) => "first_secondary_id",
            ScalarKey::FirstUnitOfMeasure => "first_unit_of_measure",
        }
    }
}

impl fmt::Display for SetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetKey::PharmacyIds(chain) | SetKey::SecondaryIds(chain) => {
                write!(f, "{}:{}", self.category(), chain)
            }
            _ => write!(f, "{}", self.category()),
        }
    }
}

impl fmt::Display for ScalarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKey::DrugStatus(scope)
            | ScalarKey::BillingCodes(scope)
            | ScalarKey::ExecutionIdCount(scope)
            | ScalarKey::FirstAccountNumber(scope)
            | ScalarKey::FirstSecondaryId(scope) => write!(f, "{}:{}", self.category(), scope),
            ScalarKey::FirstUnitOfMeasure => write!(f, "{}", self.category()),
        }
    }
}

/// Marketing status of a drug code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrugStatus {
    Active,
    Inactive,
    Discontinued,
    Unknown,
}

impl DrugStatus {
    pub fn code(&self) -> &'static str {
        match self {
            DrugStatus::Active => "A",
            DrugStatus::Inactive => "I",
            DrugStatus::Discontinued => "D",
            DrugStatus::Unknown => "U",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "A" | "ACTIVE" => DrugStatus::Active,
            "I" | "INACTIVE" => DrugStatus::Inactive,
            "D" | "DISCONTINUED" => DrugStatus::Discontinued,
            _ => DrugStatus::Unknown,
        }
    }

    pub fn is_exportable(&self) -> bool {
        !matches!(self, DrugStatus::Discontinued)
    }
}

/// Credit and debit request types billed for a drug code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCodes {
    pub credit_request_type: String,
    pub debit_request_type: String,
}

impl BillingCodes {
    pub fn new(credit: &str, debit: &str) -> Self {
        Self {
            credit_request_type: credit.to_string(),
            debit_request_type: debit.to_string(),
        }
    }
}

/// Typed value held in a scalar cache slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachedScalar {
    Status(DrugStatus),
    Billing(BillingCodes),
    Count(i64),
    /// First-known lookups. `None` when the store had no row.
    Text(Option<String>),
}

impl CachedScalar {
    pub fn as_status(&self) -> Option<DrugStatus> {
        match self {
            CachedScalar::Status(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_billing(&self) -> Option<&BillingCodes> {
        match self {
            CachedScalar::Billing(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<i64> {
        match self {
            CachedScalar::Count(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CachedScalar::Text(t) => t.as_deref(),
            _ => None,
        }
    }
}

/// Result of a scalar lookup. `degraded` is set when the value came from
/// the fallback table instead of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarLookup {
    pub value: CachedScalar,
    pub degraded: bool,
}

/// A fallback applied because reference data was unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedEvent {
    pub category: String,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}
