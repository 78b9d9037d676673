use std::sync::Arc;

use crate::domains::chain::normalize_chain_code;
use crate::errors::DbError;
use crate::validation::{normalize_ndc, ValidationOutcome, ValueOutcome};

use super::cache::ValidationCache;
use super::fallback::{default_billing_codes, set_fails_open, DEFAULT_UNIT_OF_MEASURE};
use super::repository::ReferenceRepository;
use super::types::{BillingCodes, CachedScalar, DrugStatus, ScalarKey, SetKey};

/// Cache-backed existence checks for each reference category.
///
/// Data-source failures never escape: membership checks fail open through
/// the fallback table and record a degraded event, and scalar lookups use
/// the cache's fallbacks. Execution id existence is the exception and turns a
/// failure into a validation error.
pub struct ReferenceValidator {
    cache: Arc<ValidationCache>,
    repo: Arc<dyn ReferenceRepository>,
}

impl ReferenceValidator {
    pub fn new(cache: Arc<ValidationCache>, repo: Arc<dyn ReferenceRepository>) -> Self {
        Self { cache, repo }
    }

    pub fn cache(&self) -> &Arc<ValidationCache> {
        &self.cache
    }

    async fn membership(&self, key: SetKey, value: &str) -> Result<bool, DbError> {
        let repo = Arc::clone(&self.repo);
        let load_key = key.clone();
        self.cache
            .contains(&key, value, || async move {
                match load_key {
                    SetKey::PharmacyIds(chain) => repo.load_pharmacy_ids(&chain).await,
                    SetKey::SecondaryIds(chain) => repo.load_secondary_ids(&chain).await,
                    SetKey::DrugCodes => repo.load_drug_codes().await,
                    SetKey::UnitsOfMeasure => repo.load_units_of_measure().await,
                }
            })
            .await
    }

    /// Membership with the fail-open policy applied. `true` when the value
    /// is present or the set is unavailable and fails open.
    async fn present_or_open(&self, key: SetKey, value: &str) -> Result<bool, DbError> {
        match self.membership(key.clone(), value).await {
            Ok(found) => Ok(found),
            Err(err) if set_fails_open(&key) => {
                self.cache.record_degraded(
                    key.category(),
                    format!("{} unavailable ({}), accepting {}", key, err.describe(), value),
                );
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    fn membership_outcome(&self, result: Result<bool, DbError>, label: &str, failure: String) -> ValidationOutcome {
        match result {
            Ok(true) => ValidationOutcome::new(),
            Ok(false) => {
                log::warn!("{} validation failed: {}", label, failure);
                ValidationOutcome::failed(failure)
            }
            Err(err) => ValidationOutcome::failed(format!("Database error validating {}: {}", label, err.describe())),
        }
    }

    pub async fn validate_pid(&self, pid: &str, chain_code: &str) -> ValidationOutcome {
        let chain = normalize_chain_code(chain_code);
        let pid = pid.trim();
        let result = self.present_or_open(SetKey::PharmacyIds(chain.clone()), pid).await;
        self.membership_outcome(result, "PID", format!("PID {} is not valid for chain {}", pid, chain))
    }

    pub async fn validate_hid(&self, hid: &str, chain_code: &str) -> ValidationOutcome {
        let chain = normalize_chain_code(chain_code);
        let hid = hid.trim();
        let result = self.present_or_open(SetKey::SecondaryIds(chain.clone()), hid).await;
        self.membership_outcome(result, "HID", format!("HID {} is not valid for chain {}", hid, chain))
    }

    /// Drug code must be known and not discontinued.
    pub async fn validate_ndc(&self, ndc: &str) -> ValidationOutcome {
        let ndc = normalize_ndc(ndc);
        let failure = format!("NDC {} is not a valid NDC or is discontinued", ndc);
        let result = self.present_or_open(SetKey::DrugCodes, &ndc).await;
        let outcome = self.membership_outcome(result, "NDC", failure.clone());
        if !outcome.is_valid() {
            return outcome;
        }
        if !self.drug_status(&ndc).await.is_exportable() {
            log::warn!("NDC validation failed: {} is discontinued", ndc);
            return ValidationOutcome::failed(failure);
        }
        outcome
    }

    /// Unit of measure must be present in the valid set. An empty value is
    /// pre-filled with the first known unit.
    pub async fn validate_unit_of_measure(&self, unit: Option<&str>) -> ValueOutcome<String> {
        let unit = unit.map(|u| u.trim().to_uppercase()).filter(|u| !u.is_empty());
        let unit = match unit {
            Some(unit) => unit,
            None => return ValueOutcome::accepted(self.first_unit_of_measure().await),
        };
        let result = self.present_or_open(SetKey::UnitsOfMeasure, &unit).await;
        let outcome = self.membership_outcome(
            result,
            "unit of measure",
            format!("Unit of measure {} is not valid", unit),
        );
        if outcome.is_valid() {
            ValueOutcome::accepted(unit)
        } else {
            ValueOutcome { outcome, value: None }
        }
    }

    pub async fn drug_status(&self, ndc: &str) -> DrugStatus {
        let ndc = normalize_ndc(ndc);
        let key = ScalarKey::DrugStatus(ndc.clone());
        let repo = Arc::clone(&self.repo);
        let lookup = self
            .cache
            .get_or_load_scalar(&key, || async move { repo.drug_status(&ndc).await.map(CachedScalar::Status) })
            .await;
        lookup
            .ok()
            .and_then(|l| l.value.as_status())
            .unwrap_or(super::fallback::DEFAULT_DRUG_STATUS)
    }

    /// Blocking check: the execution id must already exist in the outbound
    /// table. Unreachable data is an error here, not a fallback.
    pub async fn validate_execution_id_exists(&self, execution_id: &str) -> ValidationOutcome {
        let execution_id = execution_id.trim().to_string();
        log::info!("Validating RequestExecutionID {}", execution_id);
        let key = ScalarKey::ExecutionIdCount(execution_id.clone());
        let repo = Arc::clone(&self.repo);
        let id = execution_id.clone();
        let lookup = self
            .cache
            .get_or_load_scalar(&key, || async move { repo.execution_id_count(&id).await.map(CachedScalar::Count) })
            .await;
        match lookup.map(|l| l.value.as_count().unwrap_or(0)) {
            Ok(0) => {
                log::warn!("RequestExecutionID validation failed: {} does not exist", execution_id);
                ValidationOutcome::failed(format!(
                    "RequestExecutionID {} does not exist in the OutboundFile table",
                    execution_id
                ))
            }
            Ok(_) => ValidationOutcome::new(),
            Err(err) => {
                log::error!("Error validating RequestExecutionID: {}", err);
                ValidationOutcome::failed(format!(
                    "Database error validating RequestExecutionID: {}",
                    err.describe()
                ))
            }
        }
    }

    async fn first_text(&self, key: ScalarKey) -> Option<String> {
        let repo = Arc::clone(&self.repo);
        let load_key = key.clone();
        let lookup = self
            .cache
            .get_or_load_scalar(&key, || async move {
                let value = match load_key {
                    ScalarKey::FirstAccountNumber(chain) => repo.first_account_number(&chain).await?,
                    ScalarKey::FirstSecondaryId(chain) => repo.first_secondary_id(&chain).await?,
                    _ => repo.first_unit_of_measure().await?,
                };
                Ok::<_, DbError>(CachedScalar::Text(value))
            })
            .await;
        lookup.ok().and_then(|l| l.value.as_text().map(str::to_string))
    }

    /// Representative account number for the chain, if the store has one.
    pub async fn first_account_number(&self, chain_code: &str) -> Option<String> {
        self.first_text(ScalarKey::FirstAccountNumber(normalize_chain_code(chain_code)))
            .await
    }

    pub async fn first_hid(&self, chain_code: &str) -> Option<String> {
        self.first_text(ScalarKey::FirstSecondaryId(normalize_chain_code(chain_code)))
            .await
    }

    pub async fn first_unit_of_measure(&self) -> String {
        self.first_text(ScalarKey::FirstUnitOfMeasure)
            .await
            .unwrap_or_else(|| DEFAULT_UNIT_OF_MEASURE.to_string())
    }

    /// Billing code pair for a drug code; the documented default when the
    /// store has none or is unreachable.
    pub async fn billing_codes(&self, ndc: &str) -> BillingCodes {
        let ndc = normalize_ndc(ndc);
        let key = ScalarKey::BillingCodes(ndc.clone());
        let repo = Arc::clone(&self.repo);
        let lookup = self
            .cache
            .get_or_load_scalar(&key, || async move {
                let codes = repo.billing_codes(&ndc).await?.unwrap_or_else(default_billing_codes);
                Ok::<_, DbError>(CachedScalar::Billing(codes))
            })
            .await;
        lookup
            .ok()
            .and_then(|l| l.value.as_billing().cloned())
            .unwrap_or_else(default_billing_codes)
    }
}
