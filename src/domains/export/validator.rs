use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domains::chain::{normalize_chain_code, ChainConfiguration, ChainRegistry};
use crate::domains::export::types::ExportRequest;
use crate::domains::reference::ReferenceValidator;
use crate::validation::{IdentifierValidator, ValidationOutcome, ValueOutcome};

pub const DEFAULT_MAX_RECORD_COUNT: u64 = 2_000_000;

/// Request after validation, with every field in its normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedRequest {
    pub execution_id: String,
    pub chain_code: String,
    pub chain: ChainConfiguration,
    pub pid: String,
    pub hid: Option<String>,
    pub ndc: String,
    pub reason_code: String,
    pub unit_of_measure: Option<String>,
    pub record_count: u64,
    pub output_dir: String,
}

/// Two-phase request validation. Structural checks always run first and
/// never touch reference data; the cache-backed checks run only for a
/// structurally valid request.
pub struct RequestValidator {
    registry: Arc<ChainRegistry>,
    reference: Option<Arc<ReferenceValidator>>,
    max_record_count: u64,
}

impl RequestValidator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        reference: Option<Arc<ReferenceValidator>>,
        max_record_count: u64,
    ) -> Self {
        Self { registry, reference, max_record_count }
    }

    /// Validator without reference data ("basic validation only").
    pub fn structural(registry: Arc<ChainRegistry>, max_record_count: u64) -> Self {
        Self::new(registry, None, max_record_count)
    }

    pub fn uses_reference_data(&self) -> bool {
        self.reference.is_some()
    }

    /// Every field is checked; each field stops at its own first failure.
    pub fn validate_structure(&self, request: &ExportRequest) -> ValueOutcome<ValidatedRequest> {
        let mut outcome = ValidationOutcome::new();
        let chain_code = normalize_chain_code(&request.chain_code);
        let chain = self.registry.resolve(&chain_code).clone();

        outcome.merge(IdentifierValidator::validate_execution_id(&request.execution_id));
        outcome.merge(IdentifierValidator::validate_chain_code(&request.chain_code));
        outcome.merge(IdentifierValidator::validate_pid(&request.pid, &chain_code, &chain));
        outcome.merge(IdentifierValidator::validate_hid(request.hid.as_deref(), &chain_code, &chain));
        let ndc = IdentifierValidator::validate_ndc(&request.ndc);
        outcome.merge(ndc.outcome);
        let reason = IdentifierValidator::validate_reason_code(&request.reason_code);
        outcome.merge(reason.outcome);
        outcome.merge(IdentifierValidator::validate_record_count(
            request.record_count,
            self.max_record_count,
        ));
        let output_dir = IdentifierValidator::validate_output_dir(&request.output_dir);
        outcome.merge(output_dir.outcome);
        let unit = match request.unit_of_measure.as_deref() {
            Some(unit) => IdentifierValidator::validate_unit_of_measure(unit),
            None => ValueOutcome { outcome: ValidationOutcome::new(), value: None },
        };
        outcome.merge(unit.outcome);

        if !outcome.is_valid() {
            return ValueOutcome { outcome, value: None };
        }
        let (Some(ndc), Some(reason_code), Some(output_dir)) = (ndc.value, reason.value, output_dir.value) else {
            return ValueOutcome { outcome, value: None };
        };
        ValueOutcome::accepted(ValidatedRequest {
            execution_id: request.execution_id.trim().to_string(),
            chain_code,
            chain,
            pid: request.pid.trim().to_string(),
            hid: request
                .hid
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
            ndc,
            reason_code,
            unit_of_measure: unit.value,
            record_count: request.record_count,
            output_dir,
        })
    }

    /// Structural validation, then existence checks against reference data.
    pub async fn validate(&self, request: &ExportRequest) -> ValueOutcome<ValidatedRequest> {
        let structural = self.validate_structure(request);
        let (reference, mut validated) = match (&self.reference, structural.value) {
            (Some(reference), Some(validated)) => (reference, validated),
            (_, value) => {
                return ValueOutcome { outcome: structural.outcome, value };
            }
        };

        let mut outcome = ValidationOutcome::new();
        outcome.merge(reference.validate_execution_id_exists(&validated.execution_id).await);
        outcome.merge(reference.validate_pid(&validated.pid, &validated.chain_code).await);
        if let Some(hid) = &validated.hid {
            outcome.merge(reference.validate_hid(hid, &validated.chain_code).await);
        }
        outcome.merge(reference.validate_ndc(&validated.ndc).await);
        let unit = reference
            .validate_unit_of_measure(validated.unit_of_measure.as_deref())
            .await;
        outcome.merge(unit.outcome);

        if !outcome.is_valid() {
            log::warn!("Request {} rejected: {}", validated.execution_id, outcome.error_message());
            return ValueOutcome { outcome, value: None };
        }
        validated.unit_of_measure = unit.value;
        ValueOutcome::accepted(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::ScriptedExecutor;
    use crate::database::SqlRow;
    use crate::domains::reference::repository::tests::reference_executor;
    use crate::domains::reference::{SqlReferenceRepository, ValidationCache};

    fn request() -> ExportRequest {
        ExportRequest {
            execution_id: "REQ-0001".into(),
            chain_code: " wmt ".into(),
            pid: "100200".into(),
            hid: Some("7001".into()),
            ndc: "1234-5678-901".into(),
            reason_code: "02 - Covered Entity account exists but not active".into(),
            unit_of_measure: None,
            record_count: 10,
            output_dir: "\"/tmp/vrr\"".into(),
        }
    }

    fn registry() -> Arc<ChainRegistry> {
        Arc::new(ChainRegistry::builtin())
    }

    #[test]
    fn structural_pass_normalizes_fields() {
        let validator = RequestValidator::structural(registry(), DEFAULT_MAX_RECORD_COUNT);
        let outcome = validator.validate_structure(&request());
        assert!(outcome.is_valid(), "{:?}", outcome.outcome);
        let v = outcome.value.unwrap();
        assert_eq!(v.chain_code, "WMT");
        assert_eq!(v.ndc, "12345678901");
        assert_eq!(v.reason_code, "02");
        assert_eq!(v.output_dir, "/tmp/vrr");
        assert_eq!(v.hid.as_deref(), Some("7001"));
    }

    #[test]
    fn every_field_is_reported() {
        let validator = RequestValidator::structural(registry(), 100);
        let mut bad = request();
        bad.execution_id = "ab".into();
        bad.pid = "12a".into();
        bad.ndc = "123".into();
        bad.record_count = 101;
        let outcome = validator.validate_structure(&bad);
        assert_eq!(outcome.outcome.errors().len(), 4);
        assert!(outcome.value.is_none());
    }

    #[test]
    fn padded_execution_id_is_measured_after_trimming() {
        let validator = RequestValidator::structural(registry(), DEFAULT_MAX_RECORD_COUNT);
        let mut req = request();
        req.execution_id = "  ab  ".into();
        let outcome = validator.validate_structure(&req);
        assert!(!outcome.is_valid());
        assert!(outcome.value.is_none());

        req.execution_id = "  REQ-0001  ".into();
        let v = validator.validate_structure(&req).value.unwrap();
        assert_eq!(v.execution_id, "REQ-0001");
    }

    #[test]
    fn unknown_chain_uses_default_limits() {
        let validator = RequestValidator::structural(registry(), DEFAULT_MAX_RECORD_COUNT);
        let mut req = request();
        req.chain_code = "krg".into();
        req.pid = "123456789".into();
        let v = validator.validate_structure(&req).value.unwrap();
        assert!(v.chain.is_default());
        assert_eq!(v.chain_code, "KRG");

        req.pid = "1234567890".into();
        assert!(!validator.validate_structure(&req).is_valid());
    }

    #[tokio::test]
    async fn structural_failure_never_loads_reference_data() {
        let executor = Arc::new(ScriptedExecutor::new());
        let reference = Arc::new(ReferenceValidator::new(
            Arc::new(ValidationCache::new()),
            Arc::new(SqlReferenceRepository::new(executor.clone())),
        ));
        let validator = RequestValidator::new(registry(), Some(reference), DEFAULT_MAX_RECORD_COUNT);
        let mut bad = request();
        bad.pid = "not-a-number".into();
        let outcome = validator.validate(&bad).await;
        assert!(!outcome.is_valid());
        assert_eq!(executor.total_calls(), 0);
    }

    #[tokio::test]
    async fn reference_checks_and_unit_prefill() {
        let reference = Arc::new(ReferenceValidator::new(
            Arc::new(ValidationCache::new()),
            Arc::new(SqlReferenceRepository::new(reference_executor().await)),
        ));
        let validator = RequestValidator::new(registry(), Some(reference), DEFAULT_MAX_RECORD_COUNT);

        let outcome = validator.validate(&request()).await;
        assert!(outcome.is_valid(), "{:?}", outcome.outcome);
        assert_eq!(outcome.value.unwrap().unit_of_measure.as_deref(), Some("EA"));

        let mut unknown = request();
        unknown.execution_id = "REQ-0404".into();
        unknown.pid = "200400".into();
        let outcome = validator.validate(&unknown).await;
        let errors = outcome.outcome.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("REQ-0404 does not exist"));
        assert_eq!(errors[1], "PID 200400 is not valid for chain WMT");
    }

    #[tokio::test]
    async fn unreachable_sets_fail_open_but_execution_id_blocks() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .failing("PharmacyAccounts", 53)
                .failing("Accumulations", 53)
                .failing("UnitsOfMeasure", 53)
                .on("NDCMaster", vec![SqlRow::new().with("Status", "A")])
                .failing("COUNT(*)", 53),
        );
        let cache = Arc::new(ValidationCache::new());
        let reference = Arc::new(ReferenceValidator::new(
            Arc::clone(&cache),
            Arc::new(SqlReferenceRepository::new(executor)),
        ));
        let validator = RequestValidator::new(registry(), Some(reference), DEFAULT_MAX_RECORD_COUNT);
        let mut req = request();
        req.hid = None;
        let outcome = validator.validate(&req).await;
        let errors = outcome.outcome.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Database error validating RequestExecutionID"));
        assert!(!cache.degraded_events().is_empty());
    }
}
