//! Values used when reference data cannot be loaded.
//!
//! | category                | on load failure                     |
//! |-------------------------|-------------------------------------|
//! | pharmacy_ids (chain)    | accept the identifier               |
//! | secondary_ids (chain)   | accept the identifier               |
//! | drug_codes              | accept the code                     |
//! | units_of_measure        | accept the unit                     |
//! | drug_status             | `A` (active)                        |
//! | billing_codes           | credit `EA`, debit `ZPD2`           |
//! | first_account_number    | none, record defaults apply         |
//! | first_secondary_id      | none                                |
//! | first_unit_of_measure   | `EA`                                |
//! | execution_id_count      | no fallback, the check blocks       |

use super::types::{BillingCodes, CachedScalar, DrugStatus, ScalarKey, SetKey};

pub const DEFAULT_UNIT_OF_MEASURE: &str = "EA";
pub const DEFAULT_DRUG_STATUS: DrugStatus = DrugStatus::Active;
pub const DEFAULT_CREDIT_REQUEST_TYPE: &str = "EA";
pub const DEFAULT_DEBIT_REQUEST_TYPE: &str = "ZPD2";

pub fn default_billing_codes() -> BillingCodes {
    BillingCodes::new(DEFAULT_CREDIT_REQUEST_TYPE, DEFAULT_DEBIT_REQUEST_TYPE)
}

/// Whether a membership check on this set passes when the set is unavailable.
pub fn set_fails_open(key: &SetKey) -> bool {
    match key {
        SetKey::PharmacyIds(_) | SetKey::SecondaryIds(_) | SetKey::DrugCodes | SetKey::UnitsOfMeasure => true,
    }
}

/// Fallback for a scalar lookup, `None` when the failure must surface.
pub fn scalar_fallback(key: &ScalarKey) -> Option<CachedScalar> {
    match key {
        ScalarKey::DrugStatus(_) => Some(CachedScalar::Status(DEFAULT_DRUG_STATUS)),
        ScalarKey::BillingCodes(_) => Some(CachedScalar::Billing(default_billing_codes())),
        ScalarKey::FirstAccountNumber(_) | ScalarKey::FirstSecondaryId(_) => Some(CachedScalar::Text(None)),
        ScalarKey::FirstUnitOfMeasure => Some(CachedScalar::Text(Some(DEFAULT_UNIT_OF_MEASURE.to_string()))),
        ScalarKey::ExecutionIdCount(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_id_existence_has_no_fallback() {
        assert!(scalar_fallback(&ScalarKey::ExecutionIdCount("REQ-1".into())).is_none());
    }

    #[test]
    fn drug_status_falls_back_to_active() {
        let value = scalar_fallback(&ScalarKey::DrugStatus("12345678901".into())).unwrap();
        assert_eq!(value.as_status().map(|s| s.code()), Some("A"));
    }

    #[test]
    fn billing_and_unit_defaults() {
        let billing = scalar_fallback(&ScalarKey::BillingCodes("1".into())).unwrap();
        assert_eq!(billing.as_billing(), Some(&BillingCodes::new("EA", "ZPD2")));
        let unit = scalar_fallback(&ScalarKey::FirstUnitOfMeasure).unwrap();
        assert_eq!(unit.as_text(), Some("EA"));
        assert!(set_fails_open(&SetKey::DrugCodes));
    }
}
