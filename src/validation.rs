use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::domains::chain::ChainConfiguration;

pub const EXECUTION_ID_MIN_LENGTH: usize = 5;
pub const EXECUTION_ID_MAX_LENGTH: usize = 500;
pub const CHAIN_CODE_MAX_LENGTH: usize = 10;
pub const UNIT_OF_MEASURE_MAX_LENGTH: usize = 3;

// Common regex patterns
fn digits_regex() -> &'static Regex {
    static DIGITS_REGEX: OnceLock<Regex> = OnceLock::new();
    DIGITS_REGEX.get_or_init(|| Regex::new(r"^[0-9]+$").unwrap())
}

fn ndc_regex() -> &'static Regex {
    static NDC_REGEX: OnceLock<Regex> = OnceLock::new();
    NDC_REGEX.get_or_init(|| Regex::new(r"^[0-9]{10,11}$").unwrap())
}

fn chain_code_regex() -> &'static Regex {
    static CHAIN_CODE_REGEX: OnceLock<Regex> = OnceLock::new();
    CHAIN_CODE_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap())
}

fn unit_regex() -> &'static Regex {
    static UNIT_REGEX: OnceLock<Regex> = OnceLock::new();
    UNIT_REGEX.get_or_init(|| Regex::new(r"^[A-Z]+$").unwrap())
}

/// Ordered list of validation failures. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut outcome = Self::new();
        outcome.add_error(message);
        outcome
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationOutcome) {
        self.errors.extend(other.errors);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    /// All messages, one per line.
    pub fn error_message(&self) -> String {
        self.errors.join("\n")
    }
}

/// Validation outcome that also carries the accepted (possibly normalised)
/// value. `value` is `None` when nothing was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueOutcome<T> {
    pub outcome: ValidationOutcome,
    pub value: Option<T>,
}

impl<T> ValueOutcome<T> {
    pub fn accepted(value: T) -> Self {
        Self { outcome: ValidationOutcome::new(), value: Some(value) }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self { outcome: ValidationOutcome::failed(message), value: None }
    }

    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }
}

/// Known reason codes and their display descriptions
pub const REASON_CODES: &[(&str, &str)] = &[
    ("00", "340B qty successfully consumed"),
    ("01", "Covered Entity account does not exist in Master data"),
    ("02", "Covered Entity account exists but not active"),
    ("03", "Covered Entity DEA License expired"),
    ("04", "Covered Entity Account has billing block"),
];

pub const SUCCESS_REASON_CODE: &str = "00";

/// Accepts `"02"` or the display form `"02 - Covered Entity ..."` and returns
/// the bare two-digit code when it is a known one.
pub fn normalize_reason_code(input: &str) -> Option<String> {
    let code = input.split(" - ").next().unwrap_or("").trim();
    REASON_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(known, _)| known.to_string())
}

pub fn reason_code_display(code: &str) -> Option<String> {
    REASON_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(known, desc)| format!("{} - {}", known, desc))
}

/// Human readable result message written to every record.
pub fn result_message(reason_code: &str) -> String {
    if reason_code == SUCCESS_REASON_CODE {
        "Success".to_string()
    } else {
        format!("Error code {}", reason_code)
    }
}

/// Strip separators from a drug code.
pub fn normalize_ndc(ndc: &str) -> String {
    ndc.trim().chars().filter(|c| *c != '-' && *c != '_').collect()
}

/// Structural, cache-independent validators. Each returns at the first
/// failure for its field.
pub struct IdentifierValidator;

impl IdentifierValidator {
    pub fn validate_execution_id(id: &str) -> ValidationOutcome {
        if id.trim().is_empty() {
            return ValidationOutcome::failed("Request Execution ID cannot be empty");
        }
        let id = id.trim();
        let len = id.chars().count();
        if !(EXECUTION_ID_MIN_LENGTH..=EXECUTION_ID_MAX_LENGTH).contains(&len) {
            return ValidationOutcome::failed(format!(
                "Request Execution ID {} must be between {} and {} characters",
                id, EXECUTION_ID_MIN_LENGTH, EXECUTION_ID_MAX_LENGTH
            ));
        }
        ValidationOutcome::new()
    }

    pub fn validate_chain_code(code: &str) -> ValidationOutcome {
        let code = code.trim();
        if code.is_empty() {
            return ValidationOutcome::failed("Chain Abbreviation cannot be empty");
        }
        if !chain_code_regex().is_match(code) {
            return ValidationOutcome::failed(format!(
                "Chain Abbreviation {} must contain only letters and digits",
                code
            ));
        }
        if code.len() > CHAIN_CODE_MAX_LENGTH {
            return ValidationOutcome::failed(format!(
                "Chain Abbreviation {} must be at most {} characters",
                code, CHAIN_CODE_MAX_LENGTH
            ));
        }
        ValidationOutcome::new()
    }

    /// Numeric identifier, strictly shorter than the chain's limit.
    pub fn validate_pid(pid: &str, chain_code: &str, config: &ChainConfiguration) -> ValidationOutcome {
        Self::validate_numeric_id("PID", pid, chain_code, config)
    }

    /// Secondary identifier. Absent is fine; present follows the PID rules.
    pub fn validate_hid(hid: Option<&str>, chain_code: &str, config: &ChainConfiguration) -> ValidationOutcome {
        match hid.map(str::trim).filter(|h| !h.is_empty()) {
            Some(hid) => Self::validate_numeric_id("HID", hid, chain_code, config),
            None => ValidationOutcome::new(),
        }
    }

    fn validate_numeric_id(label: &str, value: &str, chain_code: &str, config: &ChainConfiguration) -> ValidationOutcome {
        let value = value.trim();
        if value.is_empty() {
            return ValidationOutcome::failed(format!("{} cannot be empty", label));
        }
        if !digits_regex().is_match(value) || value.parse::<u64>().is_err() {
            return ValidationOutcome::failed(format!("{} must be a number", label));
        }
        if value.len() >= config.max_pid_length {
            return ValidationOutcome::failed(format!(
                "{} {}s must be less than {} characters",
                chain_code.trim().to_uppercase(),
                label,
                config.max_pid_length
            ));
        }
        ValidationOutcome::new()
    }

    /// Drug code: separators are ignored, 10 or 11 digits remain.
    pub fn validate_ndc(ndc: &str) -> ValueOutcome<String> {
        if ndc.trim().is_empty() {
            return ValueOutcome::rejected("NDC cannot be empty");
        }
        let normalized = normalize_ndc(ndc);
        if !ndc_regex().is_match(&normalized) {
            return ValueOutcome::rejected("NDC must be 10 or 11 digits");
        }
        ValueOutcome::accepted(normalized)
    }

    pub fn validate_reason_code(input: &str) -> ValueOutcome<String> {
        if input.trim().is_empty() {
            return ValueOutcome::rejected("Reason code cannot be empty");
        }
        match normalize_reason_code(input) {
            Some(code) => ValueOutcome::accepted(code),
            None => {
                let known: Vec<&str> = REASON_CODES.iter().map(|(c, _)| *c).collect();
                ValueOutcome::rejected(format!(
                    "Reason code {} must be one of {}",
                    input.trim(),
                    known.join(", ")
                ))
            }
        }
    }

    pub fn validate_record_count(count: u64, max: u64) -> ValidationOutcome {
        if count == 0 || count > max {
            return ValidationOutcome::failed(format!("Record count must be between 1 and {}", max));
        }
        ValidationOutcome::new()
    }

    /// Output directory as typed: quotes and surrounding whitespace removed.
    pub fn validate_output_dir(dir: &str) -> ValueOutcome<String> {
        let cleaned = sanitize_path(dir);
        if cleaned.is_empty() {
            return ValueOutcome::rejected("Output directory cannot be empty");
        }
        ValueOutcome::accepted(cleaned)
    }

    /// Unit of measure, uppercased. Blank input is accepted with no value so
    /// the caller can pre-fill one.
    pub fn validate_unit_of_measure(unit: &str) -> ValueOutcome<String> {
        let unit = unit.trim().to_uppercase();
        if unit.is_empty() {
            return ValueOutcome { outcome: ValidationOutcome::new(), value: None };
        }
        if unit.len() > UNIT_OF_MEASURE_MAX_LENGTH || !unit_regex().is_match(&unit) {
            return ValueOutcome::rejected(format!(
                "Unit of measure {} must be 1 to {} letters",
                unit, UNIT_OF_MEASURE_MAX_LENGTH
            ));
        }
        ValueOutcome::accepted(unit)
    }
}

/// Remove surrounding whitespace and quote characters from a typed path.
pub fn sanitize_path(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wmt() -> ChainConfiguration {
        ChainConfiguration::standard("WMT")
    }

    #[test]
    fn test_execution_id_length_bounds() {
        let outcome = IdentifierValidator::validate_execution_id("ab");
        assert!(!outcome.is_valid());
        assert_eq!(outcome.errors(), ["Request Execution ID ab must be between 5 and 500 characters"]);

        assert!(IdentifierValidator::validate_execution_id("abcde").is_valid());
        assert!(IdentifierValidator::validate_execution_id("!!  ??").is_valid());
        assert!(IdentifierValidator::validate_execution_id(&"x".repeat(500)).is_valid());
        assert!(!IdentifierValidator::validate_execution_id(&"x".repeat(501)).is_valid());
        assert_eq!(
            IdentifierValidator::validate_execution_id("   ").errors(),
            ["Request Execution ID cannot be empty"]
        );
    }

    #[test]
    fn test_execution_id_length_ignores_padding() {
        let outcome = IdentifierValidator::validate_execution_id("  ab  ");
        assert_eq!(outcome.errors(), ["Request Execution ID ab must be between 5 and 500 characters"]);
        assert!(IdentifierValidator::validate_execution_id("  abcde  ").is_valid());
        assert!(!IdentifierValidator::validate_execution_id(&format!(" {} ", "x".repeat(501))).is_valid());
    }

    #[test]
    fn test_pid_rules() {
        let config = wmt();
        assert!(IdentifierValidator::validate_pid("123456", "WMT", &config).is_valid());
        assert_eq!(
            IdentifierValidator::validate_pid("", "WMT", &config).errors(),
            ["PID cannot be empty"]
        );
        assert_eq!(
            IdentifierValidator::validate_pid("12a4", "WMT", &config).errors(),
            ["PID must be a number"]
        );
        assert_eq!(
            IdentifierValidator::validate_pid("1234567890", "wmt", &config).errors(),
            ["WMT PIDs must be less than 10 characters"]
        );
        assert!(IdentifierValidator::validate_pid("123456789", "WMT", &config).is_valid());
    }

    #[test]
    fn test_hid_is_optional() {
        let config = wmt();
        assert!(IdentifierValidator::validate_hid(None, "WMT", &config).is_valid());
        assert!(IdentifierValidator::validate_hid(Some("  "), "WMT", &config).is_valid());
        assert_eq!(
            IdentifierValidator::validate_hid(Some("-5"), "WMT", &config).errors(),
            ["HID must be a number"]
        );
    }

    #[test]
    fn test_ndc_normalisation() {
        let ok = IdentifierValidator::validate_ndc("12345-6789-01");
        assert_eq!(ok.value.as_deref(), Some("12345678901"));
        assert!(IdentifierValidator::validate_ndc("1234567890").is_valid());
        assert_eq!(
            IdentifierValidator::validate_ndc("123456789").outcome.errors(),
            ["NDC must be 10 or 11 digits"]
        );
        assert_eq!(IdentifierValidator::validate_ndc(" ").outcome.errors(), ["NDC cannot be empty"]);
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(result_message("00"), "Success");
        assert_eq!(result_message("02"), "Error code 02");
        assert_eq!(
            normalize_reason_code("02 - Covered Entity account exists but not active").as_deref(),
            Some("02")
        );
        assert_eq!(
            reason_code_display("04").as_deref(),
            Some("04 - Covered Entity Account has billing block")
        );
        let rejected = IdentifierValidator::validate_reason_code("07");
        assert!(!rejected.is_valid());
        assert_eq!(rejected.outcome.errors(), ["Reason code 07 must be one of 00, 01, 02, 03, 04"]);
    }

    #[test]
    fn test_chain_code_structure() {
        assert!(IdentifierValidator::validate_chain_code("krg").is_valid());
        assert!(!IdentifierValidator::validate_chain_code("").is_valid());
        assert!(!IdentifierValidator::validate_chain_code("W-MT").is_valid());
        assert!(!IdentifierValidator::validate_chain_code("ABCDEFGHIJK").is_valid());
    }

    #[test]
    fn test_record_count_and_paths() {
        assert!(IdentifierValidator::validate_record_count(1, 2_000_000).is_valid());
        assert!(IdentifierValidator::validate_record_count(2_000_000, 2_000_000).is_valid());
        assert!(!IdentifierValidator::validate_record_count(0, 2_000_000).is_valid());
        assert!(!IdentifierValidator::validate_record_count(2_000_001, 2_000_000).is_valid());

        let dir = IdentifierValidator::validate_output_dir("  \"C:\\VRR Output\" ");
        assert_eq!(dir.value.as_deref(), Some("C:\\VRR Output"));
        assert!(!IdentifierValidator::validate_output_dir(" \"\" ").is_valid());
    }

    #[test]
    fn test_unit_of_measure() {
        assert_eq!(IdentifierValidator::validate_unit_of_measure(" ea ").value.as_deref(), Some("EA"));
        let blank = IdentifierValidator::validate_unit_of_measure("");
        assert!(blank.is_valid());
        assert!(blank.value.is_none());
        assert!(!IdentifierValidator::validate_unit_of_measure("EACH").is_valid());
        assert!(!IdentifierValidator::validate_unit_of_measure("E1").is_valid());
    }

    #[test]
    fn test_outcome_merge_keeps_order() {
        let mut outcome = ValidationOutcome::failed("first");
        outcome.merge(ValidationOutcome::failed("second"));
        assert_eq!(outcome.error_message(), "first\nsecond");
    }
}
