use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::domains::export::engine::DEFAULT_MAX_RECORDS_PER_FILE;
use crate::domains::export::paths::OutputPathPolicy;
use crate::domains::export::validator::DEFAULT_MAX_RECORD_COUNT;
use crate::domains::export::writer::DEFAULT_BATCH_SIZE;
use crate::errors::{ServiceError, ServiceResult};

pub const DEFAULT_OUTBOUND_FETCH_LIMIT: u32 = 100;

pub const ENV_DATABASE_URL: &str = "VRR_DATABASE_URL";
pub const ENV_OUTPUT_DIR: &str = "VRR_OUTPUT_DIR";
pub const ENV_FALLBACK_DIR: &str = "VRR_FALLBACK_DIR";
pub const ENV_MAX_RECORDS_PER_FILE: &str = "VRR_MAX_RECORDS_PER_FILE";
pub const ENV_BATCH_SIZE: &str = "VRR_BATCH_SIZE";
pub const ENV_MAX_RECORD_COUNT: &str = "VRR_MAX_RECORD_COUNT";
pub const ENV_OUTBOUND_FETCH_LIMIT: &str = "VRR_OUTBOUND_FETCH_LIMIT";
pub const ENV_PACKAGE_ARCHIVE: &str = "VRR_PACKAGE_ARCHIVE";
pub const ENV_USE_DATABASE_VALIDATION: &str = "VRR_USE_DATABASE_VALIDATION";

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub output_dir: Option<String>,
    pub fallback_dir: Option<String>,
    pub max_records_per_file: u64,
    pub batch_size: usize,
    pub max_record_count: u64,
    pub outbound_fetch_limit: u32,
    pub package_archive: bool,
    pub use_database_validation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            output_dir: None,
            fallback_dir: None,
            max_records_per_file: DEFAULT_MAX_RECORDS_PER_FILE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_record_count: DEFAULT_MAX_RECORD_COUNT,
            outbound_fetch_limit: DEFAULT_OUTBOUND_FETCH_LIMIT,
            package_archive: false,
            use_database_validation: true,
        }
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> ServiceResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::Configuration(format!("{} must be a number, got '{}'", name, raw)))
}

fn parse_flag(name: &str, raw: &str) -> ServiceResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ServiceError::Configuration(format!(
            "{} must be true or false, got '{}'",
            name, raw
        ))),
    }
}

impl AppConfig {
    /// Read settings from the process environment after loading `.env`.
    pub fn from_env() -> ServiceResult<Self> {
        if let Ok(path) = dotenv::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any name -> value lookup. Unset or blank values
    /// keep their defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.database_url = get(ENV_DATABASE_URL);
        config.output_dir = get(ENV_OUTPUT_DIR);
        config.fallback_dir = get(ENV_FALLBACK_DIR);
        if let Some(raw) = get(ENV_MAX_RECORDS_PER_FILE) {
            config.max_records_per_file = parse_number(ENV_MAX_RECORDS_PER_FILE, &raw)?;
        }
        if let Some(raw) = get(ENV_BATCH_SIZE) {
            config.batch_size = parse_number(ENV_BATCH_SIZE, &raw)?;
        }
        if let Some(raw) = get(ENV_MAX_RECORD_COUNT) {
            config.max_record_count = parse_number(ENV_MAX_RECORD_COUNT, &raw)?;
        }
        if let Some(raw) = get(ENV_OUTBOUND_FETCH_LIMIT) {
            config.outbound_fetch_limit = parse_number(ENV_OUTBOUND_FETCH_LIMIT, &raw)?;
        }
        if let Some(raw) = get(ENV_PACKAGE_ARCHIVE) {
            config.package_archive = parse_flag(ENV_PACKAGE_ARCHIVE, &raw)?;
        }
        if let Some(raw) = get(ENV_USE_DATABASE_VALIDATION) {
            config.use_database_validation = parse_flag(ENV_USE_DATABASE_VALIDATION, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.max_records_per_file == 0 {
            return Err(ServiceError::Configuration(format!(
                "{} must be at least 1",
                ENV_MAX_RECORDS_PER_FILE
            )));
        }
        if self.batch_size == 0 {
            return Err(ServiceError::Configuration(format!("{} must be at least 1", ENV_BATCH_SIZE)));
        }
        if self.max_record_count == 0 {
            return Err(ServiceError::Configuration(format!(
                "{} must be at least 1",
                ENV_MAX_RECORD_COUNT
            )));
        }
        Ok(())
    }

    pub fn fallback_dir(&self) -> PathBuf {
        self.fallback_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(OutputPathPolicy::default_fallback_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.max_records_per_file, 200_000);
        assert_eq!(config.batch_size, 5_000);
        assert_eq!(config.max_record_count, 2_000_000);
        assert!(config.use_database_validation);
        assert!(!config.package_archive);
        assert!(config.fallback_dir().ends_with("VRROutput"));
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_DATABASE_URL, "sqlite://vrr.db"),
            (ENV_MAX_RECORDS_PER_FILE, " 1000 "),
            (ENV_PACKAGE_ARCHIVE, "yes"),
            (ENV_USE_DATABASE_VALIDATION, "false"),
            (ENV_FALLBACK_DIR, "/data/vrr"),
            (ENV_OUTPUT_DIR, "  "),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite://vrr.db"));
        assert_eq!(config.max_records_per_file, 1_000);
        assert!(config.package_archive);
        assert!(!config.use_database_validation);
        assert_eq!(config.fallback_dir(), PathBuf::from("/data/vrr"));
        assert_eq!(config.output_dir, None);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_BATCH_SIZE, "lots")])).unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(ref msg) if msg.contains(ENV_BATCH_SIZE)));
        assert!(AppConfig::from_lookup(lookup(&[(ENV_PACKAGE_ARCHIVE, "maybe")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(ENV_MAX_RECORDS_PER_FILE, "0")])).is_err());
    }
}
