use std::collections::HashMap;

use super::types::ChainConfiguration;

/// Trim and uppercase a chain code as typed by the operator.
pub fn normalize_chain_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Read-only lookup of chain configurations with a default fallback.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    known: HashMap<String, ChainConfiguration>,
    default: ChainConfiguration,
}

impl ChainRegistry {
    pub fn new(configs: Vec<ChainConfiguration>, default: ChainConfiguration) -> Self {
        let known = configs
            .into_iter()
            .map(|c| (normalize_chain_code(&c.chain_code), c))
            .collect();
        Self { known, default }
    }

    /// The chains the downstream ingester currently recognises.
    pub fn builtin() -> Self {
        Self::new(
            vec![
                ChainConfiguration::standard("WMT"),
                ChainConfiguration::standard("CPH"),
            ],
            ChainConfiguration::default(),
        )
    }

    /// Always yields a configuration; unknown or blank codes get the default.
    pub fn resolve(&self, chain_code: &str) -> &ChainConfiguration {
        let code = normalize_chain_code(chain_code);
        match self.known.get(&code) {
            Some(config) => config,
            None => {
                if !code.is_empty() {
                    log::info!("chain '{}' has no dedicated configuration, using defaults", code);
                }
                &self.default
            }
        }
    }

    pub fn is_known(&self, chain_code: &str) -> bool {
        self.known.contains_key(&normalize_chain_code(chain_code))
    }

    pub fn known_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.known.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::chain::types::DEFAULT_MAX_PID_LENGTH;

    #[test]
    fn resolves_known_codes_case_insensitively() {
        let registry = ChainRegistry::builtin();
        assert_eq!(registry.resolve(" wmt ").chain_code, "WMT");
        assert_eq!(registry.resolve("CPH").chain_code, "CPH");
        assert!(registry.is_known("cph"));
        assert_eq!(registry.known_codes(), vec!["CPH", "WMT"]);
    }

    #[test]
    fn unknown_code_falls_back_to_default() {
        let registry = ChainRegistry::builtin();
        let config = registry.resolve("KRG");
        assert!(config.is_default());
        assert_eq!(config.max_pid_length, DEFAULT_MAX_PID_LENGTH);
        assert_eq!(config.max_pid_length, 10);
        assert!(registry.resolve("").is_default());
    }

    #[test]
    fn custom_limits_are_honoured() {
        let mut rite = ChainConfiguration::standard("rad");
        rite.max_pid_length = 7;
        let registry = ChainRegistry::new(vec![rite], ChainConfiguration::default());
        assert_eq!(registry.resolve("RAD").max_pid_length, 7);
    }
}
