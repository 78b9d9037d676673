use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAIN_CODE: &str = "DEFAULT";
pub const DEFAULT_MAX_PID_LENGTH: usize = 10;

pub const DATA_FILE_PREFIX: &str = "MH340BVRR_Recon_Daily_Data";
pub const TRIGGER_FILE_PREFIX: &str = "MH340BVRR_Recon_Daily_Trigger";
pub const ARCHIVE_PREFIX: &str = "MH340BVRR_Recon_Daily";

/// `{prefix}`, `{seq}`, `{chain}` and `{date}` are substituted when naming
/// a data file.
pub const DEFAULT_FILE_NAME_FORMAT: &str = "{prefix}_{seq}_{chain}_{date}.txt";

/// Per-chain validation limits and file naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfiguration {
    pub chain_code: String,
    pub max_pid_length: usize,
    pub file_name_format: String,
    pub data_file_prefix: String,
    pub trigger_file_prefix: String,
    pub archive_prefix: String,
}

impl ChainConfiguration {
    pub fn standard(chain_code: &str) -> Self {
        Self {
            chain_code: chain_code.to_string(),
            max_pid_length: DEFAULT_MAX_PID_LENGTH,
            file_name_format: DEFAULT_FILE_NAME_FORMAT.to_string(),
            data_file_prefix: DATA_FILE_PREFIX.to_string(),
            trigger_file_prefix: TRIGGER_FILE_PREFIX.to_string(),
            archive_prefix: ARCHIVE_PREFIX.to_string(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.chain_code == DEFAULT_CHAIN_CODE
    }
}

impl Default for ChainConfiguration {
    fn default() -> Self {
        Self::standard(DEFAULT_CHAIN_CODE)
    }
}
