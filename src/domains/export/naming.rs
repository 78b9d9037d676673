use chrono::NaiveDate;

use crate::domains::chain::{normalize_chain_code, ChainConfiguration};

pub const FILE_DATE_FORMAT: &str = "%Y%m%d";

/// File names for one run. All names share the chain code and run date.
#[derive(Debug, Clone)]
pub struct FileNaming {
    config: ChainConfiguration,
    chain_code: String,
    date: String,
}

impl FileNaming {
    pub fn new(config: &ChainConfiguration, chain_code: &str, date: NaiveDate) -> Self {
        Self {
            config: config.clone(),
            chain_code: normalize_chain_code(chain_code),
            date: date.format(FILE_DATE_FORMAT).to_string(),
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Data file name for a 1-based sequence number.
    pub fn data_file_name(&self, sequence: usize) -> String {
        self.config
            .file_name_format
            .replace("{prefix}", &self.config.data_file_prefix)
            .replace("{seq}", &format!("{:02}", sequence))
            .replace("{chain}", &self.chain_code)
            .replace("{date}", &self.date)
    }

    pub fn manifest_file_name(&self) -> String {
        format!("{}_{}_{}.txt", self.config.trigger_file_prefix, self.chain_code, self.date)
    }

    pub fn archive_name(&self) -> String {
        format!("{}_{}_{}.zip", self.config.archive_prefix, self.chain_code, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming(chain: &str) -> FileNaming {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        FileNaming::new(&ChainConfiguration::standard(chain), chain, date)
    }

    #[test]
    fn data_file_names_are_zero_padded() {
        let naming = naming("wmt");
        assert_eq!(naming.data_file_name(1), "MH340BVRR_Recon_Daily_Data_01_WMT_20261018.txt");
        assert_eq!(naming.data_file_name(12), "MH340BVRR_Recon_Daily_Data_12_WMT_20261018.txt");
    }

    #[test]
    fn manifest_and_archive_names() {
        let naming = naming("CPH");
        assert_eq!(naming.manifest_file_name(), "MH340BVRR_Recon_Daily_Trigger_CPH_20261018.txt");
        assert_eq!(naming.archive_name(), "MH340BVRR_Recon_Daily_CPH_20261018.zip");
    }

    #[test]
    fn custom_template() {
        let mut config = ChainConfiguration::standard("KRG");
        config.file_name_format = "{chain}-{date}-{seq}.dat".to_string();
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let naming = FileNaming::new(&config, "krg", date);
        assert_eq!(naming.data_file_name(3), "KRG-20260105-03.dat");
    }
}
