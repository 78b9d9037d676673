use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::domains::export::types::{DataFileInfo, ExportError};

pub const MANIFEST_HEADER: &str = "Data_Filename|Total_Record_Count|ChainFileAbbrev|ZipFileName";
pub const MANIFEST_DELIMITER: char = '|';

/// One manifest row, describing one completed data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub data_file_name: String,
    pub record_count: u64,
    pub chain_code: String,
    pub archive_name: String,
}

impl ManifestEntry {
    pub fn to_row(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.data_file_name, self.record_count, self.chain_code, self.archive_name
        )
    }

    pub fn parse_row(row: &str) -> Option<Self> {
        let mut parts = row.split(MANIFEST_DELIMITER);
        let entry = ManifestEntry {
            data_file_name: parts.next()?.to_string(),
            record_count: parts.next()?.parse().ok()?,
            chain_code: parts.next()?.to_string(),
            archive_name: parts.next()?.to_string(),
        };
        match parts.next() {
            Some(_) => None,
            None => Some(entry),
        }
    }
}

/// Manifest rows for the files of a run, in creation order.
pub fn manifest_entries(files: &[DataFileInfo], chain_code: &str, archive_name: &str) -> Vec<ManifestEntry> {
    files
        .iter()
        .map(|f| ManifestEntry {
            data_file_name: f.file_name.clone(),
            record_count: f.record_count,
            chain_code: chain_code.to_string(),
            archive_name: archive_name.to_string(),
        })
        .collect()
}

/// Write the trigger file. Callers only reach this once every listed data
/// file has been written completely.
pub async fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<(), ExportError> {
    let mut content = String::with_capacity(MANIFEST_HEADER.len() + 1 + entries.len() * 96);
    content.push_str(MANIFEST_HEADER);
    content.push('\n');
    for entry in entries {
        content.push_str(&entry.to_row());
        content.push('\n');
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ExportError::io(path, e))?;
    file.write_all(content.as_bytes())
        .await
        .map_err(|e| ExportError::io(path, e))?;
    file.sync_all().await.map_err(|e| ExportError::io(path, e))?;
    log::info!("Manifest written: {} ({} data files)", path.display(), entries.len());
    Ok(())
}

/// Parse a trigger file back into its rows.
pub async fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ExportError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ExportError::io(path, e))?;
    let mut lines = content.lines();
    match lines.next() {
        Some(MANIFEST_HEADER) => {}
        _ => {
            return Err(ExportError::InvalidConfig(format!(
                "{} is not a manifest file",
                path.display()
            )))
        }
    }
    lines
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            ManifestEntry::parse_row(l)
                .ok_or_else(|| ExportError::InvalidConfig(format!("Malformed manifest row: {}", l)))
        })
        .collect()
}
