use crate::domains::export::types::ExportError;

/// One data file's slice of the run: `count` records starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePlan {
    pub index: usize,
    pub start: u64,
    pub count: u64,
}

impl FilePlan {
    /// 1-based sequence number used in the file name.
    pub fn sequence(&self) -> usize {
        self.index + 1
    }
}

/// Split `total` records into files of at most `max_per_file` records.
pub fn plan_files(total: u64, max_per_file: u64) -> Result<Vec<FilePlan>, ExportError> {
    if total == 0 {
        return Err(ExportError::InvalidConfig("record count must be at least 1".to_string()));
    }
    if max_per_file == 0 {
        return Err(ExportError::InvalidConfig("max records per file must be at least 1".to_string()));
    }
    let file_count = total.div_ceil(max_per_file);
    Ok((0..file_count)
        .map(|k| {
            let start = k * max_per_file;
            FilePlan {
                index: k as usize,
                start,
                count: max_per_file.min(total - start),
            }
        })
        .collect())
}
