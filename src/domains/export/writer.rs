use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::domains::export::layout::FilePlan;
use crate::domains::export::progress::ProgressSink;
use crate::domains::export::record::header_line;
use crate::domains::export::source::RecordResolver;
use crate::domains::export::types::ExportError;

pub const DEFAULT_BATCH_SIZE: usize = 5_000;
const WRITE_BUFFER_CAPACITY: usize = 256 * 1024;
/// Rough size of one record line, used to pre-size batch buffers.
const APPROX_LINE_BYTES: usize = 320;

/// Running count of records written in the whole run, so progress stays
/// cumulative across files.
#[derive(Debug, Default)]
pub struct RunProgress {
    written: u64,
    last_reported: Option<u64>,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn advance(&mut self) {
        self.written += 1;
    }

    fn report(&mut self, sink: &dyn ProgressSink) {
        if self.last_reported != Some(self.written) {
            sink.update_progress(self.written);
            self.last_reported = Some(self.written);
        }
    }
}

/// Writes one data file: header line, then records in batches.
#[derive(Debug, Clone, Copy)]
pub struct DataFileWriter {
    batch_size: usize,
}

impl Default for DataFileWriter {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl DataFileWriter {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size: batch_size.max(1) }
    }

    /// Write the records of `plan` to `path` and return the number of record
    /// lines written. Progress is reported after the first record of the
    /// run, every `max(1, plan.count / 100)` records, and after each batch.
    pub async fn write_file(
        &self,
        path: &Path,
        plan: &FilePlan,
        resolver: &RecordResolver,
        progress: &mut RunProgress,
        sink: &dyn ProgressSink,
    ) -> Result<u64, ExportError> {
        let file = File::create(path).await.map_err(|e| ExportError::io(path, e))?;
        let mut out = BufWriter::with_capacity(WRITE_BUFFER_CAPACITY, file);

        let mut header = header_line();
        header.push('\n');
        out.write_all(header.as_bytes())
            .await
            .map_err(|e| ExportError::io(path, e))?;

        let update_frequency = (plan.count / 100).max(1);
        let batch_size = self.batch_size as u64;
        let mut lines = 0u64;
        let mut batch = String::with_capacity(self.batch_size.min(plan.count as usize) * APPROX_LINE_BYTES);

        let end = plan.start + plan.count;
        let mut batch_start = plan.start;
        while batch_start < end {
            let batch_end = (batch_start + batch_size).min(end);
            batch.clear();
            for position in batch_start..batch_end {
                resolver.resolve(position).write_line(&mut batch);
                lines += 1;
                progress.advance();
                if progress.written() == 1 || lines % update_frequency == 0 {
                    progress.report(sink);
                }
            }
            out.write_all(batch.as_bytes())
                .await
                .map_err(|e| ExportError::io(path, e))?;
            progress.report(sink);
            log::debug!(
                "{}: wrote records {}..{}",
                path.display(),
                batch_start,
                batch_end
            );
            batch_start = batch_end;
        }

        out.flush().await.map_err(|e| ExportError::io(path, e))?;
        out.into_inner()
            .sync_all()
            .await
            .map_err(|e| ExportError::io(path, e))?;
        Ok(lines)
    }
}
