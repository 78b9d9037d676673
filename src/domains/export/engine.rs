use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

use crate::domains::chain::ChainConfiguration;
use crate::domains::export::archive::package_archive;
use crate::domains::export::layout::plan_files;
use crate::domains::export::manifest::{manifest_entries, write_manifest};
use crate::domains::export::naming::FileNaming;
use crate::domains::export::paths::OutputPathPolicy;
use crate::domains::export::progress::{GuardedProgressSink, ProgressSink};
use crate::domains::export::source::RecordResolver;
use crate::domains::export::types::{DataFileInfo, ExportError, ExportSummary, RunState};
use crate::domains::export::writer::{DataFileWriter, RunProgress, DEFAULT_BATCH_SIZE};

pub const DEFAULT_MAX_RECORDS_PER_FILE: u64 = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_records_per_file: u64,
    pub batch_size: usize,
    /// Bundle data files and manifest into the archive after the manifest.
    pub package_archive: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_records_per_file: DEFAULT_MAX_RECORDS_PER_FILE,
            batch_size: DEFAULT_BATCH_SIZE,
            package_archive: false,
        }
    }
}

/// A validated run: what to write and where.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Normalized chain code used in file names and the manifest.
    pub chain_code: String,
    pub chain: ChainConfiguration,
    pub record_count: u64,
    pub output_dir: String,
    pub run_date: NaiveDate,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives one run at a time through
/// `Preparing -> WritingData -> WritingManifest -> Completed`, or `Failed`.
///
/// A failed run leaves completed data files on disk but never writes a
/// manifest for them.
pub struct ExportEngine {
    settings: EngineSettings,
    paths: OutputPathPolicy,
    state: Mutex<RunState>,
    running: AtomicBool,
}

impl ExportEngine {
    pub fn new(settings: EngineSettings, paths: OutputPathPolicy) -> Self {
        Self {
            settings,
            paths,
            state: Mutex::new(RunState::Idle),
            running: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, state: RunState) {
        log::debug!("export state -> {:?}", state);
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = state;
    }

    pub async fn run(
        &self,
        job: &ExportJob,
        resolver: &RecordResolver,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<ExportSummary, ExportError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("export requested while another run is in progress");
            return Err(ExportError::Busy);
        }
        let _guard = RunGuard(&self.running);
        let sink = GuardedProgressSink::new(sink);
        sink.reset();

        match self.execute(job, resolver, &sink).await {
            Ok(summary) => {
                self.set_state(RunState::Completed);
                log::info!(
                    "Export {} completed: {} records in {} files ({} ms)",
                    summary.run_id,
                    summary.total_records,
                    summary.data_files.len(),
                    summary.duration_ms
                );
                sink.complete();
                Ok(summary)
            }
            Err(err) => {
                self.set_state(RunState::Failed);
                log::error!("Export failed: {}", err);
                sink.error(&err.to_string());
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        job: &ExportJob,
        resolver: &RecordResolver,
        sink: &GuardedProgressSink,
    ) -> Result<ExportSummary, ExportError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();

        self.set_state(RunState::Preparing);
        sink.update_status("Preparing output directory");
        let plans = plan_files(job.record_count, self.settings.max_records_per_file)?;
        let policy = self.paths.clone();
        let requested = job.output_dir.clone();
        let resolved = tokio::task::spawn_blocking(move || policy.resolve(&requested))
            .await
            .map_err(|e| ExportError::InvalidConfig(format!("output path task failed: {}", e)))??;
        if resolved.redirected {
            sink.update_status(&format!("Using alternative path: {}", resolved.dir.display()));
        }

        let naming = FileNaming::new(&job.chain, &job.chain_code, job.run_date);
        let archive_name = naming.archive_name();
        let writer = DataFileWriter::new(self.settings.batch_size);
        let mut progress = RunProgress::new();
        let mut data_files = Vec::with_capacity(plans.len());

        sink.start(job.record_count);
        for plan in &plans {
            self.set_state(RunState::WritingData {
                file_index: plan.index,
                file_count: plans.len(),
            });
            let file_name = naming.data_file_name(plan.sequence());
            let path = resolved.dir.join(&file_name);
            log::info!("Writing {} ({} records)", path.display(), plan.count);
            let record_count = writer
                .write_file(&path, plan, resolver, &mut progress, sink)
                .await?;
            data_files.push(DataFileInfo { file_name, path, record_count });
        }

        self.set_state(RunState::WritingManifest);
        sink.update_status("Writing trigger file");
        let manifest_file = naming.manifest_file_name();
        let manifest_path = resolved.dir.join(&manifest_file);
        let entries = manifest_entries(&data_files, &job.chain_code, &archive_name);
        write_manifest(&manifest_path, &entries).await?;

        let archive_written = if self.settings.package_archive {
            let mut inputs: Vec<PathBuf> = data_files.iter().map(|f| f.path.clone()).collect();
            inputs.push(manifest_path);
            package_archive(inputs, resolved.dir.join(&archive_name)).await?;
            true
        } else {
            false
        };

        Ok(ExportSummary {
            run_id,
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
            output_dir: resolved.dir,
            redirected: resolved.redirected,
            total_records: data_files.iter().map(|f| f.record_count).sum(),
            data_files,
            manifest_file,
            archive_file: archive_name,
            archive_written,
            source: resolver.kind(),
        })
    }
}
