use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Parameters of one export run as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub execution_id: String,
    pub chain_code: String,
    pub pid: String,
    #[serde(default)]
    pub hid: Option<String>,
    pub ndc: String,
    pub reason_code: String,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    pub record_count: u64,
    pub output_dir: String,
}

/// Where the records of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSourceKind {
    /// Only procedurally generated records.
    Procedural,
    /// Fetched outbound rows, topped up procedurally past the fetched count.
    Fetched { rows: usize },
}

/// Phases of one export run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Preparing,
    WritingData { file_index: usize, file_count: usize },
    WritingManifest,
    Completed,
    Failed,
}

/// A data file fully written during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFileInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub record_count: u64,
}

/// Summary returned to the caller after a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub output_dir: PathBuf,
    /// True when the requested directory was not writable and the fallback
    /// directory was used instead.
    pub redirected: bool,
    pub data_files: Vec<DataFileInfo>,
    pub manifest_file: String,
    pub archive_file: String,
    pub archive_written: bool,
    pub total_records: u64,
    pub source: RecordSourceKind,
}

/// Errors raised by the export engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportError {
    /// Request rejected before any I/O
    Validation(Vec<String>),
    /// Invalid configuration or run parameters
    InvalidConfig(String),
    /// Probe file held by another process
    FileInUse(String),
    /// I/O failure on a path
    Io { path: String, message: String },
    /// Data source failure that could not be absorbed
    Database(String),
    /// Archive packaging failure
    Archive(String),
    /// Another run is already in progress on this engine
    Busy,
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Validation(errors) => write!(f, "Validation failed: {}", errors.join("; ")),
            ExportError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ExportError::FileInUse(path) => write!(f, "File {} is in use by another process", path),
            ExportError::Io { path, message } => write!(f, "I/O error on {}: {}", path, message),
            ExportError::Database(msg) => write!(f, "Database error: {}", msg),
            ExportError::Archive(msg) => write!(f, "Archive error: {}", msg),
            ExportError::Busy => write!(f, "An export is already running"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<crate::errors::DbError> for ExportError {
    fn from(error: crate::errors::DbError) -> Self {
        ExportError::Database(error.describe())
    }
}
