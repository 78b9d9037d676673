pub mod archive;
pub mod engine;
pub mod layout;
pub mod manifest;
pub mod naming;
pub mod paths;
pub mod progress;
pub mod record;
pub mod repository;
pub mod service;
pub mod source;
pub mod types;
pub mod validator;
pub mod writer;

pub use engine::{EngineSettings, ExportEngine, ExportJob};
pub use layout::{plan_files, FilePlan};
pub use manifest::{write_manifest, ManifestEntry};
pub use naming::FileNaming;
pub use paths::{OutputPathPolicy, ResolvedOutput};
pub use progress::{ChannelProgressSink, LogProgressSink, ProgressEvent, ProgressSink, ProgressState};
pub use record::{header_line, Column, NormalizedRecord};
pub use repository::{OutboundRepository, SqlOutboundRepository};
pub use service::ExportService;
pub use source::{RecordDefaults, RecordResolver, RecordSourceResolver};
pub use types::{DataFileInfo, ExportError, ExportRequest, ExportSummary, RecordSourceKind, RunState};
pub use validator::{RequestValidator, ValidatedRequest};
pub use writer::DataFileWriter;
