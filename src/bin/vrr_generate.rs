//! vrr_generate: write VRR inbound data files and their trigger file.

use clap::Parser;
use std::sync::Arc;

use vrr_inbound_generator::config::AppConfig;
use vrr_inbound_generator::database::{QueryExecutor, SqliteQueryExecutor};
use vrr_inbound_generator::domains::export::{
    ChannelProgressSink, ExportRequest, ExportService, ProgressEvent, ProgressState,
};
use vrr_inbound_generator::errors::ServiceError;
use vrr_inbound_generator::globals;

#[derive(Parser)]
#[command(name = "vrr_generate")]
#[command(about = "Generate VRR inbound files for a request execution id")]
#[command(version)]
struct Cli {
    /// Request execution id (5 to 500 characters)
    #[arg(short, long)]
    execution_id: String,

    /// Chain abbreviation, e.g. WMT or CPH
    #[arg(short, long)]
    chain: String,

    /// Pharmacy identifier
    #[arg(short, long)]
    pid: String,

    /// Secondary pharmacy identifier
    #[arg(long)]
    hid: Option<String>,

    /// Drug code, 10 or 11 digits (separators allowed)
    #[arg(short, long)]
    ndc: String,

    /// Reason code, e.g. 00 or "02 - Covered Entity account exists but not active"
    #[arg(short, long, default_value = "00")]
    reason_code: String,

    /// Unit of measure; the first known unit is used when omitted
    #[arg(short, long)]
    unit_of_measure: Option<String>,

    /// Number of records to generate
    #[arg(short = 'N', long)]
    records: u64,

    /// Output directory (defaults to VRR_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Reference database URL (defaults to VRR_DATABASE_URL)
    #[arg(long, env = "VRR_DATABASE_URL")]
    database_url: Option<String>,

    /// Skip reference data checks and use basic validation only
    #[arg(long)]
    no_db_validation: bool,

    /// Also bundle the output into the archive named by the trigger file
    #[arg(long)]
    archive: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

async fn connect(url: &str) -> Option<Arc<dyn QueryExecutor>> {
    let executor = match SqliteQueryExecutor::connect(url).await {
        Ok(executor) => executor,
        Err(e) => {
            log::warn!("Database connection failed ({}), using basic validation only", e.describe());
            return None;
        }
    };
    let (ok, message) = executor.test_connection().await;
    if ok {
        log::info!("{}", message);
        Some(Arc::new(executor))
    } else {
        log::warn!("{}; using basic validation only", message);
        None
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if cli.database_url.is_some() {
        config.database_url = cli.database_url.clone();
    }
    if cli.no_db_validation {
        config.use_database_validation = false;
    }
    if cli.archive {
        config.package_archive = true;
    }
    globals::initialize(config.clone())?;

    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .ok_or("no output directory: pass --output-dir or set VRR_OUTPUT_DIR")?;

    let executor = match (&config.database_url, config.use_database_validation) {
        (Some(url), true) => connect(url).await,
        _ => None,
    };
    let service = ExportService::from_config(&config, globals::get_validation_cache()?, executor);

    let request = ExportRequest {
        execution_id: cli.execution_id,
        chain_code: cli.chain,
        pid: cli.pid,
        hid: cli.hid,
        ndc: cli.ndc,
        reason_code: cli.reason_code,
        unit_of_measure: cli.unit_of_measure,
        record_count: cli.records,
        output_dir,
    };

    let (sink, mut events) = ChannelProgressSink::channel(256);
    let report = async move {
        let mut state = ProgressState::new();
        while let Some(event) = events.recv().await {
            match event {
                ProgressEvent::Started { total } => state.start(total),
                ProgressEvent::Progress { current } => {
                    if let Some(text) = state.update(current) {
                        eprint!("\r{}", text);
                    }
                }
                ProgressEvent::Status(text) => log::info!("{}", text),
                ProgressEvent::Completed => {
                    state.complete();
                    eprintln!("\r{}", state.status());
                }
                ProgressEvent::Failed(message) => {
                    state.fail(&message);
                    eprintln!("\r{}", state.status());
                }
                ProgressEvent::Reset => state.reset(),
            }
        }
    };
    let (result, ()) = futures::join!(service.export(&request, Arc::new(sink)), report);

    let summary = match result {
        Ok(summary) => summary,
        Err(ServiceError::Rejected(errors)) => {
            eprintln!("Validation failed:\n{}", errors.join("\n"));
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if summary.redirected {
            println!("Access denied to requested path, files written to {}", summary.output_dir.display());
        }
        for file in &summary.data_files {
            println!("{}  {} records", file.file_name, file.record_count);
        }
        println!("{}  (trigger)", summary.manifest_file);
        if summary.archive_written {
            println!("{}  (archive)", summary.archive_file);
        }
        println!(
            "{} records in {} files, {} ms",
            summary.total_records,
            summary.data_files.len(),
            summary.duration_ms
        );
    }
    Ok(())
}
