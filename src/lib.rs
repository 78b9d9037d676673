// Public modules
pub mod config;
pub mod database;
pub mod domains;
pub mod errors;
pub mod globals;
pub mod validation;

pub use config::AppConfig;
pub use domains::export::{ExportRequest, ExportService, ExportSummary};

/// Initialize logging and global state with the given configuration.
/// Must be called before the global accessors in [`globals`] are used.
pub fn initialize(config: AppConfig) -> errors::ServiceResult<()> {
    globals::initialize(config)
}

/// Load configuration from the environment (and `.env`), then initialize.
pub fn initialize_from_env() -> errors::ServiceResult<AppConfig> {
    let config = AppConfig::from_env()?;
    globals::initialize(config.clone())?;
    Ok(config)
}

/// Drop all cached reference data for the current session.
pub fn reset_validation_session() -> errors::ServiceResult<()> {
    globals::reset_validation_session()
}
