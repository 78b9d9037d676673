use lazy_static::lazy_static;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::domains::reference::ValidationCache;
use crate::errors::{ServiceError, ServiceResult};

// Global state definitions
lazy_static! {
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);
    static ref APP_CONFIG: Mutex<Option<AppConfig>> = Mutex::new(None);
    static ref VALIDATION_CACHE: Mutex<Option<Arc<ValidationCache>>> = Mutex::new(None);
}

/// Set up logging, store `config`, and open a fresh validation session.
/// Calling it again replaces the configuration and keeps the session cache.
pub fn initialize(config: AppConfig) -> ServiceResult<()> {
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::try_init();

    config.validate()?;
    log::debug!("Configuration: {:?}", config);

    *APP_CONFIG
        .lock()
        .map_err(|_| ServiceError::ServiceUnavailable("APP_CONFIG lock poisoned".to_string()))? = Some(config);

    let mut cache = VALIDATION_CACHE
        .lock()
        .map_err(|_| ServiceError::ServiceUnavailable("VALIDATION_CACHE lock poisoned".to_string()))?;
    if cache.is_none() {
        *cache = Some(Arc::new(ValidationCache::new()));
    }

    INITIALIZED.store(true, Ordering::Release);
    log::info!("Initialization complete");
    Ok(())
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

pub fn get_config() -> ServiceResult<AppConfig> {
    APP_CONFIG
        .lock()
        .map_err(|_| ServiceError::ServiceUnavailable("APP_CONFIG lock poisoned".to_string()))?
        .clone()
        .ok_or_else(|| ServiceError::ServiceUnavailable("Configuration not initialized".to_string()))
}

/// The session's validation cache.
pub fn get_validation_cache() -> ServiceResult<Arc<ValidationCache>> {
    VALIDATION_CACHE
        .lock()
        .map_err(|_| ServiceError::ServiceUnavailable("VALIDATION_CACHE lock poisoned".to_string()))?
        .clone()
        .ok_or_else(|| ServiceError::ServiceUnavailable("Validation cache not initialized".to_string()))
}

/// Drop every cached reference lookup, e.g. when validation is re-enabled
/// after a reconnect.
pub fn reset_validation_session() -> ServiceResult<()> {
    let cache = get_validation_cache()?;
    cache.clear_all();
    log::info!("Validation session reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::reference::SetKey;
    use std::collections::HashSet;

    #[tokio::test]
    async fn initialize_then_reset_session() {
        initialize(AppConfig::default()).unwrap();
        assert!(is_initialized());
        assert_eq!(get_config().unwrap().batch_size, AppConfig::default().batch_size);

        let cache = get_validation_cache().unwrap();
        cache
            .get_or_load_set(&SetKey::DrugCodes, || async {
                Ok::<_, crate::errors::DbError>(HashSet::from(["12345678901".to_string()]))
            })
            .await
            .unwrap();
        assert!(cache.is_cached(&SetKey::DrugCodes));

        // same session cache after re-initialising
        initialize(AppConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&cache, &get_validation_cache().unwrap()));

        reset_validation_session().unwrap();
        assert!(!cache.is_cached(&SetKey::DrugCodes));
    }
}
