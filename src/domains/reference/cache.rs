use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::OnceCell;

use crate::errors::{DbError, DbResult};

use super::fallback::scalar_fallback;
use super::types::{CachedScalar, DegradedEvent, ScalarKey, ScalarLookup, SetKey};

type SetSlot = Arc<OnceCell<Arc<HashSet<String>>>>;
type ScalarSlot = Arc<OnceCell<CachedScalar>>;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Lazily populated reference data for one validation session.
///
/// Every key owns a single-flight slot: concurrent callers for the same key
/// wait on one load. A failed load leaves the slot empty so the next call
/// retries. Entries never expire; `clear_all` is the only invalidation.
#[derive(Default)]
pub struct ValidationCache {
    sets: Mutex<HashMap<SetKey, SetSlot>>,
    scalars: Mutex<HashMap<ScalarKey, ScalarSlot>>,
    degraded: Mutex<Vec<DegradedEvent>>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_slot(&self, key: &SetKey) -> SetSlot {
        guard(&self.sets)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn scalar_slot(&self, key: &ScalarKey) -> ScalarSlot {
        guard(&self.scalars)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Cached set for `key`, running `loader` on the first miss only.
    pub async fn get_or_load_set<F, Fut>(&self, key: &SetKey, loader: F) -> DbResult<Arc<HashSet<String>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<HashSet<String>>>,
    {
        let slot = self.set_slot(key);
        let set = slot
            .get_or_try_init(|| async {
                log::info!("loading reference set {}", key);
                let values = loader().await.map_err(|e| {
                    log::error!("failed to load reference set {}: {}", key, e);
                    e
                })?;
                log::info!("cached {} values for {}", values.len(), key);
                Ok::<_, DbError>(Arc::new(values))
            })
            .await?;
        Ok(Arc::clone(set))
    }

    /// Cached scalar for `key`. When the loader fails and the fallback table
    /// has a value for the category, the fallback is returned (not cached) and
    /// a degraded event is recorded. Categories without a fallback propagate
    /// the error.
    pub async fn get_or_load_scalar<F, Fut>(&self, key: &ScalarKey, loader: F) -> DbResult<ScalarLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<CachedScalar>>,
    {
        let slot = self.scalar_slot(key);
        let loaded = slot
            .get_or_try_init(|| async {
                log::debug!("loading reference value {}", key);
                loader().await
            })
            .await;

        match loaded {
            Ok(value) => Ok(ScalarLookup { value: value.clone(), degraded: false }),
            Err(err) => match scalar_fallback(key) {
                Some(value) => {
                    self.record_degraded(
                        key.category(),
                        format!("{} unavailable ({}), using {:?}", key, err.describe(), value),
                    );
                    Ok(ScalarLookup { value, degraded: true })
                }
                None => Err(err),
            },
        }
    }

    pub async fn contains<F, Fut>(&self, key: &SetKey, value: &str, loader: F) -> DbResult<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<HashSet<String>>>,
    {
        let set = self.get_or_load_set(key, loader).await?;
        Ok(set.contains(value))
    }

    /// Drop every cached key. Loads already in flight finish into slots that
    /// are no longer reachable.
    pub fn clear_all(&self) {
        let sets = {
            let mut sets = guard(&self.sets);
            let n = sets.len();
            sets.clear();
            n
        };
        let scalars = {
            let mut scalars = guard(&self.scalars);
            let n = scalars.len();
            scalars.clear();
            n
        };
        log::info!("validation cache cleared ({} sets, {} values)", sets, scalars);
    }

    pub fn is_cached(&self, key: &SetKey) -> bool {
        guard(&self.sets).get(key).map(|slot| slot.initialized()).unwrap_or(false)
    }

    pub fn is_scalar_cached(&self, key: &ScalarKey) -> bool {
        guard(&self.scalars).get(key).map(|slot| slot.initialized()).unwrap_or(false)
    }

    /// Log and remember that a fallback replaced real reference data.
    pub fn record_degraded(&self, category: &str, detail: String) {
        log::warn!(target: "degraded", "[{}] {}", category, detail);
        guard(&self.degraded).push(DegradedEvent {
            category: category.to_string(),
            detail,
            occurred_at: Utc::now(),
        });
    }

    pub fn degraded_events(&self) -> Vec<DegradedEvent> {
        guard(&self.degraded).clone()
    }
}
