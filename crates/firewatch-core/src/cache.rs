use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::Result;
use crate::feeds::FeedUrlSet;
use crate::geometry::DetectionDataset;

#[derive(Debug)]
struct CachedDataset {
    dataset: Arc<DetectionDataset>,
    fetched_at: Instant,
}

type Slot = Arc<OnceCell<CachedDataset>>;

/// Combined datasets keyed by feed URL set. Each key is computed at most once at a
/// time: concurrent callers for one key share a single initialization, and a
/// failed initialization leaves the slot empty for the next caller.
#[derive(Debug, Default)]
pub struct DatasetCache {
    slots: Mutex<HashMap<FeedUrlSet, Slot>>,
    max_age: Option<Duration>,
}

impl DatasetCache {
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    pub async fn get_or_try_init<F, Fut>(&self, key: &FeedUrlSet, init: F) -> Result<Arc<DetectionDataset>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DetectionDataset>>,
    {
        let slot = self.slot(key);
        let fingerprint = key.fingerprint();

        if let Some(cached) = slot.get() {
            debug!(cache_key = %fingerprint, rows = cached.dataset.len(), "dataset cache hit");
            return Ok(Arc::clone(&cached.dataset));
        }

        let cached = slot
            .get_or_try_init(|| async {
                debug!(cache_key = %fingerprint, "dataset cache miss");
                let dataset = init().await?;
                Ok::<_, crate::error::PipelineError>(CachedDataset {
                    dataset: Arc::new(dataset),
                    fetched_at: Instant::now(),
                })
            })
            .await?;
        Ok(Arc::clone(&cached.dataset))
    }

    pub fn invalidate(&self, key: &FeedUrlSet) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the slot for `key`, replacing it first when its entry has expired.
    fn slot(&self, key: &FeedUrlSet) -> Slot {
        let mut slots = self.lock();
        if let (Some(max_age), Some(existing)) = (self.max_age, slots.get(key)) {
            let expired = existing
                .get()
                .is_some_and(|cached| cached.fetched_at.elapsed() > max_age);
            if expired {
                debug!(cache_key = %key.fingerprint(), "dataset cache entry expired");
                slots.remove(key);
            }
        }
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FeedUrlSet, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
