use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::Namespace;
use crate::clock::Clock;
use crate::error::Result;
use crate::store::Store;

pub(crate) type Value = Arc<dyn Any + Send + Sync>;
pub(crate) type Loader = Arc<dyn Fn(&dyn Store) -> Result<Value> + Send + Sync>;

pub(crate) struct CachedItem {
    value: Value,
    loader: Loader,
    created_at: Instant,
    last_access: Instant,
    last_updated: Instant,
}

#[derive(Default)]
struct CacheState {
    namespaces: HashMap<Namespace, HashMap<String, CachedItem>>,
}

/// Everything the overlay and its background workers share.
///
/// A single mutex guards the cache for the whole duration of every operation,
/// including the backing store call on a miss.
pub(crate) struct Shared {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
    ttl: Mutex<Duration>,
}

impl Shared {
    pub(crate) fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            state: Mutex::new(CacheState::default()),
            ttl: Mutex::new(ttl),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn ttl(&self) -> Duration {
        *self.ttl.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_ttl(&self, ttl: Duration) {
        *self.ttl.lock().unwrap_or_else(|e| e.into_inner()) = ttl;
    }

    /// Serves `(namespace, key)` from the cache, loading it through `load` on a miss.
    /// Failed loads are returned as-is and leave nothing behind.
    pub(crate) fn cached<T, F>(&self, namespace: Namespace, key: String, load: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&dyn Store) -> Result<T> + Send + Sync + 'static,
    {
        let mut state = self.state();
        let now = self.clock.now();

        if let Some(item) = state
            .namespaces
            .get_mut(&namespace)
            .and_then(|items| items.get_mut(&key))
        {
            if let Some(value) = item.value.downcast_ref::<T>() {
                item.last_access = now;
                debug!(%namespace, key, "cache hit");
                return Ok(value.clone());
            }
        }

        debug!(%namespace, key, "cache miss");
        let loaded = load(self.store())?;

        let load = Arc::new(load);
        let loader: Loader = Arc::new(move |store: &dyn Store| {
            let value = load(store)?;
            Ok(Arc::new(value) as Value)
        });

        state.namespaces.entry(namespace).or_default().insert(
            key,
            CachedItem {
                value: Arc::new(loaded.clone()),
                loader,
                created_at: now,
                last_access: now,
                last_updated: now,
            },
        );

        Ok(loaded)
    }

    /// Drops every cached value, then runs the write against the store.
    pub(crate) fn invalidate<R>(&self, write: impl FnOnce(&dyn Store) -> Result<R>) -> Result<R> {
        let mut state = self.state();
        state.namespaces.clear();
        write(self.store())
    }

    /// Evicts every item not accessed within the TTL. Returns how many were evicted.
    pub(crate) fn collect_garbage(&self) -> usize {
        let ttl = self.ttl();
        let mut state = self.state();
        let now = self.clock.now();

        let mut evicted = 0;
        for (namespace, items) in &mut state.namespaces {
            let before = items.len();
            items.retain(|key, item| {
                let keep = now.saturating_duration_since(item.last_access) <= ttl;
                if !keep {
                    let age = now.saturating_duration_since(item.created_at);
                    debug!(%namespace, key, ?age, "evicting cached value");
                }
                keep
            });
            evicted += before - items.len();
        }
        state.namespaces.retain(|_, items| !items.is_empty());

        evicted
    }

    /// Reloads every cached value in place. Failed reloads keep the old value.
    /// Returns how many items were refreshed.
    pub(crate) fn refresh(&self) -> usize {
        let mut state = self.state();
        let now = self.clock.now();

        let mut refreshed = 0;
        for (namespace, items) in &mut state.namespaces {
            for (key, item) in items.iter_mut() {
                match (item.loader)(self.store()) {
                    Ok(value) => {
                        item.value = value;
                        item.last_updated = now;
                        refreshed += 1;
                    }
                    Err(e) => warn!(%namespace, key, "failed to refresh cached value: {e}"),
                }
            }
        }

        refreshed
    }

    pub(crate) fn len(&self) -> usize {
        self.state().namespaces.values().map(HashMap::len).sum()
    }

    pub(crate) fn contains(&self, namespace: Namespace, key: &str) -> bool {
        self.state()
            .namespaces
            .get(&namespace)
            .is_some_and(|items| items.contains_key(key))
    }

    pub(crate) fn last_updated(&self, namespace: Namespace, key: &str) -> Option<Instant> {
        self.state()
            .namespaces
            .get(&namespace)
            .and_then(|items| items.get(key))
            .map(|item| item.last_updated)
    }
}
