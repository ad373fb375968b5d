//! Read-through caching overlay for any [`Store`].
//!
//! Reads are served from an in-process cache partitioned by [`Namespace`];
//! every write drops the whole cache before it reaches the backing store.
//! Two background workers keep the cache bounded: a garbage collector that
//! evicts values not read within the TTL, and a refresher that reloads every
//! cached value in place.

mod namespace;
mod state;

pub use namespace::Namespace;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use self::namespace::composite_key;
use self::state::Shared;
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::*;

struct Workers {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

pub struct CacheOverlay {
    shared: Arc<Shared>,
    gc_interval: Duration,
    refresh_interval: Duration,
    workers: Mutex<Option<Workers>>,
}

impl CacheOverlay {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, &CacheConfig::default())
    }

    pub fn with_config(store: Arc<dyn Store>, config: &CacheConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Store>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared::new(store, clock, config.ttl())),
            gc_interval: config.gc_interval(),
            refresh_interval: config.refresh_interval(),
            workers: Mutex::new(None),
        }
    }

    /// Starts the garbage collection and refresh workers on the current tokio
    /// runtime. Calling it again while the workers run does nothing.
    pub fn start(&self) -> Result<()> {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        if workers.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("cache workers need a tokio runtime: {e}")))?;
        let cancel = CancellationToken::new();

        let gc = runtime.spawn(run_gc(
            Arc::clone(&self.shared),
            self.gc_interval,
            cancel.clone(),
        ));
        let refresh = runtime.spawn(run_refresh(
            Arc::clone(&self.shared),
            self.refresh_interval,
            cancel.clone(),
        ));

        *workers = Some(Workers {
            cancel,
            handles: vec![gc, refresh],
        });
        debug!("cache workers started");
        Ok(())
    }

    /// Stops both workers, waits for them to exit, then closes the backing store.
    pub async fn shutdown(&self) -> Result<()> {
        let workers = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(workers) = workers {
            workers.cancel.cancel();
            for handle in workers.handles {
                if let Err(e) = handle.await {
                    warn!("cache worker exited abnormally: {e}");
                }
            }
            debug!("cache workers stopped");
        }

        self.shared.store().close()
    }

    fn cancel_workers(&self) {
        let workers = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(workers) = workers {
            workers.cancel.cancel();
        }
    }

    /// Changes the TTL used by subsequent garbage collection sweeps.
    pub fn set_time_to_live_for_values_to_cache(&self, ttl: Duration) {
        self.shared.set_ttl(ttl);
    }

    #[must_use]
    pub fn time_to_live(&self) -> Duration {
        self.shared.ttl()
    }

    /// Runs one garbage collection sweep. Returns the number of evicted values.
    pub fn collect_garbage(&self) -> usize {
        self.shared.collect_garbage()
    }

    /// Runs one refresh sweep. Returns the number of refreshed values.
    pub fn refresh(&self) -> usize {
        self.shared.refresh()
    }

    /// Number of cached values across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, namespace: Namespace, key: &str) -> bool {
        self.shared.contains(namespace, key)
    }

    #[must_use]
    pub fn last_updated(&self, namespace: Namespace, key: &str) -> Option<Instant> {
        self.shared.last_updated(namespace, key)
    }
}

impl Drop for CacheOverlay {
    fn drop(&mut self) {
        self.cancel_workers();
    }
}

async fn run_gc(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let evicted = shared.collect_garbage();
                if evicted > 0 {
                    debug!(evicted, "cache gc sweep");
                }
            }
        }
    }
}

async fn run_refresh(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let shared = Arc::clone(&shared);
                match tokio::task::spawn_blocking(move || shared.refresh()).await {
                    Ok(refreshed) => debug!(refreshed, "cache refresh sweep"),
                    Err(e) => warn!("cache refresh sweep failed: {e}"),
                }
            }
        }
    }
}

impl Store for CacheOverlay {
    fn create(&self, entity: Entity) -> Result<Entity> {
        self.shared.invalidate(|store| store.create(entity))
    }

    fn find_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
        let id_owned = id.to_string();
        self.shared
            .cached(Namespace::FindById(kind), id.to_string(), move |store: &dyn Store| {
                store.find_by_id(kind, &id_owned)
            })
    }

    fn find_all(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        self.shared
            .cached(Namespace::FindAll(kind), String::new(), move |store: &dyn Store| {
                store.find_all(kind)
            })
    }

    fn update(&self, entity: &Entity) -> Result<()> {
        self.shared.invalidate(|store| store.update(entity))
    }

    fn delete_by_id(&self, kind: EntityKind, id: &str) -> Result<()> {
        self.shared.invalidate(|store| store.delete_by_id(kind, id))
    }

    fn delete_all(&self, kind: EntityKind) -> Result<()> {
        self.shared.invalidate(|store| store.delete_all(kind))
    }

    fn truncate(&self, kind: EntityKind) -> Result<()> {
        self.shared.invalidate(|store| store.truncate(kind))
    }

    fn find_release_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
        let name_owned = name.to_string();
        self.shared.cached(
            Namespace::FindReleaseFlagByName,
            name.to_string(),
            move |store: &dyn Store| store.find_release_flag_by_name(&name_owned),
        )
    }

    fn find_release_flags_by_names(&self, names: &[String]) -> Result<Vec<Flag>> {
        let key = composite_key(names.iter().map(String::as_str));
        let names = names.to_vec();
        self.shared.cached(
            Namespace::FindReleaseFlagsByName,
            key,
            move |store: &dyn Store| store.find_release_flags_by_names(&names),
        )
    }

    fn find_release_flag_pilot_by_pilot_external_id(
        &self,
        flag_id: &str,
        external_id: &str,
    ) -> Result<Option<Pilot>> {
        let key = format!("{flag_id}:{external_id}");
        let (flag_id, external_id) = (flag_id.to_string(), external_id.to_string());
        self.shared.cached(
            Namespace::FindReleaseFlagPilotByPilotExternalId,
            key,
            move |store: &dyn Store| {
                store.find_release_flag_pilot_by_pilot_external_id(&flag_id, &external_id)
            },
        )
    }

    fn find_pilots_by_feature_flag(&self, flag_id: &str) -> Result<Vec<Pilot>> {
        let flag_id_owned = flag_id.to_string();
        self.shared.cached(
            Namespace::FindPilotsByFeatureFlag,
            flag_id.to_string(),
            move |store: &dyn Store| store.find_pilots_by_feature_flag(&flag_id_owned),
        )
    }

    fn find_pilot_entries_by_ext_id(&self, external_id: &str) -> Result<Vec<Pilot>> {
        let external_id_owned = external_id.to_string();
        self.shared.cached(
            Namespace::FindPilotEntriesByExtId,
            external_id.to_string(),
            move |store: &dyn Store| store.find_pilot_entries_by_ext_id(&external_id_owned),
        )
    }

    fn find_release_allows_by_release_flags(&self, flags: &[Flag]) -> Result<Vec<Allow>> {
        let key = composite_key(flags.iter().map(|f| f.id.as_str()));
        let flags = flags.to_vec();
        self.shared.cached(
            Namespace::FindReleaseAllowsByReleaseFlags,
            key,
            move |store: &dyn Store| store.find_release_allows_by_release_flags(&flags),
        )
    }

    fn find_token_by_sha512_hex(&self, sha512_hex: &str) -> Result<Option<Token>> {
        let sha512_hex_owned = sha512_hex.to_string();
        self.shared.cached(
            Namespace::FindTokenBySha512Hex,
            sha512_hex.to_string(),
            move |store: &dyn Store| store.find_token_by_sha512_hex(&sha512_hex_owned),
        )
    }

    /// Stops the workers without waiting for them and closes the backing store.
    /// Prefer [`CacheOverlay::shutdown`] from async code.
    fn close(&self) -> Result<()> {
        self.cancel_workers();
        self.shared.store().close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    use super::*;
    use crate::clock::MockClock;
    use crate::store::MemoryStore;

    /// Counts reads that reach the backing store and can be told to fail them.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        reads: AtomicUsize,
        fail: AtomicBool,
        closed: AtomicBool,
        gate: Mutex<Option<Gate>>,
    }

    /// Parks the next lookup of `name` after it has read the backing store.
    struct Gate {
        name: String,
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl CountingStore {
        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        /// Returns a receiver signalled once the lookup is parked and a
        /// sender that lets it finish.
        fn hold(&self, name: &str) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            *self.gate.lock().unwrap() = Some(Gate {
                name: name.to_string(),
                entered: entered_tx,
                release: release_rx,
            });
            (entered_rx, release_tx)
        }

        fn wait_at_gate(&self, name: &str) {
            let gate = {
                let mut gate = self.gate.lock().unwrap();
                match gate.as_ref() {
                    Some(g) if g.name == name => gate.take(),
                    _ => None,
                }
            };
            if let Some(gate) = gate {
                gate.entered.send(()).unwrap();
                gate.release.recv().unwrap();
            }
        }

        fn read(&self) -> Result<()> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Io(std::io::Error::other("backend unavailable")));
            }
            Ok(())
        }
    }

    impl Store for CountingStore {
        fn create(&self, entity: Entity) -> Result<Entity> {
            self.inner.create(entity)
        }
        fn find_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
            self.read()?;
            self.inner.find_by_id(kind, id)
        }
        fn find_all(&self, kind: EntityKind) -> Result<Vec<Entity>> {
            self.read()?;
            self.inner.find_all(kind)
        }
        fn update(&self, entity: &Entity) -> Result<()> {
            self.inner.update(entity)
        }
        fn delete_by_id(&self, kind: EntityKind, id: &str) -> Result<()> {
            self.inner.delete_by_id(kind, id)
        }
        fn delete_all(&self, kind: EntityKind) -> Result<()> {
            self.inner.delete_all(kind)
        }
        fn truncate(&self, kind: EntityKind) -> Result<()> {
            self.inner.truncate(kind)
        }
        fn find_release_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
            self.read()?;
            let flag = self.inner.find_release_flag_by_name(name)?;
            self.wait_at_gate(name);
            Ok(flag)
        }
        fn find_release_flags_by_names(&self, names: &[String]) -> Result<Vec<Flag>> {
            self.read()?;
            self.inner.find_release_flags_by_names(names)
        }
        fn find_release_flag_pilot_by_pilot_external_id(
            &self,
            flag_id: &str,
            external_id: &str,
        ) -> Result<Option<Pilot>> {
            self.read()?;
            self.inner
                .find_release_flag_pilot_by_pilot_external_id(flag_id, external_id)
        }
        fn find_pilots_by_feature_flag(&self, flag_id: &str) -> Result<Vec<Pilot>> {
            self.read()?;
            self.inner.find_pilots_by_feature_flag(flag_id)
        }
        fn find_pilot_entries_by_ext_id(&self, external_id: &str) -> Result<Vec<Pilot>> {
            self.read()?;
            self.inner.find_pilot_entries_by_ext_id(external_id)
        }
        fn find_release_allows_by_release_flags(&self, flags: &[Flag]) -> Result<Vec<Allow>> {
            self.read()?;
            self.inner.find_release_allows_by_release_flags(flags)
        }
        fn find_token_by_sha512_hex(&self, sha512_hex: &str) -> Result<Option<Token>> {
            self.read()?;
            self.inner.find_token_by_sha512_hex(sha512_hex)
        }
        fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn ttl_config(ttl_secs: u64) -> CacheConfig {
        CacheConfig {
            ttl_secs,
            ..CacheConfig::default()
        }
    }

    fn setup() -> (Arc<CountingStore>, Arc<MockClock>, CacheOverlay) {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(MockClock::new());
        let overlay = CacheOverlay::with_clock(store.clone(), &ttl_config(60), clock.clone());
        (store, clock, overlay)
    }

    fn create_flag(overlay: &CacheOverlay, name: &str, percentage: i32) -> Flag {
        let created = overlay
            .create(Flag::new(name).with_percentage(percentage).into())
            .unwrap();
        Flag::try_from(created).unwrap()
    }

    #[test]
    fn test_hit_does_not_touch_store() {
        let (store, _clock, overlay) = setup();
        create_flag(&overlay, "a", 10);

        let first = overlay.find_release_flag_by_name("a").unwrap().unwrap();
        let second = overlay.find_release_flag_by_name("a").unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(store.reads(), 1);
        assert!(overlay.contains(Namespace::FindReleaseFlagByName, "a"));
    }

    #[test]
    fn test_absent_results_are_cached_too() {
        let (store, _clock, overlay) = setup();

        assert!(overlay.find_release_flag_by_name("missing").unwrap().is_none());
        assert!(overlay.find_release_flag_by_name("missing").unwrap().is_none());
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn test_write_drops_whole_cache() {
        let (store, _clock, overlay) = setup();
        let flag = create_flag(&overlay, "a", 10);

        overlay.find_release_flag_by_name("a").unwrap();
        overlay.find_all(EntityKind::Flag).unwrap();
        overlay.find_pilot_entries_by_ext_id("user-1").unwrap();
        assert_eq!(overlay.len(), 3);

        let mut updated = flag.clone();
        updated.rollout.strategy.percentage = 90;
        overlay.update(&updated.into()).unwrap();
        assert!(overlay.is_empty());

        let fetched = overlay.find_release_flag_by_name("a").unwrap().unwrap();
        assert_eq!(fetched.rollout.strategy.percentage, 90);
        assert_eq!(store.reads(), 4);
    }

    #[test]
    fn test_failed_write_still_invalidates() {
        let (_store, _clock, overlay) = setup();
        overlay.find_all(EntityKind::Flag).unwrap();

        let result = overlay.delete_by_id(EntityKind::Flag, "missing");
        assert!(matches!(result, Err(Error::NotFound)));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_load_errors_propagate_and_are_not_cached() {
        let (store, _clock, overlay) = setup();
        create_flag(&overlay, "a", 10);

        store.fail.store(true, Ordering::SeqCst);
        let result = overlay.find_release_flag_by_name("a");
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(overlay.is_empty());

        store.fail.store(false, Ordering::SeqCst);
        assert!(overlay.find_release_flag_by_name("a").unwrap().is_some());
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_names_key_is_order_independent() {
        let (store, _clock, overlay) = setup();
        create_flag(&overlay, "a", 10);
        create_flag(&overlay, "b", 20);

        let first = overlay
            .find_release_flags_by_names(&["b".to_string(), "a".to_string()])
            .unwrap();
        let second = overlay
            .find_release_flags_by_names(&["a".to_string(), "b".to_string()])
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn test_names_containing_separator_get_their_own_entry() {
        let (store, _clock, overlay) = setup();
        create_flag(&overlay, "a", 100);
        create_flag(&overlay, "b", 100);
        create_flag(&overlay, "a,b", 0);

        let joined = overlay
            .find_release_flags_by_names(&["a,b".to_string()])
            .unwrap();
        let split = overlay
            .find_release_flags_by_names(&["a".to_string(), "b".to_string()])
            .unwrap();

        let names = |flags: &[Flag]| flags.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&joined), vec!["a,b"]);
        let mut split = names(&split);
        split.sort();
        assert_eq!(split, vec!["a", "b"]);
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_miss_blocks_lookups_of_other_keys() {
        let (store, _clock, overlay) = setup();
        create_flag(&overlay, "slow", 10);
        create_flag(&overlay, "fast", 10);

        let (entered, release) = store.hold("slow");
        let (done_tx, done_rx) = mpsc::channel();
        let overlay = &overlay;

        thread::scope(|s| {
            s.spawn(move || overlay.find_release_flag_by_name("slow").unwrap());
            entered.recv().unwrap();

            s.spawn(move || {
                overlay.find_release_flag_by_name("fast").unwrap();
                done_tx.send(()).unwrap();
            });

            let early = done_rx.recv_timeout(Duration::from_millis(200));
            release.send(()).unwrap();

            assert!(early.is_err(), "lookup of another key ran during a load");
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        });

        assert!(overlay.contains(Namespace::FindReleaseFlagByName, "slow"));
        assert!(overlay.contains(Namespace::FindReleaseFlagByName, "fast"));
    }

    #[test]
    fn test_write_racing_a_load_is_seen_by_later_reads() {
        let (store, _clock, overlay) = setup();
        let flag = create_flag(&overlay, "a", 10);

        let (entered, release) = store.hold("a");
        let (done_tx, done_rx) = mpsc::channel();
        let overlay = &overlay;

        thread::scope(|s| {
            let reader = s.spawn(move || overlay.find_release_flag_by_name("a").unwrap());
            entered.recv().unwrap();

            let mut updated = flag.clone();
            updated.rollout.strategy.percentage = 90;
            s.spawn(move || {
                overlay.update(&updated.into()).unwrap();
                done_tx.send(()).unwrap();
            });

            let early = done_rx.recv_timeout(Duration::from_millis(200));
            release.send(()).unwrap();
            assert!(early.is_err(), "write finished while a load held the cache");

            let loaded = reader.join().unwrap().unwrap();
            assert_eq!(loaded.rollout.strategy.percentage, 10);
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        });

        let fetched = overlay.find_release_flag_by_name("a").unwrap().unwrap();
        assert_eq!(fetched.rollout.strategy.percentage, 90);
    }

    #[test]
    fn test_namespaces_are_separate() {
        let (store, _clock, overlay) = setup();
        let flag = create_flag(&overlay, "a", 10);

        overlay.find_by_id(EntityKind::Flag, &flag.id).unwrap();
        overlay.find_by_id(EntityKind::Pilot, &flag.id).unwrap();
        overlay.find_pilots_by_feature_flag(&flag.id).unwrap();

        assert_eq!(store.reads(), 3);
        assert!(overlay.contains(Namespace::FindById(EntityKind::Flag), &flag.id));
        assert!(overlay.contains(Namespace::FindById(EntityKind::Pilot), &flag.id));
        assert!(overlay.contains(Namespace::FindPilotsByFeatureFlag, &flag.id));
    }

    #[test]
    fn test_gc_evicts_values_idle_past_ttl() {
        let (_store, clock, overlay) = setup();
        create_flag(&overlay, "a", 10);
        overlay.find_release_flag_by_name("a").unwrap();

        clock.advance(Duration::from_secs(60));
        assert_eq!(overlay.collect_garbage(), 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(overlay.collect_garbage(), 1);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_access_keeps_value_warm() {
        let (store, clock, overlay) = setup();
        create_flag(&overlay, "a", 10);

        for _ in 0..5 {
            overlay.find_release_flag_by_name("a").unwrap();
            clock.advance(Duration::from_secs(45));
            assert_eq!(overlay.collect_garbage(), 0);
        }
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn test_ttl_change_applies_to_next_sweep() {
        let (_store, clock, overlay) = setup();
        create_flag(&overlay, "a", 10);
        overlay.find_release_flag_by_name("a").unwrap();

        clock.advance(Duration::from_secs(10));
        assert_eq!(overlay.collect_garbage(), 0);

        overlay.set_time_to_live_for_values_to_cache(Duration::from_secs(5));
        assert_eq!(overlay.time_to_live(), Duration::from_secs(5));
        assert_eq!(overlay.collect_garbage(), 1);
    }

    #[test]
    fn test_refresh_reloads_in_place_without_touching_last_access() {
        let (store, clock, overlay) = setup();
        let flag = create_flag(&overlay, "a", 10);
        overlay.find_release_flag_by_name("a").unwrap();
        let loaded_at = overlay
            .last_updated(Namespace::FindReleaseFlagByName, "a")
            .unwrap();

        // Change the backing store behind the overlay's back.
        let mut updated = flag.clone();
        updated.rollout.strategy.percentage = 70;
        store.inner.update(&updated.into()).unwrap();

        clock.advance(Duration::from_secs(30));
        assert_eq!(overlay.refresh(), 1);
        assert!(
            overlay
                .last_updated(Namespace::FindReleaseFlagByName, "a")
                .unwrap()
                > loaded_at
        );

        let reads = store.reads();
        let fetched = overlay.find_release_flag_by_name("a").unwrap().unwrap();
        assert_eq!(fetched.rollout.strategy.percentage, 70);
        assert_eq!(store.reads(), reads);

        // The read above refreshed last_access; the refresh below does not.
        clock.advance(Duration::from_secs(50));
        overlay.refresh();
        clock.advance(Duration::from_secs(11));
        assert_eq!(overlay.collect_garbage(), 1);
    }

    #[test]
    fn test_refresh_keeps_old_value_on_error() {
        let (store, _clock, overlay) = setup();
        create_flag(&overlay, "a", 10);
        overlay.find_release_flag_by_name("a").unwrap();

        store.fail.store(true, Ordering::SeqCst);
        assert_eq!(overlay.refresh(), 0);
        store.fail.store(false, Ordering::SeqCst);

        let reads = store.reads();
        assert!(overlay.find_release_flag_by_name("a").unwrap().is_some());
        assert_eq!(store.reads(), reads);
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let (_store, _clock, overlay) = setup();
        assert!(matches!(overlay.start(), Err(Error::Config(_))));
    }

    #[test]
    fn test_close_closes_backing_store() {
        let (store, _clock, overlay) = setup();
        overlay.close().unwrap();
        assert!(store.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_workers_evict_and_shut_down() {
        let store = Arc::new(CountingStore::default());
        let config = CacheConfig {
            ttl_secs: 0,
            gc_interval_ms: 10,
            ..CacheConfig::default()
        };
        let overlay = CacheOverlay::with_config(store.clone(), &config);

        overlay.start().unwrap();
        overlay.start().unwrap();

        overlay.find_all(EntityKind::Flag).unwrap();
        assert_eq!(overlay.len(), 1);

        let mut evicted = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if overlay.is_empty() {
                evicted = true;
                break;
            }
        }
        assert!(evicted, "gc worker never evicted the idle value");

        overlay.shutdown().await.unwrap();
        assert!(store.closed.load(Ordering::SeqCst));
    }
}
