//! Memoized resolutions keyed by prime product.
//!
//! Lookups are synchronous. When a store is attached, new entries are handed
//! to a background worker that writes them through; a failed write is logged
//! and otherwise ignored.

use futures::channel::oneshot;
use lattice_props::{PrimeProduct, PropertyError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::actualize::StructuralContext;
use crate::resolution::Resolution;
use crate::store::CacheStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

enum StoreMessage {
    Put(Arc<Resolution>),
    Clear,
    Flush(oneshot::Sender<()>),
}

struct Entry {
    resolution: Arc<Resolution>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<PrimeProduct, Entry>,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_to(&mut self, limit: usize) {
        while self.entries.len() > limit {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(product, _)| *product)
            else {
                break;
            };
            self.entries.remove(&oldest);
            log::debug!("evicted resolution for {oldest}");
        }
    }
}

pub struct ResolutionCache {
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    capacity: Option<usize>,
    store_tx: Option<smol::channel::Sender<StoreMessage>>,
}

impl ResolutionCache {
    /// A memory-only cache.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            capacity: None,
            store_tx: None,
        }
    }

    /// A cache hydrated from `store` that writes new entries back to it.
    /// An unreadable store leaves the cache empty.
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        let mut cache = Self::new();
        match store.load_all() {
            Ok(resolutions) => {
                log::debug!("hydrated {} cached resolutions", resolutions.len());
                let mut state = cache.state.lock();
                for resolution in resolutions {
                    let last_used = state.tick();
                    state.entries.insert(
                        resolution.product,
                        Entry {
                            resolution: Arc::new(resolution),
                            last_used,
                        },
                    );
                }
            }
            Err(error) => log::warn!("could not load resolution cache: {error}"),
        }
        cache.store_tx = spawn_store_worker(store);
        cache
    }

    /// Keep at most `limit` entries, dropping the least recently used.
    pub fn with_capacity_limit(mut self, limit: usize) -> Self {
        let limit = limit.max(1);
        self.capacity = Some(limit);
        self.state.lock().evict_to(limit);
        self
    }

    /// The context-free resolution for `product`.
    pub fn resolve(&self, product: PrimeProduct) -> Result<Arc<Resolution>, PropertyError> {
        {
            let mut state = self.state.lock();
            let now = state.tick();
            if let Some(entry) = state.entries.get_mut(&product) {
                entry.last_used = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.resolution.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let resolution = Arc::new(Resolution::compute(product)?);

        let resolution = {
            let mut state = self.state.lock();
            let last_used = state.tick();
            let resolution = state
                .entries
                .entry(product)
                .or_insert(Entry {
                    resolution,
                    last_used,
                })
                .resolution
                .clone();
            if let Some(limit) = self.capacity {
                state.evict_to(limit);
            }
            resolution
        };
        self.persist(StoreMessage::Put(resolution.clone()));
        Ok(resolution)
    }

    /// The full resolution for `product` at a position described by
    /// `context`. Equal to running every pass from scratch.
    pub fn resolve_in(
        &self,
        product: PrimeProduct,
        context: &StructuralContext,
    ) -> Result<Resolution, PropertyError> {
        Ok(self.resolve(product)?.refine(context))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, product: PrimeProduct) -> bool {
        self.state.lock().entries.contains_key(&product)
    }

    /// Drop every entry here and in the store. Counters are kept.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
        self.persist(StoreMessage::Clear);
    }

    /// Wait until every queued store write has been attempted.
    pub async fn flush(&self) {
        let Some(tx) = &self.store_tx else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(StoreMessage::Flush(done_tx)).await.is_ok() {
            done_rx.await.ok();
        }
    }

    fn persist(&self, message: StoreMessage) {
        if let Some(tx) = &self.store_tx {
            if let Err(error) = tx.try_send(message) {
                log::warn!("resolution store worker is gone: {error}");
            }
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_store_worker(store: Arc<dyn CacheStore>) -> Option<smol::channel::Sender<StoreMessage>> {
    let (tx, rx) = smol::channel::unbounded::<StoreMessage>();
    let spawned = std::thread::Builder::new()
        .name("resolution-store".into())
        .spawn(move || {
            smol::block_on(async move {
                while let Ok(message) = rx.recv().await {
                    match message {
                        StoreMessage::Put(resolution) => {
                            if let Err(error) = store.put(&resolution) {
                                log::warn!(
                                    "failed to persist resolution for {}: {error}",
                                    resolution.product
                                );
                            }
                        }
                        StoreMessage::Clear => {
                            if let Err(error) = store.clear() {
                                log::warn!("failed to clear resolution store: {error}");
                            }
                        }
                        StoreMessage::Flush(done) => {
                            done.send(()).ok();
                        }
                    }
                }
            })
        });
    match spawned {
        Ok(_) => Some(tx),
        Err(error) => {
            log::warn!("resolution cache running without persistence: {error}");
            None
        }
    }
}
