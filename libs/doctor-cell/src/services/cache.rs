use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::CacheStats;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    seq: u64,
}

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// In-process read-through cache. There is no explicit invalidation, so
/// readers may see data up to `ttl` old. Expired entries are swept on every
/// insert, and the oldest tenth is dropped once `max_entries` is reached.
pub struct TtlCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<K, Entry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache hit for {:?}", key);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
            debug!("Cache entry for {:?} expired", key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        if entries.len() < before {
            debug!("Cache swept {} expired entries", before - entries.len());
        }

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let to_remove = (entries.len() / 10).max(1);
            let mut oldest: Vec<(K, u64)> = entries
                .iter()
                .map(|(k, entry)| (k.clone(), entry.seq))
                .collect();
            oldest.sort_by_key(|(_, seq)| *seq);

            for (k, _) in oldest.into_iter().take(to_remove) {
                entries.remove(&k);
            }
            info!("Cache evicted {} entries", to_remove);
        }

        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
                seq: self.inserts.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().await.len(),
        }
    }
}
