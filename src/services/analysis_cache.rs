use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::env_or;
use crate::models::StructuredAnalysis;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_or("ANALYSIS_CACHE_CAPACITY", defaults.capacity),
            ttl: Duration::from_secs(env_or("ANALYSIS_CACHE_TTL_SECS", defaults.ttl.as_secs())),
        }
    }
}

/// Cache of composed analyses keyed by `ChangeEvent::cache_key`.
///
/// Process-local and best effort: a miss only costs another AI call.
pub trait AnalysisCache: Send + Sync {
    fn get(&self, key: &str) -> Option<StructuredAnalysis>;
    fn insert(&self, key: String, value: StructuredAnalysis);
    fn len(&self) -> usize;

    /// Drop expired entries, returning how many were removed.
    fn clear_expired(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct CachedAnalysis {
    value: StructuredAnalysis,
    created_at: Instant,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CachedAnalysis>,
    // Insertion order, oldest at the front. Each key appears at most once.
    order: VecDeque<String>,
}

/// Bounded cache with a fixed TTL. When full, the oldest entry is evicted.
#[derive(Debug)]
pub struct BoundedTtlCache {
    entries: Mutex<Entries>,
    capacity: usize,
    ttl: Duration,
}

impl BoundedTtlCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl)
    }
}

impl AnalysisCache for BoundedTtlCache {
    fn get(&self, key: &str) -> Option<StructuredAnalysis> {
        let mut entries = self.entries.lock();
        let expired = match entries.map.get(key) {
            Some(cached) if cached.created_at.elapsed() < self.ttl => {
                debug!("Analysis cache hit for key: {}", key);
                return Some(cached.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            let Entries { map, order } = &mut *entries;
            map.remove(key);
            order.retain(|k| k != key);
        }
        None
    }

    fn insert(&self, key: String, value: StructuredAnalysis) {
        let mut entries = self.entries.lock();
        let Entries { map, order } = &mut *entries;

        order.retain(|k| k != &key);

        while map.len() >= self.capacity && !map.contains_key(&key) {
            match order.pop_front() {
                Some(oldest) => {
                    if map.remove(&oldest).is_some() {
                        debug!("Evicted analysis cache entry: {}", oldest);
                    }
                }
                None => break,
            }
        }

        order.push_back(key.clone());
        map.insert(
            key,
            CachedAnalysis {
                value,
                created_at: Instant::now(),
            },
        );
    }

    fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    fn clear_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.map.len();
        let ttl = self.ttl;
        entries.map.retain(|_, v| v.created_at.elapsed() < ttl);
        let Entries { map, order } = &mut *entries;
        order.retain(|k| map.contains_key(k));
        let removed = before - entries.map.len();
        if removed > 0 {
            debug!("Cleared {} expired analysis cache entries", removed);
        }
        removed
    }
}
