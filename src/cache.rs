//! In-memory simulation cache
//!
//! One entry per (plan, configuration[, scenario set]) key, no TTL and no
//! eviction: [`SimulationCache::clear`] is the only removal path. Writes are
//! last-writer-wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Cache key
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub plan_id: String,
    pub configuration_id: String,
    /// Hash of the scenario set for scenario-dependent results
    pub scenario_hash: Option<u64>,
}

impl CacheKey {
    pub fn new(plan_id: impl Into<String>, configuration_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            configuration_id: configuration_id.into(),
            scenario_hash: None,
        }
    }

    pub fn with_scenarios(mut self, scenario_hash: u64) -> Self {
        self.scenario_hash = Some(scenario_hash);
        self
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.plan_id, self.configuration_id)?;
        if let Some(h) = self.scenario_hash {
            write!(f, "_{:016x}", h)?;
        }
        Ok(())
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Combine counters of several caches
    pub fn merge(self, other: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            entries: self.entries + other.entries,
        }
    }
}

pub struct SimulationCache<V: Clone> {
    entries: RwLock<HashMap<CacheKey, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> Default for SimulationCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> SimulationCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Stored value for `key`; counts a hit or a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn put(&self, key: CacheKey, value: V) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, value);
        }
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_put_and_counters() {
        let cache: SimulationCache<u32> = SimulationCache::new();
        let key = CacheKey::new("plan-a", "cfg-1");
        assert_eq!(cache.get(&key), None);
        cache.put(key.clone(), 7);
        assert_eq!(cache.get(&key), Some(7));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[test]
    fn test_one_entry_per_key() {
        let cache: SimulationCache<&str> = SimulationCache::new();
        let key = CacheKey::new("plan-a", "cfg-1");
        cache.put(key.clone(), "first");
        cache.put(key.clone(), "second");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key), Some("second"));
    }

    #[test]
    fn test_scenario_hash_separates_entries() {
        let cache: SimulationCache<u8> = SimulationCache::new();
        let base = CacheKey::new("plan-a", "cfg-1");
        cache.put(base.clone(), 1);
        cache.put(base.clone().with_scenarios(42), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&base.with_scenarios(42)), Some(2));
    }

    #[test]
    fn test_clear() {
        let cache: SimulationCache<u8> = SimulationCache::new();
        cache.put(CacheKey::new("p", "c"), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(CacheKey::new("p", "c").to_string(), "p_c");
        assert_eq!(
            CacheKey::new("p", "c").with_scenarios(255).to_string(),
            "p_c_00000000000000ff"
        );
    }
}
