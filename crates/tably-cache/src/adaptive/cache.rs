use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tably_core::{Clock, ColumnDescriptor, Row, SystemClock, elapsed_between};

/// Configuration for the adaptive cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry is trusted after capture
    pub ttl: Duration,
    /// Maximum number of cached tables
    pub max_entries: usize,
    /// Tables with at least this many rows are never cached
    pub size_threshold: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300), // 5 minutes
            max_entries: 16,
            size_threshold: 100_000,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration, max_entries: usize, size_threshold: u64) -> Self {
        Self {
            ttl,
            max_entries,
            size_threshold,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// A cached copy of one loaded table
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    /// Row count reported by the store when captured
    pub row_count: u64,
    pub captured_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        elapsed_between(self.captured_at, now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) >= ttl
    }
}

/// Counters since creation or the last [`AdaptiveCache::clear`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to stay within `max_entries`
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Tables not stored because they reached `size_threshold`
    pub bypasses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    /// Insertion order, breaks ties between equal capture times
    seq: u64,
}

/// TTL and size bounded cache of table copies.
///
/// Not synchronized: the owner calls it from a single context.
pub struct AdaptiveCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    slots: HashMap<String, Slot>,
    next_seq: u64,
    stats: CacheStats,
}

impl std::fmt::Debug for AdaptiveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveCache")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("entries", &self.slots.len())
            .finish()
    }
}

impl AdaptiveCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            slots: HashMap::new(),
            next_seq: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn with_system_clock(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.len(),
            ..self.stats
        }
    }

    /// A copy of the entry for `table_name` if it is younger than the TTL.
    /// An expired entry is dropped on the spot.
    pub fn get(&mut self, table_name: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let expired = match self.slots.get(table_name) {
            None => {
                self.stats.misses += 1;
                tracing::debug!(table_name = %table_name, "cache miss");
                return None;
            }
            Some(slot) => slot.entry.is_expired(now, self.config.ttl),
        };

        if expired {
            self.slots.remove(table_name);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            tracing::debug!(table_name = %table_name, "cache entry expired");
            return None;
        }

        self.stats.hits += 1;
        tracing::debug!(table_name = %table_name, "cache hit");
        self.slots.get(table_name).map(|slot| slot.entry.clone())
    }

    /// Store a copy of a loaded table. Returns `false` if the table was too
    /// large to cache.
    ///
    /// Expired entries are purged first. If the cache is still full, exactly
    /// the entry captured earliest is evicted.
    pub fn set(
        &mut self,
        table_name: &str,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<Row>,
        row_count: u64,
    ) -> bool {
        if row_count >= self.config.size_threshold || self.config.max_entries == 0 {
            self.stats.bypasses += 1;
            tracing::debug!(
                table_name = %table_name,
                row_count,
                threshold = self.config.size_threshold,
                "table too large to cache"
            );
            return false;
        }

        let now = self.clock.now();
        self.purge_expired(now);

        if !self.slots.contains_key(table_name) && self.slots.len() >= self.config.max_entries {
            self.evict_oldest();
        }

        self.next_seq += 1;
        self.slots.insert(
            table_name.to_string(),
            Slot {
                entry: CacheEntry {
                    table_name: table_name.to_string(),
                    columns,
                    rows,
                    row_count,
                    captured_at: now,
                },
                seq: self.next_seq,
            },
        );
        tracing::debug!(table_name = %table_name, row_count, entries = self.slots.len(), "table cached");
        true
    }

    /// Drop the entry for one table. Returns whether there was one.
    pub fn invalidate(&mut self, table_name: &str) -> bool {
        let removed = self.slots.remove(table_name).is_some();
        if removed {
            tracing::debug!(table_name = %table_name, "cache entry invalidated");
        }
        removed
    }

    /// Drop every entry and reset the counters
    pub fn clear(&mut self) {
        self.slots.clear();
        self.stats = CacheStats::default();
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.config.ttl;
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.entry.is_expired(now, ttl));
        let purged = before - self.slots.len();
        if purged > 0 {
            self.stats.expirations += purged as u64;
            tracing::debug!(purged, "expired cache entries purged");
        }
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| (slot.entry.captured_at, slot.seq))
            .map(|(name, _)| name.clone());

        if let Some(name) = oldest {
            self.slots.remove(&name);
            self.stats.evictions += 1;
            tracing::debug!(table_name = %name, "cache entry evicted");
        }
    }
}
