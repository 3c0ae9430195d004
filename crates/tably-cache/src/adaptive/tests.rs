//! Tests for the adaptive cache

use super::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tably_core::{Clock, ColumnDescriptor, ManualClock, Value};

fn cache_with(config: CacheConfig) -> (AdaptiveCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_epoch());
    (AdaptiveCache::new(config, clock.clone()), clock)
}

fn columns() -> Vec<ColumnDescriptor> {
    vec![ColumnDescriptor::new("id", "integer")]
}

fn rows(n: i64) -> Vec<Vec<Value>> {
    (0..n).map(|i| vec![Value::Int64(i)]).collect()
}

// ============ CacheConfig Tests ============

mod config_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.size_threshold, 100_000);
        assert!(config.max_entries > 0);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CacheConfig::default()
            .with_ttl(Duration::from_secs(10))
            .with_max_entries(2);
        assert_eq!(config, CacheConfig::new(Duration::from_secs(10), 2, 100_000));
    }
}

// ============ TTL Tests ============

mod ttl_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_expires_at_ttl_without_invalidation() {
        let (mut cache, clock) = cache_with(CacheConfig::default());
        assert!(cache.set("fruit", columns(), rows(2), 2));

        clock.advance(Duration::from_secs(299));
        let entry = cache.get("fruit").expect("fresh entry");
        assert_eq!(entry.rows, rows(2));
        assert_eq!(entry.age(clock.now()), Duration::from_secs(299));

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("fruit").is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_set_purges_expired_entries() {
        let (mut cache, clock) = cache_with(CacheConfig::default());
        cache.set("a", columns(), rows(1), 1);
        clock.advance(Duration::from_secs(200));
        cache.set("b", columns(), rows(1), 1);
        clock.advance(Duration::from_secs(100));

        cache.set("c", columns(), rows(1), 1);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_returned_entry_is_a_copy() {
        let (mut cache, _clock) = cache_with(CacheConfig::default());
        cache.set("fruit", columns(), rows(1), 1);

        let mut copy = cache.get("fruit").expect("entry");
        copy.rows.clear();

        assert_eq!(cache.get("fruit").map(|e| e.rows.len()), Some(1));
    }
}

// ============ Capacity Tests ============

mod capacity_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_evicts_exactly_the_oldest_entry() {
        let (mut cache, clock) = cache_with(CacheConfig::default().with_max_entries(3));
        for name in ["a", "b", "c"] {
            cache.set(name, columns(), rows(1), 1);
            clock.advance(Duration::from_secs(1));
        }

        cache.set("d", columns(), rows(1), 1);

        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").is_none());
        for name in ["b", "c", "d"] {
            assert!(cache.get(name).is_some(), "{} should survive", name);
        }
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_equal_capture_times_evict_first_inserted() {
        let (mut cache, _clock) = cache_with(CacheConfig::default().with_max_entries(2));
        cache.set("first", columns(), rows(1), 1);
        cache.set("second", columns(), rows(1), 1);
        cache.set("third", columns(), rows(1), 1);

        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
    }

    #[test]
    fn test_replacing_an_entry_does_not_evict() {
        let (mut cache, _clock) = cache_with(CacheConfig::default().with_max_entries(2));
        cache.set("a", columns(), rows(1), 1);
        cache.set("b", columns(), rows(1), 1);
        cache.set("b", columns(), rows(3), 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get("b").map(|e| e.row_count), Some(3));
    }

    #[test]
    fn test_never_exceeds_max_entries() {
        let (mut cache, clock) = cache_with(CacheConfig::default().with_max_entries(4));
        for i in 0..20 {
            cache.set(&format!("t{}", i), columns(), rows(1), 1);
            clock.advance(Duration::from_millis(10));
            assert!(cache.len() <= 4);
        }
    }
}

// ============ Size Threshold Tests ============

mod threshold_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_large_tables_bypass_the_cache() {
        let (mut cache, _clock) = cache_with(CacheConfig::default());
        assert!(!cache.set("huge", columns(), rows(1), 100_000));
        assert!(cache.set("big", columns(), rows(1), 99_999));

        assert!(cache.get("huge").is_none());
        let stats = cache.stats();
        assert_eq!(stats.bypasses, 1);
        assert_eq!(stats.entries, 1);
    }
}

// ============ Invalidation Tests ============

mod invalidation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invalidate_and_clear() {
        let (mut cache, _clock) = cache_with(CacheConfig::default());
        cache.set("a", columns(), rows(1), 1);
        cache.set("b", columns(), rows(1), 1);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(cache.get("a").is_none());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_hit_rate() {
        let (mut cache, _clock) = cache_with(CacheConfig::default());
        cache.set("a", columns(), rows(1), 1);
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (3, 1));
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
