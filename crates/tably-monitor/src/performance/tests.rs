//! Unit tests for performance monitoring

use super::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tably_core::ManualClock;

fn monitor(config: MonitorConfig) -> PerformanceMonitor {
    PerformanceMonitor::new(config, Arc::new(ManualClock::at_epoch()))
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

mod classification_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_speed_boundaries() {
        assert_eq!(OperationSpeed::classify(ms(0)), OperationSpeed::Normal);
        assert_eq!(OperationSpeed::classify(ms(2000)), OperationSpeed::Normal);
        assert_eq!(OperationSpeed::classify(ms(2001)), OperationSpeed::Elevated);
        assert_eq!(OperationSpeed::classify(ms(5000)), OperationSpeed::Elevated);
        assert_eq!(OperationSpeed::classify(ms(5001)), OperationSpeed::Slow);
    }

    #[test]
    fn test_needs_attention() {
        assert!(!OperationSpeed::Normal.needs_attention());
        assert!(OperationSpeed::Elevated.needs_attention());
        assert!(OperationSpeed::Slow.needs_attention());
    }

    #[test]
    fn test_category_thresholds() {
        let config = MonitorConfig::default();
        assert_eq!(config.threshold_for(OperationCategory::Query), ms(500));
        assert_eq!(config.threshold_for(OperationCategory::Mutation), ms(2000));
        assert_eq!(config.threshold_for(OperationCategory::Filter), ms(2000));
    }
}

mod record_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_only_operations_over_threshold_are_kept() {
        let mut monitor = monitor(MonitorConfig::default());

        monitor.record_slow_query("load fruit", ms(500), None);
        monitor.record_slow_query("load fruit", ms(501), None);
        monitor.record("rescan fruit", OperationCategory::Filter, ms(1500), None);
        monitor.record("submit fruit", OperationCategory::Mutation, ms(2500), None);

        let labels: Vec<_> = monitor.records().map(|r| r.operation_label.as_str()).collect();
        assert_eq!(labels, vec!["load fruit", "submit fruit"]);
    }

    #[test]
    fn test_failures_are_always_kept() {
        let mut monitor = monitor(MonitorConfig::default());
        monitor.record_slow_query("load missing", ms(3), Some("no such table"));

        let record = monitor.records().next().expect("record");
        assert_eq!(record.error.as_deref(), Some("no such table"));
        assert_eq!(record.speed, OperationSpeed::Normal);
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut monitor = monitor(MonitorConfig::record_everything().with_capacity(3));
        for i in 0..5 {
            monitor.record_slow_query(&format!("q{}", i), ms(10), None);
        }

        assert_eq!(monitor.len(), 3);
        assert_eq!(monitor.dropped(), 2);
        assert_eq!(
            monitor.records().map(|r| r.operation_label.clone()).collect::<Vec<_>>(),
            vec!["q2", "q3", "q4"]
        );
    }

    #[test]
    fn test_timer_is_recorded() {
        let mut monitor = monitor(MonitorConfig::record_everything());
        let timer = OperationTimer::start("cache lookup fruit", OperationCategory::Cache);
        assert_eq!(timer.label(), "cache lookup fruit");

        let speed = monitor.finish(timer, None);

        assert_eq!(speed, OperationSpeed::Normal);
        assert_eq!(monitor.len(), 1);
        assert_eq!(monitor.records().next().map(|r| r.category), Some(OperationCategory::Cache));
    }

    #[test]
    fn test_summary_and_clear() {
        let mut monitor = monitor(MonitorConfig::record_everything().with_capacity(10));
        monitor.record_slow_query("a", ms(1000), None);
        monitor.record_slow_query("b", ms(3000), Some("timeout"));
        monitor.record_slow_query("c", ms(8000), None);

        let summary = monitor.summary();
        assert_eq!(summary.total_records, 3);
        assert_eq!((summary.slow, summary.elevated, summary.errors), (1, 1, 1));
        assert_eq!(summary.avg_duration_ms, 4000.0);
        assert_eq!(summary.max_duration_ms, 8000.0);

        monitor.clear();
        assert!(monitor.is_empty());
        assert_eq!(monitor.summary(), PerformanceSummary::default());
    }
}

mod export_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_writes_json() {
        let mut monitor = monitor(MonitorConfig::default());
        monitor.record_slow_query("load fruit", ms(750), None);
        monitor.record("submit fruit", OperationCategory::Mutation, ms(6000), Some("deadlock"));

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("performance.json");
        let written = monitor.export_to_file(&path).expect("export");
        assert_eq!(written, 2);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(json["summary"]["total_records"], 2);
        assert_eq!(json["records"][0]["operation_label"], "load fruit");
        assert_eq!(json["records"][0]["category"], "query");
        assert_eq!(json["records"][1]["speed"], "slow");
        assert_eq!(json["records"][1]["error"], "deadlock");
        assert!(json["records"][0].get("error").is_none());
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let monitor = monitor(MonitorConfig::default());
        let dir = tempfile::tempdir().expect("temp dir");
        let result = monitor.export_to_file(dir.path().join("missing").join("log.json"));
        assert!(matches!(result, Err(tably_core::TablyError::Io(_))));
    }
}
