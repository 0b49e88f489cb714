//! Summary strategy: collectors named after the metric alone, plus the
//! statistic breakdown of distribution metrics.

use std::time::Duration;

use super::collector_resolver::{counter_rate, raw_value};
use crate::domain::collector::{Collector, ValueProvider};
use crate::domain::metric::MetricKind;
use crate::domain::sample::Sample;
use crate::domain::sink::SinkSnapshot;

/// Resolves a sample into collectors named `<namespace>_<metric>[_<stat>]`.
pub fn resolve_summary(sample: &Sample, namespace: &str) -> Vec<Collector> {
    match sample.kind() {
        MetricKind::Counter => vec![Collector::counter(
            namespace,
            "",
            sample.name(),
            counter_rate(sample),
        )],
        MetricKind::Gauge | MetricKind::Rate => vec![Collector::gauge(
            namespace,
            "",
            sample.name(),
            raw_value(sample),
        )],
        MetricKind::Distribution => resolve_distribution(sample, namespace),
    }
}

fn resolve_distribution(sample: &Sample, namespace: &str) -> Vec<Collector> {
    snapshot_collectors(
        sample.name(),
        namespace,
        sample.metric().format(Duration::ZERO),
    )
}

/// One frozen gauge per statistic, named `<metric>_<stat>`.
pub fn snapshot_collectors(
    metric_name: &str,
    namespace: &str,
    snapshot: SinkSnapshot,
) -> Vec<Collector> {
    snapshot
        .into_iter()
        .map(|(stat, value)| {
            let name = format!("{}_{}", metric_name, sanitize_suffix(&stat));
            Collector::gauge(namespace, "", &name, ValueProvider::Snapshot(value))
        })
        .collect()
}

/// Prometheus identifiers cannot carry parentheses: `p(90)` becomes `p90`.
pub fn sanitize_suffix(stat: &str) -> String {
    stat.replace(['(', ')'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collector::CollectorKind;
    use crate::domain::metric::{Metric, MetricCatalog};
    use crate::domain::sample::Tags;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn by_name(collectors: &[Collector]) -> HashMap<String, &Collector> {
        collectors.iter().map(|c| (c.fq_name(), c)).collect()
    }

    #[test]
    fn test_sanitize_suffix() {
        assert_eq!(sanitize_suffix("p(90)"), "p90");
        assert_eq!(sanitize_suffix("p(99.9)"), "p99.9");
        assert_eq!(sanitize_suffix("avg"), "avg");
    }

    #[test]
    fn test_snapshot_collectors_strip_parentheses() {
        let snapshot = SinkSnapshot::from([("p(90)".to_string(), 12.5), ("avg".to_string(), 3.0)]);
        let collectors = snapshot_collectors("http_req_duration", "", snapshot);
        let named = by_name(&collectors);

        assert_eq!(named.len(), 2);
        assert_eq!(named["http_req_duration_p90"].current_value(), 12.5);
        assert_eq!(named["http_req_duration_avg"].current_value(), 3.0);
    }

    #[test]
    fn test_distribution_breakdown_names_and_values() {
        let catalog = MetricCatalog::new();
        let now = Utc::now();
        let mut last = None;
        for v in 1..=10 {
            last = Some(
                catalog
                    .record(
                        "http_req_duration",
                        MetricKind::Distribution,
                        v as f64,
                        now,
                        Tags::new(),
                    )
                    .unwrap(),
            );
        }
        let sample = last.unwrap();

        let collectors = resolve_summary(&sample, "");
        let named = by_name(&collectors);

        assert_eq!(collectors.len(), 6);
        for name in [
            "http_req_duration_avg",
            "http_req_duration_min",
            "http_req_duration_med",
            "http_req_duration_max",
            "http_req_duration_p90",
            "http_req_duration_p95",
        ] {
            assert!(named.contains_key(name), "missing {name}");
        }
        assert!(collectors.iter().all(|c| !c.fq_name().contains(['(', ')'])));
        assert!(collectors.iter().all(|c| c.kind == CollectorKind::Gauge));
        assert!(collectors.iter().all(|c| !c.value.is_live()));
        assert!((named["http_req_duration_p90"].current_value() - 9.1).abs() < 1e-9);
        assert!((named["http_req_duration_avg"].current_value() - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_values_frozen_at_resolution() {
        let catalog = MetricCatalog::new();
        let sample = catalog
            .record(
                "iteration_duration",
                MetricKind::Distribution,
                3.0,
                Utc::now(),
                Tags::new(),
            )
            .unwrap();

        let collectors = resolve_summary(&sample, "k6");
        sample.metric().observe(100.0, Utc::now());

        let named = by_name(&collectors);
        assert_eq!(named["k6_iteration_duration_max"].current_value(), 3.0);
    }

    #[test]
    fn test_empty_distribution_resolves_nothing() {
        let metric = Arc::new(Metric::new("http_req_duration", MetricKind::Distribution));
        let sample = Sample::new(metric, 1.0, Utc::now(), Tags::new());
        assert!(resolve_summary(&sample, "k6").is_empty());
    }

    #[test]
    fn test_counter_summary_has_no_subsystem() {
        let catalog = MetricCatalog::new();
        let tags = Tags::from([("scenario".to_string(), "login".to_string())]);
        let sample = catalog
            .record("http_reqs", MetricKind::Counter, 1.0, Utc::now(), tags)
            .unwrap();

        let collectors = resolve_summary(&sample, "k6");
        assert_eq!(collectors.len(), 1);
        assert_eq!(collectors[0].kind, CollectorKind::Counter);
        assert_eq!(collectors[0].fq_name(), "k6_http_reqs");
        assert!(collectors[0].value.is_live());
    }

    #[test]
    fn test_gauge_and_rate_summary_are_live() {
        for kind in [MetricKind::Gauge, MetricKind::Rate] {
            let metric = Arc::new(Metric::new("value", kind));
            let sample = Sample::new(metric, 1.0, Utc::now(), Tags::new());

            let collectors = resolve_summary(&sample, "");
            assert_eq!(collectors.len(), 1);
            assert_eq!(collectors[0].fq_name(), "value");

            sample.set_value(4.0);
            assert_eq!(collectors[0].current_value(), 4.0);
        }
    }
}
