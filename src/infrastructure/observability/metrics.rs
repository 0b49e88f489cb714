//! Transient Prometheus registries built from resolved collectors.
//!
//! A fresh registry is built for every flushed container and dropped once it
//! has been pushed.

use prometheus::core::{Collector as PromCollector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Counter, Gauge, Opts, Registry, TextEncoder};

use tracing::warn;

use crate::domain::collector::{Collector, CollectorKind, ValueProvider, is_valid_metric_name};
use crate::domain::errors::FlushError;

const COUNTER_HELP: &str = "k6 counter, per-second rate since first observation";
const GAUGE_HELP: &str = "k6 sample value";

/// Gauge whose value is refreshed from its provider on every scrape
struct ProvidedGauge {
    gauge: Gauge,
    value: ValueProvider,
}

impl PromCollector for ProvidedGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.gauge.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.gauge.set(self.value.current());
        self.gauge.collect()
    }
}

/// Counter whose value is refreshed from its provider on every scrape
struct ProvidedCounter {
    counter: Counter,
    value: ValueProvider,
}

impl PromCollector for ProvidedCounter {
    fn desc(&self) -> Vec<&Desc> {
        self.counter.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let value = self.value.current();
        self.counter.reset();
        // Counters only move forward.
        if value.is_finite() && value > 0.0 {
            self.counter.inc_by(value);
        }
        self.counter.collect()
    }
}

fn opts(collector: &Collector, help: &str) -> Opts {
    Opts::new(collector.name.as_str(), help)
        .namespace(collector.namespace.as_str())
        .subsystem(collector.subsystem.as_str())
}

fn to_prometheus(collector: Collector) -> prometheus::Result<Box<dyn PromCollector>> {
    match collector.kind {
        CollectorKind::Counter => {
            let counter = Counter::with_opts(opts(&collector, COUNTER_HELP))?;
            Ok(Box::new(ProvidedCounter {
                counter,
                value: collector.value,
            }))
        }
        CollectorKind::Gauge => {
            let gauge = Gauge::with_opts(opts(&collector, GAUGE_HELP))?;
            Ok(Box::new(ProvidedGauge {
                gauge,
                value: collector.value,
            }))
        }
    }
}

/// Registers every collector into a new registry.
///
/// Collectors whose name Prometheus would reject are skipped. A duplicate
/// name fails the whole batch.
pub fn build_registry(collectors: Vec<Collector>) -> Result<Registry, FlushError> {
    let registry = Registry::new();
    for collector in collectors {
        let name = collector.fq_name();
        if !is_valid_metric_name(&name) {
            warn!(collector = %name, "Skipping collector with invalid metric name");
            continue;
        }
        to_prometheus(collector)
            .and_then(|c| registry.register(c))
            .map_err(|source| FlushError::Registration { name, source })?;
    }
    Ok(registry)
}

/// Render all metrics in Prometheus text format
pub fn render(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
