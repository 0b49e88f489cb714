//! Base strategy: one collector per sample, namespaced by subsystem.

use chrono::Utc;
use std::sync::Arc;

use crate::domain::collector::{Collector, ValueProvider};
use crate::domain::metric::MetricKind;
use crate::domain::sample::Sample;

/// Resolves a sample into collectors named `<namespace>_<subsystem>_<metric>`.
///
/// Distribution samples yield nothing here; their breakdown comes from
/// [`super::summary_resolver::resolve_summary`].
pub fn resolve(sample: &Sample, subsystem: &str, namespace: &str) -> Vec<Collector> {
    match sample.kind() {
        MetricKind::Counter => vec![Collector::counter(
            namespace,
            subsystem,
            sample.name(),
            counter_rate(sample),
        )],
        MetricKind::Gauge => vec![Collector::gauge(
            namespace,
            subsystem,
            sample.name(),
            raw_value(sample),
        )],
        // Exposed exactly like a gauge.
        MetricKind::Rate => vec![Collector::gauge(
            namespace,
            subsystem,
            sample.name(),
            raw_value(sample),
        )],
        MetricKind::Distribution => Vec::new(),
    }
}

/// Rate of the sample's counter since its first observation, read at scan time.
pub(super) fn counter_rate(sample: &Sample) -> ValueProvider {
    let metric = Arc::clone(sample.metric());
    ValueProvider::live(move || metric.rate_at(Utc::now()))
}

/// Raw value of the sample, read at scan time.
pub(super) fn raw_value(sample: &Sample) -> ValueProvider {
    let value = sample.value_cell();
    ValueProvider::live(move || value.get())
}
