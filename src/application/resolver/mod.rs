//! Metric-kind to collector resolution.
//!
//! Every sample goes through both strategies and their outputs are
//! concatenated:
//!
//! 1. **Collector resolver**: one collector named with the sample's subsystem.
//! 2. **Summary resolver**: one collector named after the metric alone, or the
//!    statistic breakdown for distribution metrics.

pub mod collector_resolver;
pub mod partition;
pub mod summary_resolver;

pub use collector_resolver::resolve;
pub use partition::{instance, subsystem};
pub use summary_resolver::{resolve_summary, sanitize_suffix};

use crate::domain::collector::Collector;
use crate::domain::sample::Sample;

/// Collectors for every sample of a batch, in sample order.
pub fn resolve_samples(samples: &[Sample], namespace: &str, labels: &[String]) -> Vec<Collector> {
    let mut collectors = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        let subsystem = subsystem(sample, labels);
        collectors.extend(resolve(sample, &subsystem, namespace));
        collectors.extend(resolve_summary(sample, namespace));
    }
    collectors
}
