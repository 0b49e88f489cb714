use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::metric::{Metric, MetricKind};

/// Key/value labels attached to a sample
pub type Tags = BTreeMap<String, String>;

/// Shared `f64` cell holding the raw value of a sample.
///
/// Clones of a sample share the cell, so live collectors resolved from a
/// sample keep reading the value its producer last stored.
#[derive(Debug, Clone)]
pub struct SampleValue(Arc<AtomicU64>);

impl SampleValue {
    pub fn new(value: f64) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// One observation of a metric
#[derive(Debug, Clone)]
pub struct Sample {
    metric: Arc<Metric>,
    value: SampleValue,
    time: DateTime<Utc>,
    tags: Arc<Tags>,
}

impl Sample {
    pub fn new(metric: Arc<Metric>, value: f64, time: DateTime<Utc>, tags: Tags) -> Self {
        Self {
            metric,
            value: SampleValue::new(value),
            time,
            tags: Arc::new(tags),
        }
    }

    pub fn metric(&self) -> &Arc<Metric> {
        &self.metric
    }

    pub fn name(&self) -> &str {
        self.metric.name()
    }

    pub fn kind(&self) -> MetricKind {
        self.metric.kind()
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Updates the raw value seen by every clone of this sample.
    pub fn set_value(&self, value: f64) {
        self.value.set(value);
    }

    pub(crate) fn value_cell(&self) -> SampleValue {
        self.value.clone()
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Samples handed to the output in one call, flushed together
#[derive(Debug, Clone, Default)]
pub struct SampleContainer {
    samples: Vec<Sample>,
}

impl SampleContainer {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<Sample>> for SampleContainer {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}
