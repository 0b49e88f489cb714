use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::MetricError;
use crate::domain::sample::{Sample, Tags};
use crate::domain::sink::{Sink, SinkSnapshot};

/// Kind of a metric. Decides how its samples become collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Rate,
    #[serde(rename = "trend", alias = "distribution")]
    Distribution,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Rate => "rate",
            MetricKind::Distribution => "trend",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            "rate" => Ok(MetricKind::Rate),
            "trend" | "distribution" => Ok(MetricKind::Distribution),
            _ => anyhow::bail!(
                "Invalid metric type: {}. Must be 'counter', 'gauge', 'rate' or 'trend'",
                s
            ),
        }
    }
}

/// A named metric and the aggregator of everything observed for it
#[derive(Debug)]
pub struct Metric {
    name: String,
    kind: MetricKind,
    sink: Mutex<Sink>,
}

impl Metric {
    pub fn new(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sink: Mutex::new(Sink::for_kind(kind)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn observe(&self, value: f64, time: DateTime<Utc>) {
        self.sink.lock().add(value, time);
    }

    pub fn format(&self, elapsed: Duration) -> SinkSnapshot {
        self.sink.lock().format(elapsed)
    }

    pub fn first_observed_at(&self) -> Option<DateTime<Utc>> {
        self.sink.lock().first_observed_at()
    }

    /// Counter rate from the first observation up to `now`.
    pub fn rate_at(&self, now: DateTime<Utc>) -> f64 {
        let sink = self.sink.lock();
        let elapsed = sink
            .first_observed_at()
            .and_then(|first| (now - first).to_std().ok())
            .unwrap_or(Duration::ZERO);
        sink.format(elapsed).get("rate").copied().unwrap_or(0.0)
    }
}

/// Registry of every metric seen during a run, keyed by name
#[derive(Debug, Default)]
pub struct MetricCatalog {
    metrics: RwLock<HashMap<String, Arc<Metric>>>,
}

impl MetricCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metric named `name`, creating it on first use.
    ///
    /// The kind of a name is fixed by its first declaration.
    pub fn declare(&self, name: &str, kind: MetricKind) -> Result<Arc<Metric>, MetricError> {
        if name.is_empty() {
            return Err(MetricError::EmptyName);
        }

        if let Some(metric) = self.metrics.read().get(name) {
            return check_kind(metric, kind);
        }

        let mut metrics = self.metrics.write();
        let metric = metrics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Metric::new(name, kind)));
        check_kind(metric, kind)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Metric>> {
        self.metrics.read().get(name).cloned()
    }

    /// Feeds `value` into the metric's sink and returns the resulting sample.
    pub fn record(
        &self,
        name: &str,
        kind: MetricKind,
        value: f64,
        time: DateTime<Utc>,
        tags: Tags,
    ) -> Result<Sample, MetricError> {
        let metric = self.declare(name, kind)?;
        metric.observe(value, time);
        Ok(Sample::new(metric, value, time, tags))
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }
}

fn check_kind(metric: &Arc<Metric>, kind: MetricKind) -> Result<Arc<Metric>, MetricError> {
    if metric.kind() != kind {
        return Err(MetricError::KindMismatch {
            name: metric.name().to_string(),
            existing: metric.kind(),
            requested: kind,
        });
    }
    Ok(Arc::clone(metric))
}
