//! Running aggregators behind each metric name.
//!
//! A sink is fed every observed value of its metric and answers
//! `format(elapsed)` with a named set of statistics, the same shape the k6
//! engine exposes to its outputs.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::metric::MetricKind;

/// Named statistics of one sink, ordered by key
pub type SinkSnapshot = BTreeMap<String, f64>;

/// Statistic keys a trend sink reports, in k6 summary order
pub const TREND_STATS: [&str; 6] = ["avg", "min", "med", "max", "p(90)", "p(95)"];

#[derive(Debug, Clone, Default)]
pub struct CounterSink {
    pub value: f64,
    pub first: Option<DateTime<Utc>>,
}

impl CounterSink {
    fn add(&mut self, value: f64, time: DateTime<Utc>) {
        self.value += value;
        if self.first.is_none() {
            self.first = Some(time);
        }
    }

    fn format(&self, elapsed: Duration) -> SinkSnapshot {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { self.value / secs } else { 0.0 };
        SinkSnapshot::from([("count".to_string(), self.value), ("rate".to_string(), rate)])
    }
}

#[derive(Debug, Clone, Default)]
pub struct GaugeSink {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    observed: bool,
}

impl GaugeSink {
    fn add(&mut self, value: f64) {
        self.value = value;
        if !self.observed || value < self.min {
            self.min = value;
        }
        if !self.observed || value > self.max {
            self.max = value;
        }
        self.observed = true;
    }

    fn format(&self) -> SinkSnapshot {
        SinkSnapshot::from([
            ("value".to_string(), self.value),
            ("min".to_string(), self.min),
            ("max".to_string(), self.max),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct RateSink {
    pub trues: u64,
    pub total: u64,
}

impl RateSink {
    fn add(&mut self, value: f64) {
        self.total += 1;
        if value != 0.0 {
            self.trues += 1;
        }
    }

    fn format(&self) -> SinkSnapshot {
        let rate = if self.total == 0 {
            0.0
        } else {
            self.trues as f64 / self.total as f64
        };
        SinkSnapshot::from([("rate".to_string(), rate)])
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendSink {
    /// Observations in ascending order
    sorted: Vec<f64>,
    sum: f64,
}

impl TrendSink {
    fn add(&mut self, value: f64) {
        let at = self
            .sorted
            .partition_point(|v| v.total_cmp(&value).is_le());
        self.sorted.insert(at, value);
        self.sum += value;
    }

    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    fn format(&self) -> SinkSnapshot {
        let sorted = &self.sorted;
        if sorted.is_empty() {
            return SinkSnapshot::new();
        }

        let mut snapshot = SinkSnapshot::new();
        for stat in TREND_STATS {
            let value = match stat {
                "avg" => self.sum / sorted.len() as f64,
                "min" => sorted[0],
                "max" => sorted[sorted.len() - 1],
                "med" => percentile(sorted, 0.5),
                "p(90)" => percentile(sorted, 0.90),
                "p(95)" => percentile(sorted, 0.95),
                _ => continue,
            };
            snapshot.insert(stat.to_string(), value);
        }
        snapshot
    }
}

/// Linear interpolation between the closest ranks of an ascending slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let i = pct * (n - 1) as f64;
            let lower = sorted[i.floor() as usize];
            let upper = sorted[i.ceil() as usize];
            lower + (upper - lower) * (i - i.floor())
        }
    }
}

/// Aggregator of one metric, shaped by the metric's kind
#[derive(Debug, Clone)]
pub enum Sink {
    Counter(CounterSink),
    Gauge(GaugeSink),
    Rate(RateSink),
    Trend(TrendSink),
}

impl Sink {
    pub fn for_kind(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Sink::Counter(CounterSink::default()),
            MetricKind::Gauge => Sink::Gauge(GaugeSink::default()),
            MetricKind::Rate => Sink::Rate(RateSink::default()),
            MetricKind::Distribution => Sink::Trend(TrendSink::default()),
        }
    }

    pub fn add(&mut self, value: f64, time: DateTime<Utc>) {
        match self {
            Sink::Counter(sink) => sink.add(value, time),
            Sink::Gauge(sink) => sink.add(value),
            Sink::Rate(sink) => sink.add(value),
            Sink::Trend(sink) => sink.add(value),
        }
    }

    /// Statistics of the sink; `elapsed` only matters for counter rates.
    pub fn format(&self, elapsed: Duration) -> SinkSnapshot {
        match self {
            Sink::Counter(sink) => sink.format(elapsed),
            Sink::Gauge(sink) => sink.format(),
            Sink::Rate(sink) => sink.format(),
            Sink::Trend(sink) => sink.format(),
        }
    }

    /// Instant of the first counter observation. `None` for other kinds.
    pub fn first_observed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Sink::Counter(sink) => sink.first,
            _ => None,
        }
    }
}
