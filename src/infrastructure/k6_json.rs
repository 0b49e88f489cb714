//! Decoder for the `k6 run --out json` line format.
//!
//! ```text
//! {"type":"Metric","metric":"http_reqs","data":{"type":"counter","contains":"default"}}
//! {"type":"Point","metric":"http_reqs","data":{"time":"2024-05-01T10:00:00Z","value":1,"tags":{"scenario":"login"}}}
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::domain::errors::DecodeError;
use crate::domain::metric::{MetricCatalog, MetricKind};
use crate::domain::sample::{Sample, Tags};

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "type")]
    record_type: String,
    metric: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MetricData {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct PointData {
    time: DateTime<Utc>,
    value: f64,
    #[serde(default)]
    tags: Option<Tags>,
}

pub struct K6JsonDecoder {
    catalog: Arc<MetricCatalog>,
}

impl K6JsonDecoder {
    pub fn new(catalog: Arc<MetricCatalog>) -> Self {
        Self { catalog }
    }

    /// Decodes one line. Declarations and skipped records yield `None`.
    pub fn decode_line(&self, line_no: usize, line: &str) -> Result<Option<Sample>, DecodeError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let json_err = |source| DecodeError::Json {
            line: line_no,
            source,
        };
        let record: Record = serde_json::from_str(line).map_err(json_err)?;

        match record.record_type.as_str() {
            "Metric" => {
                let data: MetricData = serde_json::from_value(record.data).map_err(json_err)?;
                let Ok(kind) = data.kind.parse::<MetricKind>() else {
                    warn!(
                        "line {}: skipping metric '{}' of unknown type '{}'",
                        line_no, record.metric, data.kind
                    );
                    return Ok(None);
                };
                self.catalog
                    .declare(&record.metric, kind)
                    .map_err(|source| DecodeError::Metric {
                        line: line_no,
                        source,
                    })?;
                Ok(None)
            }
            "Point" => {
                let Some(metric) = self.catalog.get(&record.metric) else {
                    warn!(
                        "line {}: skipping point for undeclared metric '{}'",
                        line_no, record.metric
                    );
                    return Ok(None);
                };
                let data: PointData = serde_json::from_value(record.data).map_err(json_err)?;
                metric.observe(data.value, data.time);
                Ok(Some(Sample::new(
                    metric,
                    data.value,
                    data.time,
                    data.tags.unwrap_or_default(),
                )))
            }
            other => {
                warn!("line {}: skipping record of unknown type '{}'", line_no, other);
                Ok(None)
            }
        }
    }
}

/// Groups consecutive samples into containers the way k6 connects them:
/// same timestamp, each metric at most once.
#[derive(Debug, Default)]
pub struct ContainerAssembler {
    current: Vec<Sample>,
    names: HashSet<String>,
}

impl ContainerAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample, returning the previous container when it is complete.
    pub fn push(&mut self, sample: Sample) -> Option<Vec<Sample>> {
        let starts_new = self.current.first().is_some_and(|first| {
            first.time() != sample.time() || self.names.contains(sample.name())
        });

        let completed = if starts_new { self.finish() } else { None };
        self.names.insert(sample.name().to_string());
        self.current.push(sample);
        completed
    }

    /// Hands out whatever is pending.
    pub fn finish(&mut self) -> Option<Vec<Sample>> {
        self.names.clear();
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}
