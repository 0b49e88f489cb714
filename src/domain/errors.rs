use thiserror::Error;

use crate::domain::metric::MetricKind;

/// Errors raised while loading the output configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid push interval '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid Pushgateway URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("malformed label list '{value}': {reason}")]
    MalformedLabels { value: String, reason: String },

    #[error("job name must not be empty")]
    EmptyJobName,

    #[error("invalid metric namespace '{value}': must match [a-zA-Z_:][a-zA-Z0-9_:]*")]
    InvalidNamespace { value: String },
}

/// Errors related to the metric catalog
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("metric '{name}' is already declared as {existing}, cannot redeclare as {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("metric name must not be empty")]
    EmptyName,
}

/// Errors that abandon the push of one flush batch
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("failed to register collector '{name}': {source}")]
    Registration {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    #[error(transparent)]
    Push(#[from] PushError),
}

/// Errors returned by the Pushgateway transport
#[derive(Debug, Error)]
pub enum PushError {
    #[error("failed to build push URL from '{base}': {reason}")]
    InvalidUrl { base: String, reason: String },

    #[error("failed to encode metric families: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("Pushgateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Pushgateway rejected push with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Errors raised while decoding a k6 JSON-lines stream
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line {line}: malformed JSON: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: {source}")]
    Metric {
        line: usize,
        #[source]
        source: MetricError,
    },
}
