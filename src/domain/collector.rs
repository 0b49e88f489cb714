use std::fmt;
use std::sync::Arc;

/// Exposition type of a collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorKind {
    Counter,
    Gauge,
}

/// Where a collector reads its value from
#[derive(Clone)]
pub enum ValueProvider {
    /// Value frozen when the collector was resolved
    Snapshot(f64),
    /// Value computed every time the registry is scanned
    Live(Arc<dyn Fn() -> f64 + Send + Sync>),
}

impl ValueProvider {
    pub fn live<F>(f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        ValueProvider::Live(Arc::new(f))
    }

    pub fn current(&self) -> f64 {
        match self {
            ValueProvider::Snapshot(value) => *value,
            ValueProvider::Live(f) => f(),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ValueProvider::Live(_))
    }
}

impl fmt::Debug for ValueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueProvider::Snapshot(value) => f.debug_tuple("Snapshot").field(value).finish(),
            ValueProvider::Live(_) => f.write_str("Live(..)"),
        }
    }
}

/// A named metric ready to be registered and pushed.
///
/// Collectors live for one flush cycle only.
#[derive(Debug, Clone)]
pub struct Collector {
    pub namespace: String,
    pub subsystem: String,
    pub name: String,
    pub kind: CollectorKind,
    pub value: ValueProvider,
}

impl Collector {
    pub fn gauge(namespace: &str, subsystem: &str, name: &str, value: ValueProvider) -> Self {
        Self {
            namespace: namespace.to_string(),
            subsystem: subsystem.to_string(),
            name: name.to_string(),
            kind: CollectorKind::Gauge,
            value,
        }
    }

    pub fn counter(namespace: &str, subsystem: &str, name: &str, value: ValueProvider) -> Self {
        Self {
            namespace: namespace.to_string(),
            subsystem: subsystem.to_string(),
            name: name.to_string(),
            kind: CollectorKind::Counter,
            value,
        }
    }

    /// Name as exposed to Prometheus: non-empty parts joined with `_`.
    pub fn fq_name(&self) -> String {
        [
            self.namespace.as_str(),
            self.subsystem.as_str(),
            self.name.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
    }

    pub fn current_value(&self) -> f64 {
        self.value.current()
    }
}

/// Whether `name` matches the Prometheus metric name grammar
/// `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
