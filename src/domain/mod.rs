// Collectors produced by the resolvers
pub mod collector;

// Domain-specific error types
pub mod errors;

// Metric kinds and the metric catalog
pub mod metric;

// Port interfaces
pub mod ports;

// Samples and sample containers
pub mod sample;

// Per-metric aggregators
pub mod sink;
