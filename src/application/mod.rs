// Metric-kind to collector resolution
pub mod resolver;

// Periodic flush and push lifecycle
pub mod output;

pub use output::PushgatewayOutput;
