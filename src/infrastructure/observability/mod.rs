//! Push-based delivery of converted k6 metrics.
//!
//! Nothing here listens for scrapes: each flush builds a transient registry
//! and sends it outbound to a Prometheus Pushgateway.

pub mod metrics;
pub mod pushgateway;

pub use metrics::{build_registry, render};
pub use pushgateway::PushgatewayClient;
