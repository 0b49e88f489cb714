use async_trait::async_trait;
use prometheus::Registry;

use crate::domain::errors::PushError;

/// Label the Pushgateway groups each push under
pub const GROUPING_LABEL: &str = "instance";

/// Outbound side of a flush: delivers one registry to the gateway
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Adds the gathered registry to the group `job/<grouping_label>/<grouping_value>`,
    /// replacing metrics with the same name in that group.
    async fn push(
        &self,
        registry: &Registry,
        job: &str,
        grouping_label: &str,
        grouping_value: &str,
    ) -> Result<(), PushError>;
}
