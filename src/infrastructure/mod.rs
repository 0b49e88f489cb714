pub mod buffer;
pub mod k6_json;
pub mod observability;

pub use buffer::SampleBuffer;
pub use k6_json::{ContainerAssembler, K6JsonDecoder};
pub use observability::PushgatewayClient;
