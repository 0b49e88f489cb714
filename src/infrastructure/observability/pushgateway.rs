//! Pushgateway HTTP transport.
//!
//! Pushes use `POST`, which replaces metrics of the same name inside the
//! grouping and leaves the rest of the group untouched.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use prometheus::{Encoder, Registry, TextEncoder};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::domain::errors::PushError;
use crate::domain::ports::PushTransport;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PushgatewayClient {
    client: Client,
    base_url: Url,
}

impl PushgatewayClient {
    /// Creates a client whose requests give up after `timeout`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// `<base>/metrics/job/<job>/<label>/<value>`, with each segment encoded
    /// according to the Pushgateway URL rules.
    pub fn push_url(
        &self,
        job: &str,
        grouping_label: &str,
        grouping_value: &str,
    ) -> Result<Url, PushError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| PushError::InvalidUrl {
                base: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?;
            segments.pop_if_empty().push("metrics");
            for (name, value) in [("job", job), (grouping_label, grouping_value)] {
                let (name, value) = encode_label(name, value);
                segments.push(&name).push(&value);
            }
        }
        Ok(url)
    }
}

/// Empty values and values containing `/` travel base64-encoded with an
/// `@base64` suffix on the label name.
fn encode_label(name: &str, value: &str) -> (String, String) {
    if value.is_empty() {
        (format!("{name}@base64"), "=".to_string())
    } else if value.contains('/') {
        (format!("{name}@base64"), URL_SAFE_NO_PAD.encode(value))
    } else {
        (name.to_string(), value.to_string())
    }
}

#[async_trait]
impl PushTransport for PushgatewayClient {
    async fn push(
        &self,
        registry: &Registry,
        job: &str,
        grouping_label: &str,
        grouping_value: &str,
    ) -> Result<(), PushError> {
        let url = self.push_url(job, grouping_label, grouping_value)?;

        let encoder = TextEncoder::new();
        let mut body = Vec::new();
        encoder.encode(&registry.gather(), &mut body)?;

        debug!("Pushing {} bytes to {}", body.len(), url);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, encoder.format_type())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collector::{Collector, ValueProvider};
    use crate::infrastructure::observability::metrics::build_registry;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> PushgatewayClient {
        PushgatewayClient::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    fn registry() -> Registry {
        build_registry(vec![Collector::gauge(
            "k6",
            "",
            "vus",
            ValueProvider::Snapshot(4.0),
        )])
        .unwrap()
    }

    #[test]
    fn test_push_url_plain_segments() {
        let url = client("http://localhost:9091")
            .push_url("k6_load_testing", "instance", "svc-a")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9091/metrics/job/k6_load_testing/instance/svc-a"
        );
    }

    #[test]
    fn test_push_url_keeps_base_path() {
        let url = client("http://gw.local/prefix/")
            .push_url("job", "instance", "a")
            .unwrap();
        assert_eq!(url.as_str(), "http://gw.local/prefix/metrics/job/job/instance/a");
    }

    #[test]
    fn test_push_url_empty_value_base64() {
        let url = client("http://localhost:9091")
            .push_url("k6", "instance", "")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9091/metrics/job/k6/instance@base64/="
        );
    }

    #[test]
    fn test_push_url_slash_value_base64() {
        let url = client("http://localhost:9091")
            .push_url("k6", "instance", "a/b")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9091/metrics/job/k6/instance@base64/YS9i"
        );
    }

    #[test]
    fn test_push_url_escapes_spaces() {
        let url = client("http://localhost:9091")
            .push_url("k6", "instance", "my svc")
            .unwrap();
        assert!(url.as_str().ends_with("/instance/my%20svc"));
    }

    #[tokio::test]
    async fn test_push_posts_text_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/metrics/job/k6/instance/svc-a"))
            .and(header("content-type", "text/plain; version=0.0.4"))
            .and(body_string_contains("k6_vus 4"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri())
            .push(&registry(), "k6", "instance", "svc-a")
            .await
            .expect("push should succeed");
    }

    #[tokio::test]
    async fn test_push_rejection_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad metric"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .push(&registry(), "k6", "instance", "svc-a")
            .await
            .unwrap_err();

        match err {
            PushError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad metric");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_push_unreachable_gateway() {
        // Port 9 (discard) is expected to refuse connections.
        let err = client("http://127.0.0.1:9")
            .push(&registry(), "k6", "instance", "")
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::Transport(_)));
    }
}
