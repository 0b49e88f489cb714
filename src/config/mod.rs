//! Output configuration, loaded from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `K6_PUSHGATEWAY_URL` | `http://localhost:9091` |
//! | `K6_JOB_NAME` | `k6_load_testing` |
//! | `K6_PUSHGATEWAY_NAMESPACE` | empty |
//! | `K6_PUSH_INTERVAL` | `5s` |
//! | `K6_PUSH_TIMEOUT` | `10s` |
//! | `K6_LABEL_SEGREGATION` | none, appended to `["scenario"]` |

mod label_config;

pub use label_config::{append_env_labels, default_labels, labels_from_ext};

use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use url::Url;

use crate::domain::collector::is_valid_metric_name;
use crate::domain::errors::ConfigError;

pub const DEFAULT_PUSHGATEWAY_URL: &str = "http://localhost:9091";
pub const DEFAULT_JOB_NAME: &str = "k6_load_testing";
pub const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    pub job_name: String,
    pub push_gateway_url: Url,
    pub push_interval: Duration,
    pub push_timeout: Duration,
    /// Prefix of every collector name
    pub namespace: String,
    /// Tag names whose values build the subsystem of collector names
    pub label_segregation: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            push_gateway_url: Url::parse(DEFAULT_PUSHGATEWAY_URL)
                .expect("default Pushgateway URL is valid"),
            push_interval: DEFAULT_PUSH_INTERVAL,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
            namespace: String::new(),
            label_segregation: default_labels(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env(ext_labels: Option<&Value>) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars, ext_labels)
    }

    /// Build the configuration from a set of variables and the optional
    /// `pushgateway` extension options.
    pub fn from_vars(
        vars: &HashMap<String, String>,
        ext_labels: Option<&Value>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ext) = ext_labels {
            config.label_segregation = labels_from_ext(ext)?;
        }

        if let Some(url) = vars.get("K6_PUSHGATEWAY_URL") {
            config.push_gateway_url = parse_url(url)?;
        }
        if let Some(job) = vars.get("K6_JOB_NAME") {
            let job = job.trim();
            if job.is_empty() {
                return Err(ConfigError::EmptyJobName);
            }
            config.job_name = job.to_string();
        }
        if let Some(namespace) = vars.get("K6_PUSHGATEWAY_NAMESPACE") {
            config.namespace = parse_namespace(namespace)?;
        }
        if let Some(interval) = vars.get("K6_PUSH_INTERVAL") {
            config.push_interval = parse_duration(interval)?;
        }
        if let Some(timeout) = vars.get("K6_PUSH_TIMEOUT") {
            config.push_timeout = parse_duration(timeout)?;
        }
        if let Some(labels) = vars.get("K6_LABEL_SEGREGATION") {
            append_env_labels(&mut config.label_segregation, labels)?;
        }

        Ok(config)
    }
}

fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason,
    };

    let duration = humantime::parse_duration(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if duration.is_zero() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(duration)
}

fn parse_namespace(value: &str) -> Result<String, ConfigError> {
    let namespace = value.trim();
    if !namespace.is_empty() && !is_valid_metric_name(namespace) {
        return Err(ConfigError::InvalidNamespace {
            value: namespace.to_string(),
        });
    }
    Ok(namespace.to_string())
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: value.to_string(),
        reason,
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&HashMap::new(), None).unwrap();
        assert_eq!(config.job_name, "k6_load_testing");
        assert_eq!(config.push_gateway_url.as_str(), "http://localhost:9091/");
        assert_eq!(config.push_interval, Duration::from_secs(5));
        assert_eq!(config.push_timeout, Duration::from_secs(10));
        assert_eq!(config.namespace, "");
        assert_eq!(config.label_segregation, vec!["scenario"]);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_vars(
            &vars(&[
                ("K6_PUSHGATEWAY_URL", "https://gw.example.com:9091"),
                ("K6_JOB_NAME", "checkout"),
                ("K6_PUSHGATEWAY_NAMESPACE", "k6"),
                ("K6_PUSH_INTERVAL", "1m30s"),
                ("K6_PUSH_TIMEOUT", "500ms"),
                ("K6_LABEL_SEGREGATION", "ENV"),
            ]),
            None,
        )
        .unwrap();

        assert_eq!(config.push_gateway_url.host_str(), Some("gw.example.com"));
        assert_eq!(config.job_name, "checkout");
        assert_eq!(config.namespace, "k6");
        assert_eq!(config.push_interval, Duration::from_secs(90));
        assert_eq!(config.push_timeout, Duration::from_millis(500));
        assert_eq!(config.label_segregation, vec!["scenario", "env"]);
    }

    #[test]
    fn test_ext_labels_replace_defaults() {
        let ext = json!(["env", "region"]);
        let config = Config::from_vars(&vars(&[("K6_LABEL_SEGREGATION", "zone")]), Some(&ext))
            .unwrap();
        assert_eq!(config.label_segregation, vec!["env", "region", "zone"]);
    }

    #[test]
    fn test_invalid_interval_fails_fast() {
        let err = Config::from_vars(&vars(&[("K6_PUSH_INTERVAL", "soon")]), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { .. }));

        let err = Config::from_vars(&vars(&[("K6_PUSH_INTERVAL", "0s")]), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { .. }));
    }

    #[test]
    fn test_invalid_url_fails_fast() {
        let err = Config::from_vars(&vars(&[("K6_PUSHGATEWAY_URL", "not a url")]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = Config::from_vars(&vars(&[("K6_PUSHGATEWAY_URL", "ftp://gw:21")]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_invalid_namespace_fails_fast() {
        let err = Config::from_vars(&vars(&[("K6_PUSHGATEWAY_NAMESPACE", "k6-load")]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNamespace { .. }));

        let err = Config::from_vars(&vars(&[("K6_PUSHGATEWAY_NAMESPACE", "6k")]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNamespace { .. }));

        let config = Config::from_vars(&vars(&[("K6_PUSHGATEWAY_NAMESPACE", " ")]), None)
            .unwrap();
        assert_eq!(config.namespace, "");
    }

    #[test]
    fn test_empty_job_name_rejected() {
        let err = Config::from_vars(&vars(&[("K6_JOB_NAME", " ")]), None).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyJobName));
    }

    #[test]
    fn test_malformed_labels_rejected() {
        let err = Config::from_vars(&vars(&[("K6_LABEL_SEGREGATION", "env,")]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLabels { .. }));
    }
}
