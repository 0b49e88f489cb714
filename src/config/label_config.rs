//! Label segregation parsing.
//!
//! Labels come from two places: the `pushgateway` extension options (a JSON
//! array that replaces the defaults) and `K6_LABEL_SEGREGATION` (a comma list
//! appended after them).

use serde_json::Value;

use crate::domain::errors::ConfigError;

pub fn default_labels() -> Vec<String> {
    vec!["scenario".to_string()]
}

/// Parses the extension options value, which must be an array of strings.
pub fn labels_from_ext(value: &Value) -> Result<Vec<String>, ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedLabels {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let entries = value
        .as_array()
        .ok_or_else(|| malformed("expected a JSON array of label names"))?;

    let mut labels = Vec::with_capacity(entries.len());
    for entry in entries {
        let label = entry
            .as_str()
            .ok_or_else(|| malformed("label names must be strings"))?
            .trim();
        if label.is_empty() {
            return Err(malformed("label names must not be empty"));
        }
        push_unique(&mut labels, label.to_string());
    }
    Ok(labels)
}

/// Appends the comma separated list to `labels`, lower-cased.
pub fn append_env_labels(labels: &mut Vec<String>, raw: &str) -> Result<(), ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }

    for part in raw.split(',') {
        let label = part.trim();
        if label.is_empty() {
            return Err(ConfigError::MalformedLabels {
                value: raw.to_string(),
                reason: "empty label name".to_string(),
            });
        }
        push_unique(labels, label.to_lowercase());
    }
    Ok(())
}

fn push_unique(labels: &mut Vec<String>, label: String) {
    if !labels.contains(&label) {
        labels.push(label);
    }
}
