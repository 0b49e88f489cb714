//! Grouping keys derived from sample tags.

use crate::domain::sample::Sample;

/// Tag whose value becomes the `instance` grouping value of a push
pub const JOB_NAME_TAG: &str = "job_name";

/// Builds the subsystem segment of a sample's collector names.
///
/// Values of the configured labels present on the sample are joined with
/// `_` in label order. Absent labels are skipped.
pub fn subsystem(sample: &Sample, labels: &[String]) -> String {
    let mut subsystem = String::new();
    for value in labels.iter().filter_map(|label| sample.tag(label)) {
        if !subsystem.is_empty() {
            subsystem.push('_');
        }
        subsystem.push_str(value);
    }
    subsystem
}

/// `job_name` of the first sample in the batch that carries one.
pub fn instance(samples: &[Sample]) -> String {
    samples
        .iter()
        .find_map(|sample| sample.tag(JOB_NAME_TAG))
        .unwrap_or_default()
        .to_string()
}
