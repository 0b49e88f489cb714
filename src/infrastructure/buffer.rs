use parking_lot::Mutex;

use crate::domain::sample::{Sample, SampleContainer};

/// Samples waiting for the next flush.
///
/// Producers append whole containers; the flusher swaps the backlog out in
/// one step, so every container lands in exactly one drained batch.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    containers: Mutex<Vec<SampleContainer>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_metric_samples(&self, samples: Vec<Sample>) {
        if samples.is_empty() {
            return;
        }
        self.containers.lock().push(SampleContainer::new(samples));
    }

    /// Takes everything buffered so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<SampleContainer> {
        std::mem::take(&mut *self.containers.lock())
    }

    pub fn len(&self) -> usize {
        self.containers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.lock().is_empty()
    }
}
