//! Periodic Pushgateway output.
//!
//! Producers hand samples to [`PushgatewayOutput::add_metric_samples`]. A
//! timer drains the buffer every push interval and hands the backlog to a
//! background task that resolves, registers and pushes each container.
//! [`PushgatewayOutput::stop`] flushes one last time and waits for every
//! background task before returning.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::application::resolver::{instance, resolve_samples};
use crate::config::Config;
use crate::domain::errors::FlushError;
use crate::domain::metric::MetricKind;
use crate::domain::ports::{GROUPING_LABEL, PushTransport};
use crate::domain::sample::{Sample, SampleContainer};
use crate::infrastructure::buffer::SampleBuffer;
use crate::infrastructure::observability::metrics::{build_registry, render};

/// Everything a background flush needs, shared by all flush tasks
struct FlushContext {
    job_name: String,
    namespace: String,
    labels: Vec<String>,
    transport: Arc<dyn PushTransport>,
}

impl FlushContext {
    async fn flush_all(&self, containers: Vec<SampleContainer>) {
        for container in containers {
            if let Err(e) = self.flush_container(&container).await {
                match e {
                    FlushError::Registration { .. } => {
                        error!("Dropping batch of {} samples: {}", container.len(), e)
                    }
                    FlushError::Push(_) => error!("Could not add to Pushgateway: {}", e),
                }
            }
        }
    }

    async fn flush_container(&self, container: &SampleContainer) -> Result<(), FlushError> {
        let samples = container.samples();
        dump_samples(samples);

        let collectors = resolve_samples(samples, &self.namespace, &self.labels);
        let registry = build_registry(collectors)?;
        debug!(collectors = %render(&registry), "Dump collectors.");

        let instance = instance(samples);
        self.transport
            .push(&registry, &self.job_name, GROUPING_LABEL, &instance)
            .await?;
        Ok(())
    }
}

fn dump_samples(samples: &[Sample]) {
    for sample in samples {
        let stat = match sample.kind() {
            MetricKind::Counter => Some("count"),
            MetricKind::Gauge => Some("value"),
            MetricKind::Rate => Some("rate"),
            MetricKind::Distribution => None,
        };
        let aggregated =
            stat.and_then(|key| sample.metric().format(Duration::ZERO).get(key).copied());
        debug!(
            metric = sample.name(),
            sample_value = sample.value(),
            sink_value = ?aggregated,
            kind = %sample.kind(),
            "Dump k6 sample."
        );
    }
}

/// State shared between the output handle and its timer task
struct Shared {
    buffer: SampleBuffer,
    context: Arc<FlushContext>,
    in_flight: Mutex<JoinSet<()>>,
}

impl Shared {
    /// Drains the buffer and processes the backlog on a new task.
    fn flush(&self) {
        let containers = self.buffer.drain();
        let mut in_flight = self.in_flight.lock();

        while let Some(finished) = in_flight.try_join_next() {
            log_join(finished);
        }

        if containers.is_empty() {
            return;
        }

        debug!("Flushing {} sample containers", containers.len());
        let context = Arc::clone(&self.context);
        in_flight.spawn(async move { context.flush_all(containers).await });
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Flush task failed: {}", e);
    }
}

/// Timer task and the channel that stops it
struct PeriodicFlusher {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicFlusher {
    fn start(shared: Arc<Shared>, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => shared.flush(),
                    _ = &mut stop_rx => break,
                }
            }
        });

        Self { stop_tx, handle }
    }

    async fn stop(self) {
        // The timer task may already be gone; either way it is joined below.
        let _ = self.stop_tx.send(());
        if let Err(e) = self.handle.await {
            error!("Periodic flusher failed: {}", e);
        }
    }
}

/// k6 output that pushes converted samples to a Prometheus Pushgateway
pub struct PushgatewayOutput {
    config: Config,
    shared: Arc<Shared>,
    flusher: Mutex<Option<PeriodicFlusher>>,
}

impl PushgatewayOutput {
    pub fn new(config: Config, transport: Arc<dyn PushTransport>) -> Self {
        let context = FlushContext {
            job_name: config.job_name.clone(),
            namespace: config.namespace.clone(),
            labels: config.label_segregation.clone(),
            transport,
        };

        Self {
            config,
            shared: Arc::new(Shared {
                buffer: SampleBuffer::new(),
                context: Arc::new(context),
                in_flight: Mutex::new(JoinSet::new()),
            }),
            flusher: Mutex::new(None),
        }
    }

    pub fn description(&self) -> String {
        format!(
            "pushgateway: {}, job: {}, labels: [{}]",
            self.config.push_gateway_url,
            self.config.job_name,
            self.config.label_segregation.join(" ")
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Buffers one container of samples until the next flush.
    pub fn add_metric_samples(&self, samples: Vec<Sample>) {
        self.shared.buffer.add_metric_samples(samples);
    }

    /// Starts the periodic flusher. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut flusher = self.flusher.lock();
        if flusher.is_some() {
            warn!("Pushgateway output already started");
            return;
        }

        debug!("Starting...");
        *flusher = Some(PeriodicFlusher::start(
            Arc::clone(&self.shared),
            self.config.push_interval,
        ));
        info!(
            "Pushgateway output started (interval: {:?})",
            self.config.push_interval
        );
    }

    /// Drains the buffer now instead of waiting for the next tick.
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Stops the timer, flushes what is left and waits for every pending push.
    pub async fn stop(&self) {
        debug!("Stopping...");
        let flusher = self.flusher.lock().take();
        if let Some(flusher) = flusher {
            flusher.stop().await;
        }

        self.shared.flush();

        // A concurrent flush may spawn into the set while we wait, so keep
        // draining until it stays empty.
        loop {
            let mut pending = std::mem::take(&mut *self.shared.in_flight.lock());
            if pending.is_empty() {
                break;
            }
            while let Some(finished) = pending.join_next().await {
                log_join(finished);
            }
        }
        debug!("Stopped!");
    }
}
