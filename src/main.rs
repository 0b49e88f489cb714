//! k6 Pushgateway output - headless relay
//!
//! Reads the `k6 run --out json` line stream from a file or stdin, converts
//! the samples into Prometheus collectors and pushes them to a Pushgateway
//! every push interval.
//!
//! # Usage
//! ```sh
//! k6 run --out json=- script.js | K6_PUSHGATEWAY_URL=http://gw:9091 k6-pushgateway
//! ```
//!
//! # Environment Variables
//! - `K6_PUSHGATEWAY_URL` - Pushgateway base URL (default: http://localhost:9091)
//! - `K6_JOB_NAME` - Pushgateway job (default: k6_load_testing)
//! - `K6_PUSHGATEWAY_NAMESPACE` - Prefix of every metric name (default: none)
//! - `K6_PUSH_INTERVAL` - Time between pushes (default: 5s)
//! - `K6_PUSH_TIMEOUT` - Timeout of one push request (default: 10s)
//! - `K6_LABEL_SEGREGATION` - Extra tag names used to split metric names
//! - `RUST_LOG` - Log filter (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use k6_pushgateway::application::PushgatewayOutput;
use k6_pushgateway::config::Config;
use k6_pushgateway::domain::metric::MetricCatalog;
use k6_pushgateway::infrastructure::{ContainerAssembler, K6JsonDecoder, PushgatewayClient};

#[derive(Debug, Parser)]
#[command(version, about = "Push k6 metrics to a Prometheus Pushgateway")]
struct Args {
    /// k6 JSON output file; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Label segregation as a JSON array, replacing the default ["scenario"]
    #[arg(long, value_name = "JSON")]
    labels: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays free for piping
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stderr_layer)
        .init();

    let args = Args::parse();

    let ext_labels = args
        .labels
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--labels must be a JSON array of tag names")?;

    let config = Config::from_env(ext_labels.as_ref()).context("Invalid configuration")?;
    let transport = PushgatewayClient::new(config.push_gateway_url.clone(), config.push_timeout)
        .context("Failed to build Pushgateway client")?;

    let output = PushgatewayOutput::new(config, Arc::new(transport));
    info!("k6-pushgateway {} - {}", env!("CARGO_PKG_VERSION"), output.description());
    output.start();

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let relayed = relay(reader, &output).await;

    info!("Input finished. Flushing remaining samples...");
    output.stop().await;
    relayed
}

/// Feeds decoded samples into the output until end of input or Ctrl+C.
async fn relay(
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
    output: &PushgatewayOutput,
) -> Result<()> {
    let decoder = K6JsonDecoder::new(Arc::new(MetricCatalog::new()));
    let mut assembler = ContainerAssembler::new();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                line_no += 1;
                match decoder.decode_line(line_no, &line) {
                    Ok(Some(sample)) => {
                        if let Some(container) = assembler.push(sample) {
                            output.add_metric_samples(container);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Skipping input: {}", e),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    if let Some(container) = assembler.finish() {
        output.add_metric_samples(container);
    }
    Ok(())
}
