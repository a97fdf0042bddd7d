// src/main.rs
mod config;
mod drivers;
mod engine;
mod recorder;
mod types;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::{AppConfig, SourceConfig};
use crate::drivers::pipeline::TelemetryPipeline;
use crate::drivers::serial::SerialLineSource;
use crate::drivers::source::{LineSource, SyntheticSource};
use crate::engine::EngineOptions;
use crate::recorder::SampleLogWriter;
use crate::types::EngineEvent;

/// Snapshots arrive per sample; the console only needs a heartbeat.
const SUMMARY_EVERY: u64 = 100;

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };
    info!(
        "graph window {} samples, stats window {} samples",
        config.capacity, config.stats_window
    );

    let writer = match &config.log_path {
        Some(path) => SampleLogWriter::create(path),
        None => SampleLogWriter::create_in_dir(&config.log_dir),
    }
    .context("failed to open the sample log destination")?;

    let pipeline = TelemetryPipeline::new(
        config.capacity,
        config.stats_window,
        writer,
        config.persistence,
    )
    .context("failed to build the telemetry pipeline")?;

    let source: Box<dyn LineSource + Send> = match &config.source {
        SourceConfig::Serial { port, baud } => {
            let session = SerialLineSource::connect(port, *baud)
                .with_context(|| format!("failed to open serial source {port}"))?;
            info!("reading telemetry from {}", session.port_name());
            Box::new(session)
        }
        SourceConfig::Synthetic { rate_hz, seed } => {
            info!("using synthetic telemetry at {rate_hz} Hz");
            Box::new(SyntheticSource::new(*rate_hz, *seed))
        }
    };

    let handle = engine::spawn(
        source,
        pipeline,
        EngineOptions {
            queue_depth: config.queue_depth,
            drain_on_shutdown: config.drain_on_shutdown,
        },
    );

    let mut published: u64 = 0;
    for event in handle.events.iter() {
        match event {
            EngineEvent::Snapshot(snapshot) => {
                published += 1;
                if published % SUMMARY_EVERY == 0 {
                    if let Some(mag) = snapshot.channels.iter().find(|c| c.label == "AccMag") {
                        info!(
                            "t={:.2}s AccMag value={:.3} var={:.5} std={:.5} (window {})",
                            snapshot.elapsed_secs,
                            mag.value,
                            mag.variance,
                            mag.std_dev,
                            snapshot.stats_window
                        );
                    }
                }
            }
            EngineEvent::WindowUpdated(window) => info!("stats window now {window}"),
            EngineEvent::WindowRejected(window) => {
                warn!("stats window request {window} rejected, keeping previous")
            }
            EngineEvent::Stopped {
                accepted,
                rejected,
                dropped_records,
            } => {
                info!(
                    "stream ended: {accepted} samples accepted, {rejected} rejected, \
                     {dropped_records} lost to log errors"
                );
                break;
            }
        }
    }
    handle.join();
    Ok(())
}
