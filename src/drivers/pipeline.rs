use std::sync::Arc;
use std::time::Instant;

use log::{error, info, warn};
use serde::Deserialize;

use crate::drivers::buffer::ChannelRing;
use crate::drivers::error::PipelineError;
use crate::drivers::parser::{self, RAW_CHANNELS};
use crate::drivers::signal::{self, DERIVED_CHANNELS};
use crate::drivers::stats::{windowed_stats, ChannelStats, StatsWindow};
use crate::recorder::SampleLogWriter;

pub const CHANNEL_COUNT: usize = RAW_CHANNELS + DERIVED_CHANNELS;

/// Channel order used everywhere: ring layout, snapshots, log columns.
pub const CHANNEL_LABELS: [&str; CHANNEL_COUNT] = [
    "AccX", "AccY", "AccZ", "GyroX", "GyroY", "GyroZ", "AccMag", "GyroMag",
];

/// One accepted reading: elapsed time since stream start plus the raw and
/// derived channel values. Immutable once assembled.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetrySample {
    pub elapsed_secs: f64,
    pub raw: [f64; RAW_CHANNELS],
    pub derived: [f64; DERIVED_CHANNELS],
}

impl TelemetrySample {
    /// Channel values in [`CHANNEL_LABELS`] order.
    pub fn channel_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.raw.iter().chain(self.derived.iter()).copied()
    }
}

/// What happens when a log append fails at runtime.
///
/// `Degrade` gives up durability for that one record and keeps ingesting;
/// `Fatal` stops the pipeline instead. Failing to *open* the log is always
/// fatal, this only covers appends on an already-open destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistencePolicy {
    Degrade,
    Fatal,
}

/// Per-sample statistics for every channel, published to the display side.
/// Ephemeral: never persisted, replaced by the next accepted sample.
#[derive(Clone, Debug)]
pub struct StatsSnapshot {
    pub elapsed_secs: f64,
    /// Window the statistics were computed over.
    pub stats_window: usize,
    pub channels: Vec<ChannelStats>,
}

/// Full-capacity view of every ring, oldest first: what a plot would draw.
/// Channels are in [`CHANNEL_LABELS`] order.
#[derive(Clone, Debug)]
pub struct TraceFrame {
    pub timestamps: Vec<f64>,
    pub channels: Vec<Vec<f64>>,
}

/// Owns the per-channel rings, the stats window and the log writer, and
/// drives one sample through parse → derive → buffer → persist → publish.
///
/// The pipeline never blocks waiting for input; its driver owns the poll
/// cycle and feeds it one line at a time.
pub struct TelemetryPipeline {
    rings: [ChannelRing; CHANNEL_COUNT],
    timestamps: ChannelRing,
    window: Arc<StatsWindow>,
    writer: SampleLogWriter,
    policy: PersistencePolicy,
    started_at: Instant,
    accepted: u64,
    rejected: u64,
    dropped_records: u64,
}

impl TelemetryPipeline {
    pub fn new(
        capacity: usize,
        initial_window: usize,
        writer: SampleLogWriter,
        policy: PersistencePolicy,
    ) -> Result<Self, PipelineError> {
        let window = Arc::new(StatsWindow::new(initial_window, capacity)?);
        Ok(Self {
            rings: std::array::from_fn(|_| ChannelRing::new(capacity)),
            timestamps: ChannelRing::new(capacity),
            window,
            writer,
            policy,
            started_at: Instant::now(),
            accepted: 0,
            rejected: 0,
            dropped_records: 0,
        })
    }

    /// Shared handle to the stats window for the control side.
    pub fn stats_window(&self) -> Arc<StatsWindow> {
        Arc::clone(&self.window)
    }

    /// Applies a new stats window size; rejected (prior value retained) when
    /// outside `(1, capacity]`.
    pub fn set_stats_window(&self, requested: usize) -> Result<(), PipelineError> {
        self.window.set(requested)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Accepted samples whose log append failed under the `Degrade` policy.
    pub fn dropped_records(&self) -> u64 {
        self.dropped_records
    }

    /// Runs one raw line through the whole per-sample flow.
    ///
    /// Blank lines and malformed lines both yield `None`: blanks silently,
    /// malformed ones with a diagnostic and a counter bump. Neither touches
    /// the rings or the log, and neither ever halts the stream. `Err` is
    /// only possible for a persistence failure under [`PersistencePolicy::Fatal`].
    pub fn ingest_line(&mut self, line: &str) -> Result<Option<StatsSnapshot>, PipelineError> {
        let raw = match parser::parse_line(line) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(failure) => {
                self.rejected += 1;
                warn!("discarding line: {failure}");
                return Ok(None);
            }
        };
        let sample = TelemetrySample {
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
            raw,
            derived: signal::derive(&raw),
        };
        for (ring, value) in self.rings.iter_mut().zip(sample.channel_values()) {
            ring.push(value);
        }
        self.timestamps.push(sample.elapsed_secs);
        self.accepted += 1;
        if let Err(err) = self.writer.append(&sample) {
            match self.policy {
                PersistencePolicy::Degrade => {
                    self.dropped_records += 1;
                    error!("log append failed, record lost: {err}");
                }
                PersistencePolicy::Fatal => return Err(PipelineError::Persistence(err)),
            }
        }
        Ok(Some(self.snapshot()))
    }

    /// Statistics for every channel over the current stats window.
    pub fn snapshot(&self) -> StatsSnapshot {
        let window = self.window.get();
        StatsSnapshot {
            elapsed_secs: self.timestamps.latest(),
            stats_window: window,
            channels: CHANNEL_LABELS
                .iter()
                .copied()
                .zip(self.rings.iter())
                .map(|(label, ring)| windowed_stats(label, ring, window))
                .collect(),
        }
    }

    /// Full-capacity trace of every ring for the display side.
    pub fn frame(&self) -> TraceFrame {
        let capacity = self.timestamps.capacity();
        TraceFrame {
            timestamps: self.timestamps.window(capacity),
            channels: self
                .rings
                .iter()
                .map(|ring| ring.window(capacity))
                .collect(),
        }
    }

    /// Flushes and hands back session totals. Called once on shutdown.
    pub fn finish(&mut self) -> Result<(), PipelineError> {
        self.writer.finish().map_err(PipelineError::Persistence)?;
        info!(
            "session complete: {} accepted, {} rejected, {} records lost",
            self.accepted, self.rejected, self.dropped_records
        );
        Ok(())
    }
}
