// src/drivers/mod.rs
pub mod buffer;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod serial;
pub mod signal;
pub mod source;
pub mod stats;

pub use buffer::ChannelRing;
pub use error::{ParseFailure, PipelineError};
pub use pipeline::{
    PersistencePolicy, StatsSnapshot, TelemetryPipeline, TelemetrySample, TraceFrame,
    CHANNEL_COUNT, CHANNEL_LABELS,
};
pub use serial::SerialLineSource;
pub use source::{LinePoll, LineSource, ManualSource, SyntheticSource};
pub use stats::{ChannelStats, StatsWindow};
