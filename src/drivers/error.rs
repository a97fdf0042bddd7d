use thiserror::Error;

/// A single malformed input line.
///
/// Recovered inside the pipeline loop: the line is reported and dropped,
/// ingestion continues with the next one. Both variants carry the offending
/// line so diagnostics can show exactly what the device sent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("expected {expected} fields, got {found}: {line:?}")]
    FieldCount {
        expected: usize,
        found: usize,
        line: String,
    },
    #[error("field {token:?} is not a number: {line:?}")]
    BadNumber { token: String, line: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stats window {requested} outside valid range 2..={capacity}")]
    WindowRejected { requested: usize, capacity: usize },
    #[error("serial port unavailable: {0}")]
    Serial(#[from] serialport::Error),
    #[error("failed to read from telemetry source: {0}")]
    SourceRead(#[source] std::io::Error),
    #[error("failed to append record to the sample log: {0}")]
    Persistence(#[source] std::io::Error),
}
