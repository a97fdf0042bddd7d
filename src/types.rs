// src/types.rs

use crate::drivers::pipeline::StatsSnapshot;

/// Control requests accepted by a running engine.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCommand {
    /// Resize the statistics sub-window. Rejected (previous value kept) when
    /// outside `(1, capacity]`.
    SetStatsWindow(usize),
    /// Stop reading, settle the queue, flush the log and exit.
    Shutdown,
}

/// Messages the engine publishes to its consumer (a dashboard, a headless
/// logger, a test harness).
#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// Fresh statistics after an accepted sample.
    Snapshot(StatsSnapshot),
    WindowUpdated(usize),
    WindowRejected(usize),
    /// Final event; carries the session totals.
    Stopped {
        accepted: u64,
        rejected: u64,
        dropped_records: u64,
    },
}
