// src/engine.rs

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::drivers::pipeline::TelemetryPipeline;
use crate::drivers::source::{LinePoll, LineSource};
use crate::types::{ControlCommand, EngineEvent};

/// How long the reader sleeps when the source has nothing to give.
const IDLE_POLL: Duration = Duration::from_millis(5);
/// How long the processing loop waits on the line queue before checking for
/// commands again.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug)]
pub struct EngineOptions {
    /// Depth of the bounded reader-to-pipeline queue. Backpressure when
    /// full, never reordering.
    pub queue_depth: usize,
    /// Whether lines still queued at shutdown are run through the pipeline
    /// or discarded.
    pub drain_on_shutdown: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            queue_depth: 256,
            drain_on_shutdown: true,
        }
    }
}

/// Handle to a running engine: commands in, events out.
pub struct EngineHandle {
    pub commands: Sender<ControlCommand>,
    pub events: Receiver<EngineEvent>,
    worker: JoinHandle<()>,
}

impl EngineHandle {
    /// Requests shutdown and waits for the worker to settle.
    pub fn shutdown(self) {
        let _ = self.commands.send(ControlCommand::Shutdown);
        let _ = self.worker.join();
    }

    /// Waits for the engine to stop on its own (source closed or fatal
    /// pipeline error).
    pub fn join(self) {
        let _ = self.worker.join();
    }
}

/// Spawns the reader and processing threads around `source` and `pipeline`.
pub fn spawn<S>(source: S, pipeline: TelemetryPipeline, options: EngineOptions) -> EngineHandle
where
    S: LineSource + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let worker = thread::spawn(move || run(source, pipeline, options, command_rx, event_tx));
    EngineHandle {
        commands: command_tx,
        events: event_rx,
        worker,
    }
}

/// Reader side of the split: pulls lines off the source and feeds the
/// bounded queue. A full queue blocks the send, which is the backpressure.
fn read_lines<S: LineSource>(mut source: S, sink: SyncSender<String>) {
    loop {
        match source.next_line() {
            Ok(LinePoll::Line(line)) => {
                // Send fails only when the consumer is gone; stop pulling.
                if sink.send(line).is_err() {
                    break;
                }
            }
            Ok(LinePoll::Empty) => thread::sleep(IDLE_POLL),
            Ok(LinePoll::Closed) => {
                debug!("line source closed");
                break;
            }
            Err(err) => {
                error!("line source failed: {err}");
                break;
            }
        }
    }
}

fn run(
    source: impl LineSource + Send + 'static,
    mut pipeline: TelemetryPipeline,
    options: EngineOptions,
    commands: Receiver<ControlCommand>,
    events: Sender<EngineEvent>,
) {
    let (line_tx, line_rx) = mpsc::sync_channel(options.queue_depth);
    let reader = thread::spawn(move || read_lines(source, line_tx));

    let mut shutdown_requested = false;
    let mut fatal = false;
    'processing: loop {
        // Commands first, so a window change applies before the next sample.
        while let Ok(command) = commands.try_recv() {
            match command {
                ControlCommand::SetStatsWindow(requested) => {
                    match pipeline.set_stats_window(requested) {
                        Ok(()) => {
                            info!("stats window set to {requested}");
                            let _ = events.send(EngineEvent::WindowUpdated(requested));
                        }
                        Err(err) => {
                            warn!("{err}");
                            let _ = events.send(EngineEvent::WindowRejected(requested));
                        }
                    }
                }
                ControlCommand::Shutdown => {
                    shutdown_requested = true;
                    break 'processing;
                }
            }
        }
        match line_rx.recv_timeout(RECV_TIMEOUT) {
            Ok(line) => match pipeline.ingest_line(&line) {
                Ok(Some(snapshot)) => {
                    let _ = events.send(EngineEvent::Snapshot(snapshot));
                }
                Ok(None) => {}
                Err(err) => {
                    error!("pipeline stopped: {err}");
                    fatal = true;
                    break 'processing;
                }
            },
            // Source quiet; loop back around for commands.
            Err(RecvTimeoutError::Timeout) => {}
            // Reader finished: source closed or failed, queue fully drained.
            Err(RecvTimeoutError::Disconnected) => break 'processing,
        }
    }

    if shutdown_requested && options.drain_on_shutdown && !fatal {
        while let Ok(line) = line_rx.try_recv() {
            match pipeline.ingest_line(&line) {
                Ok(Some(snapshot)) => {
                    let _ = events.send(EngineEvent::Snapshot(snapshot));
                }
                Ok(None) => {}
                Err(err) => {
                    error!("pipeline stopped while draining: {err}");
                    break;
                }
            }
        }
    }

    // Unblocks a reader stuck on a full queue, which then exits on its own.
    drop(line_rx);
    let _ = reader.join();

    if let Err(err) = pipeline.finish() {
        error!("failed to flush the sample log: {err}");
    }
    let _ = events.send(EngineEvent::Stopped {
        accepted: pipeline.accepted(),
        rejected: pipeline.rejected(),
        dropped_records: pipeline.dropped_records(),
    });
}
