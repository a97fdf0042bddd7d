//! Live windowed statistics over the channel rings.
//!
//! Everything here is recomputed from scratch on every accepted sample. The
//! windows are tens to hundreds of elements, so the two-pass walk is cheap
//! and an incremental variance would only add state to get wrong.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::drivers::buffer::ChannelRing;
use crate::drivers::error::PipelineError;

/// Statistics for one channel over the current stats window.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelStats {
    pub label: &'static str,
    /// Most recently pushed value (independent of the window).
    pub value: f64,
    pub mean: f64,
    /// Population variance: divide by the window length, not length - 1.
    pub variance: f64,
    pub std_dev: f64,
}

/// Shared statistics window size, invariant `1 < window <= capacity`.
///
/// The control side updates it while the pipeline reads it once per sample;
/// a single atomic cell makes the update one assignment, so a reader can
/// never observe a torn value. An out-of-range request is rejected and the
/// previous value stays in force.
pub struct StatsWindow {
    samples: AtomicUsize,
    capacity: usize,
}

impl StatsWindow {
    pub fn new(initial: usize, capacity: usize) -> Result<Self, PipelineError> {
        let window = Self {
            samples: AtomicUsize::new(0),
            capacity,
        };
        window.set(initial)?;
        Ok(window)
    }

    pub fn get(&self) -> usize {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Applies a new window size; takes effect on the next statistics
    /// computation.
    pub fn set(&self, requested: usize) -> Result<(), PipelineError> {
        if requested <= 1 || requested > self.capacity {
            return Err(PipelineError::WindowRejected {
                requested,
                capacity: self.capacity,
            });
        }
        self.samples.store(requested, Ordering::Relaxed);
        Ok(())
    }
}

/// Mean, population variance and standard deviation over the trailing
/// `window` values of a ring.
pub fn windowed_stats(label: &'static str, ring: &ChannelRing, window: usize) -> ChannelStats {
    let recent = ring.window(window);
    let mean = recent.iter().sum::<f64>() / recent.len() as f64;
    let variance = recent
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>()
        / recent.len() as f64;
    ChannelStats {
        label,
        value: ring.latest(),
        mean,
        variance,
        std_dev: variance.sqrt(),
    }
}
