//! Timing helpers for tick and fetch instrumentation

use std::time::{Duration, Instant};

/// Simple stopwatch used to report how long a tick section took
#[derive(Debug)]
pub struct Stopwatch {
    label: &'static str,
    started: Instant,
}

impl Stopwatch {
    /// Start timing a named section
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }

    /// Elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop and return the elapsed time, logging it at debug level
    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        tracing::debug!(section = self.label, elapsed_ms = elapsed.as_millis() as u64, "section timed");
        elapsed
    }
}
