//! Run statistics collection and reporting.
//!
//! This module tracks what a recorder run did. It provides:
//! 1. **Progress:** Frames stepped and entry point calls made.
//! 2. **Timing:** Host wall time and derived frames per second.
//! 3. **Reporting:** A fixed-width text summary in the same shape for every run.

use std::fmt::{self, Write as _};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Statistics for one recorder run.
#[derive(Clone, Debug, Serialize)]
pub struct RunStats {
    #[serde(skip)]
    start_time: Instant,
    /// Frames stepped so far.
    pub frames: u64,
    /// Entry point calls made (setup, step, and state pointer).
    pub host_calls: u64,
    /// Bytes copied out of linear memory.
    pub bytes_read: u64,
    /// Wall time from setup to completion; `None` while the run is in progress.
    pub elapsed: Option<Duration>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            frames: 0,
            host_calls: 0,
            bytes_read: 0,
            elapsed: None,
        }
    }
}

impl RunStats {
    /// Starts a fresh clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes the elapsed time.
    pub fn finish(&mut self) {
        self.elapsed = Some(self.start_time.elapsed());
    }

    /// Elapsed wall time, frozen once the run finishes.
    pub fn host_time(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.start_time.elapsed())
    }

    /// Frames stepped per host second.
    pub fn frames_per_second(&self) -> f64 {
        let seconds = self.host_time().as_secs_f64();
        if seconds > 0.0 {
            self.frames as f64 / seconds
        } else {
            0.0
        }
    }

    /// Renders the summary table.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = self.write_summary(&mut out);
        out
    }

    fn write_summary(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "==========================================================")?;
        writeln!(out, "REPLAY STATISTICS")?;
        writeln!(out, "==========================================================")?;
        writeln!(out, "host_seconds             {:.4} s", self.host_time().as_secs_f64())?;
        writeln!(out, "frames                   {}", self.frames)?;
        writeln!(out, "frames_per_second        {:.2}", self.frames_per_second())?;
        writeln!(out, "host_calls               {}", self.host_calls)?;
        writeln!(out, "bytes_read               {}", self.bytes_read)?;
        write!(out, "==========================================================")
    }

    /// Prints the summary to stdout.
    pub fn print(&self) {
        println!("{}", self.summary());
    }
}
