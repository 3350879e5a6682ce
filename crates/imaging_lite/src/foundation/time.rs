//! Time management utilities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Scene time at which a stage is evaluated
///
/// `Default` selects the non-animated value of every attribute; `Frame`
/// evaluates time samples at the given frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TimeCode {
    /// The default (non time-sampled) value
    #[default]
    Default,
    /// A numeric frame
    Frame(f64),
}

impl TimeCode {
    /// Numeric frame, if this is not the default time
    pub const fn frame(self) -> Option<f64> {
        match self {
            Self::Default => None,
            Self::Frame(frame) => Some(frame),
        }
    }

    /// Whether this is the default time
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<f64> for TimeCode {
    fn from(frame: f64) -> Self {
        Self::Frame(frame)
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "DEFAULT"),
            Self::Frame(frame) => write!(f, "{frame}"),
        }
    }
}

/// Simple stopwatch for measuring elapsed time
#[derive(Debug, Default)]
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and immediately start a stopwatch
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start or resume the stopwatch
    pub fn start(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }

    /// Stop the stopwatch, keeping the accumulated time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Total elapsed time
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.start_time.map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Format the elapsed time as `MM:SS.ss`
    pub fn elapsed_str(&self) -> String {
        let secs = self.elapsed().as_secs_f64();
        let minutes = (secs / 60.0).floor();
        format!("{:02}:{:05.2}", minutes as u64, secs - minutes * 60.0)
    }

    /// Whether the stopwatch is running
    pub const fn is_running(&self) -> bool {
        self.start_time.is_some()
    }
}
