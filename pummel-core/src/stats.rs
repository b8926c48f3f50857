use crate::constants::{EXCELLENT_RPS, GOOD_RPS, MEDIOCRE_RPS, NANOS_PER_SEC};
use crate::data::StatusCodeHistogram;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Statistics for a single load-test run.
///
/// Produced once by the aggregator after the result stream is drained. Both the target-count and
/// observed-count variants of the mean latency and the throughput are kept, since a run which was
/// cut short receives fewer results than it was asked to issue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub total: Duration,
    pub target_count: u64,
    pub received: u64,
    #[cfg_attr(feature = "serde", serde_as(as = "Option<DurationSecondsWithFrac<f64>>"))]
    pub fastest: Option<Duration>,
    #[cfg_attr(feature = "serde", serde_as(as = "Option<DurationSecondsWithFrac<f64>>"))]
    pub slowest: Option<Duration>,
    /// Sum of latencies divided by `target_count`.
    pub mean_latency_nanos: f64,
    /// Sum of latencies divided by `received`.
    pub observed_mean_latency_nanos: f64,
    /// `target_count` divided by `total`.
    pub requests_per_second: f64,
    /// `received` divided by `total`.
    pub observed_requests_per_second: f64,
    pub speed_index: SpeedIndex,
    pub status_codes: StatusCodeHistogram,
}

impl Summary {
    pub fn mean_latency_secs(&self) -> f64 {
        self.mean_latency_nanos / NANOS_PER_SEC
    }

    /// `fastest` in seconds, `0.0` when no result was received.
    pub fn fastest_secs(&self) -> f64 {
        self.fastest.map_or(0., |d| d.as_secs_f64())
    }

    /// `slowest` in seconds, `0.0` when no result was received.
    pub fn slowest_secs(&self) -> f64 {
        self.slowest.map_or(0., |d| d.as_secs_f64())
    }
}

/// Qualitative rating of a run's throughput.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SpeedIndex {
    Excellent,
    Good,
    Mediocre,
    Poor,
}

impl SpeedIndex {
    /// Thresholds are exclusive lower bounds: exactly 500 rps is `Good`, not `Excellent`.
    pub fn from_rps(rps: f64) -> Self {
        if rps > EXCELLENT_RPS {
            Self::Excellent
        } else if rps > GOOD_RPS {
            Self::Good
        } else if rps > MEDIOCRE_RPS {
            Self::Mediocre
        } else {
            Self::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Mediocre => "mediocre",
            Self::Poor => "poor",
        }
    }
}

impl fmt::Display for SpeedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
