#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// How the aggregator decides that the result stream is finished.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DrainPolicy {
    /// Wait until every producer has hung up and the buffer is empty.
    #[default]
    UntilClosed,
    /// Stop at the first poll which finds nothing buffered. Results produced after that point
    /// are not part of the summary.
    FirstGap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregatorConfig {
    /// Number of requests the run was asked to issue. Used as the divisor for the mean latency
    /// and the throughput.
    pub target_count: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub drain: DrainPolicy,
}

impl AggregatorConfig {
    pub fn new(target_count: u64) -> Self {
        Self {
            target_count,
            drain: DrainPolicy::default(),
        }
    }

    pub fn drain(mut self, drain: DrainPolicy) -> Self {
        self.drain = drain;
        self
    }
}

/// Unit used for the `average` line of the report.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LatencyUnit {
    #[default]
    Seconds,
    Nanoseconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportConfig {
    pub average_unit: LatencyUnit,
    /// Print the status code distribution after the summary block.
    pub status_codes: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            average_unit: LatencyUnit::Seconds,
            status_codes: true,
        }
    }
}

impl ReportConfig {
    pub fn average_unit(mut self, unit: LatencyUnit) -> Self {
        self.average_unit = unit;
        self
    }

    pub fn status_codes(mut self, enabled: bool) -> Self {
        self.status_codes = enabled;
        self
    }
}

/// Token bucket parameters for byte-rate limiting.
///
/// One token is one byte. `burst` is both the bucket capacity and the largest chunk a
/// rate-limited reader will pull from its source in one go.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LimiterConfig {
    pub bytes_per_second: NonZeroU32,
    pub burst: NonZeroU32,
}

impl LimiterConfig {
    /// Sustained rate of `bytes_per_second` with a burst of one second's worth of bytes.
    pub fn per_second(bytes_per_second: NonZeroU32) -> Self {
        Self {
            bytes_per_second,
            burst: bytes_per_second,
        }
    }

    pub fn burst(mut self, burst: NonZeroU32) -> Self {
        self.burst = burst;
        self
    }
}
