use crate::constants::TRANSPORT_FAILURE_STATUS;
use crate::stats::{SpeedIndex, Summary};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::time::Duration;
use tracing::debug;

/// Outcome of a single completed request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RequestResult {
    pub status_code: u16,
    pub duration: Duration,
}

impl RequestResult {
    pub fn new(status_code: u16, duration: Duration) -> Self {
        Self {
            status_code,
            duration,
        }
    }

    /// A request which never produced a response (connect failure, timeout, ...).
    pub fn transport_failure(duration: Duration) -> Self {
        Self::new(TRANSPORT_FAILURE_STATUS, duration)
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status_code == TRANSPORT_FAILURE_STATUS
    }
}

/// Occurrence count per status code, ordered by code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StatusCodeHistogram {
    counts: BTreeMap<u16, u64>,
}

impl StatusCodeHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status_code: u16) {
        *self.counts.entry(status_code).or_insert(0) += 1;
    }

    pub fn get(&self, status_code: u16) -> u64 {
        self.counts.get(&status_code).copied().unwrap_or(0)
    }

    /// Sum of all counts, i.e. the number of results recorded.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.counts.iter().map(|(code, count)| (*code, *count))
    }
}

impl<'a> IntoIterator for &'a StatusCodeHistogram {
    type Item = (&'a u16, &'a u64);
    type IntoIter = btree_map::Iter<'a, u16, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

impl FromIterator<(u16, u64)> for StatusCodeHistogram {
    fn from_iter<I: IntoIterator<Item = (u16, u64)>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for (code, count) in iter.into_iter().filter(|(_, count)| *count > 0) {
            *histogram.counts.entry(code).or_insert(0) += count;
        }
        histogram
    }
}

/// Running totals for one run. Every aggregation owns its own accumulator, so
/// nothing leaks between runs.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    status_codes: StatusCodeHistogram,
    latency_sum_nanos: u128,
    fastest: Option<Duration>,
    slowest: Option<Duration>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: RequestResult) {
        self.status_codes.record(result.status_code);
        self.latency_sum_nanos += result.duration.as_nanos();

        if self.fastest.map_or(true, |fastest| result.duration < fastest) {
            self.fastest = Some(result.duration);
        }
        if self.slowest.map_or(true, |slowest| result.duration > slowest) {
            self.slowest = Some(result.duration);
        }
    }

    /// Number of results pushed so far.
    pub fn received(&self) -> u64 {
        self.status_codes.total()
    }

    pub fn latency_sum_nanos(&self) -> u128 {
        self.latency_sum_nanos
    }

    /// Finalize into a [`Summary`].
    ///
    /// The mean latency and the throughput are computed against `target_count`, the number of
    /// requests the run was asked to issue. The `observed_*` figures use the number of results
    /// actually received instead. Any figure whose divisor is zero is reported as `0.0`.
    pub fn finish(self, total: Duration, target_count: u64) -> Summary {
        let received = self.received();
        let sum = self.latency_sum_nanos as f64;
        let elapsed = total.as_secs_f64();

        let mean_latency_nanos = ratio(sum, target_count as f64);
        let requests_per_second = ratio(target_count as f64, elapsed);

        if received != target_count {
            debug!("Received {received} results for a target of {target_count}.");
        }

        Summary {
            total,
            target_count,
            received,
            fastest: self.fastest,
            slowest: self.slowest,
            mean_latency_nanos,
            observed_mean_latency_nanos: ratio(sum, received as f64),
            requests_per_second,
            observed_requests_per_second: ratio(received as f64, elapsed),
            speed_index: SpeedIndex::from_rps(requests_per_second),
            status_codes: self.status_codes,
        }
    }
}

impl Extend<RequestResult> for Accumulator {
    fn extend<I: IntoIterator<Item = RequestResult>>(&mut self, iter: I) {
        for result in iter {
            self.push(result);
        }
    }
}

impl FromIterator<RequestResult> for Accumulator {
    fn from_iter<I: IntoIterator<Item = RequestResult>>(iter: I) -> Self {
        let mut acc = Self::new();
        acc.extend(iter);
        acc
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    let value = numerator / denominator;
    // Zero elapsed time or a zero count; the report shows 0 instead of NaN/inf.
    if value.is_finite() {
        value
    } else {
        debug!("Non-finite ratio {numerator}/{denominator}, reporting 0.");
        0.
    }
}
