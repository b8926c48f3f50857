//! Turning a stream of request results into a [`Summary`].
use pummel_core::{Accumulator, AggregatorConfig, DrainPolicy, RequestResult, Summary};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Receiving end of the channel request workers report into.
pub trait ResultSource: Send {
    /// Wait for the next result. `None` once every producer is gone and the buffer is empty.
    fn recv(&mut self) -> impl Future<Output = Option<RequestResult>> + Send;

    /// Next result if one is already buffered.
    fn try_recv(&mut self) -> Option<RequestResult>;
}

impl ResultSource for mpsc::Receiver<RequestResult> {
    fn recv(&mut self) -> impl Future<Output = Option<RequestResult>> + Send {
        mpsc::Receiver::recv(self)
    }

    fn try_recv(&mut self) -> Option<RequestResult> {
        mpsc::Receiver::try_recv(self).ok()
    }
}

impl ResultSource for mpsc::UnboundedReceiver<RequestResult> {
    fn recv(&mut self) -> impl Future<Output = Option<RequestResult>> + Send {
        mpsc::UnboundedReceiver::recv(self)
    }

    fn try_recv(&mut self) -> Option<RequestResult> {
        mpsc::UnboundedReceiver::try_recv(self).ok()
    }
}

/// Wall-clock bounds of a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RunSpan {
    pub start: Instant,
    pub end: Instant,
}

impl RunSpan {
    pub fn new(start: Instant, end: Instant) -> Self {
        Self { start, end }
    }

    /// Span from `start` until now.
    pub fn since(start: Instant) -> Self {
        Self::new(start, Instant::now())
    }

    /// Zero if `end` is before `start`.
    pub fn elapsed(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }
}

/// Drains request results and produces the run's [`Summary`].
///
/// Each call to [`ResultAggregator::aggregate`] starts from empty totals, so one aggregator can
/// be reused across runs without results bleeding from one into the next.
///
/// # Example
/// ```no_run
/// use pummel::prelude::*;
/// use std::time::{Duration, Instant};
/// use tokio::sync::mpsc;
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, mut rx) = mpsc::channel(1_024);
///     let start = Instant::now();
///
///     tokio::spawn(async move {
///         let _ = tx.send(RequestResult::new(200, Duration::from_millis(12))).await;
///     });
///
///     let summary = ResultAggregator::new(1)
///         .aggregate(&mut rx, start)
///         .await;
///     summary.print(&ReportConfig::default()).unwrap();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    config: AggregatorConfig,
}

impl ResultAggregator {
    pub fn new(target_count: u64) -> Self {
        Self::with_config(AggregatorConfig::new(target_count))
    }

    pub fn with_config(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn drain(mut self, drain: DrainPolicy) -> Self {
        self.config.drain = drain;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Drain `results` and summarize the run which started at `start`.
    ///
    /// The run is considered finished once draining completes; see [`Self::aggregate_span`] to
    /// supply the end explicitly.
    pub async fn aggregate<S: ResultSource>(&self, results: &mut S, start: Instant) -> Summary {
        let acc = self.drain_results(results).await;
        self.finish(acc, RunSpan::since(start))
    }

    /// Drain `results` and summarize a run spanning `span`.
    pub async fn aggregate_span<S: ResultSource>(&self, results: &mut S, span: RunSpan) -> Summary {
        let acc = self.drain_results(results).await;
        self.finish(acc, span)
    }

    #[instrument(name = "aggregate", skip_all, fields(target = self.config.target_count, drain = ?self.config.drain))]
    async fn drain_results<S: ResultSource>(&self, results: &mut S) -> Accumulator {
        let mut acc = Accumulator::new();
        let started = Instant::now();

        match self.config.drain {
            DrainPolicy::UntilClosed => {
                while let Some(result) = results.recv().await {
                    record(&mut acc, result);
                }
            }
            DrainPolicy::FirstGap => {
                while let Some(result) = results.try_recv() {
                    record(&mut acc, result);
                }
            }
        }

        debug!(
            "Drained {} results in {}",
            acc.received(),
            humantime::format_duration(started.elapsed())
        );
        acc
    }

    fn finish(&self, acc: Accumulator, span: RunSpan) -> Summary {
        let summary = acc.finish(span.elapsed(), self.config.target_count);
        info!(
            "Run of {} requests finished in {}: {:.2} requests/sec ({})",
            summary.target_count,
            humantime::format_duration(summary.total),
            summary.requests_per_second,
            summary.speed_index
        );
        summary
    }
}

fn record(acc: &mut Accumulator, result: RequestResult) {
    trace!("{result:?}");

    #[cfg(feature = "metrics")]
    metrics::counter!("pummel.results", "status" => result.status_code.to_string()).increment(1);

    acc.push(result);
}
