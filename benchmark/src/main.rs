use metrics_exporter_prometheus::PrometheusBuilder;
use pummel::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const REQUESTS: u64 = 2_000;
const WORKERS: u64 = 50;
const BODY_LEN: usize = 8 * 1024;
const BYTES_PER_SECOND: u32 = 4 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pummel=debug")),
        )
        .init();

    PrometheusBuilder::new()
        .with_http_listener("0.0.0.0:8002".parse::<SocketAddr>()?)
        .install()?;

    // One bucket shared by every body: a global bandwidth cap.
    let limiter = ByteRateLimiter::new(
        LimiterConfig::per_second(NonZeroU32::new(BYTES_PER_SECOND).unwrap())
            .burst(NonZeroU32::new(64 * 1024).unwrap()),
    );

    let (tx, mut rx) = mpsc::channel(1_024);
    let start = Instant::now();

    for worker in 0..WORKERS {
        let tx = tx.clone();
        let limiter = limiter.clone();
        tokio::spawn(async move {
            let mut rng = SmallRng::seed_from_u64(worker);
            for _ in (worker..REQUESTS).step_by(WORKERS as usize) {
                let result = simulated_request(&mut rng, &limiter).await;
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let summary = ResultAggregator::new(REQUESTS).aggregate(&mut rx, start).await;
    info!(
        "Throttled {} of body in {}",
        REQUESTS * BODY_LEN as u64,
        humantime::format_duration(summary.total)
    );
    summary.print(&ReportConfig::default())?;
    Ok(())
}

/// Stand-in for an HTTP call: some server latency, then a rate-limited body download.
async fn simulated_request(rng: &mut SmallRng, limiter: &ByteRateLimiter) -> RequestResult {
    let begin = Instant::now();
    tokio::time::sleep(Duration::from_micros(rng.gen_range(500..20_000))).await;

    let status = match rng.gen_range(0..100) {
        0 => return RequestResult::transport_failure(begin.elapsed()),
        1..=4 => 503,
        _ => 200,
    };

    let body = vec![0u8; BODY_LEN];
    let mut reader = RateLimitedReader::new(&body[..], limiter.clone());
    let mut sink = Vec::with_capacity(BODY_LEN);
    if reader.read_to_end(&mut sink).await.is_err() {
        return RequestResult::transport_failure(begin.elapsed());
    }

    RequestResult::new(status, begin.elapsed())
}
