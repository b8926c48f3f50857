mod utils;
#[allow(unused)]
use utils::*;

use pummel::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Simulated worker pool: `workers` tasks share `total` requests, each "request" sleeps for a
/// random latency and reports a status code.
fn spawn_workers(
    workers: u64,
    total: u64,
    tx: mpsc::Sender<RequestResult>,
) -> Vec<tokio::task::JoinHandle<Vec<RequestResult>>> {
    (0..workers)
        .map(|worker| {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut rng = SmallRng::seed_from_u64(worker);
                let mut sent = vec![];
                for _ in (worker..total).step_by(workers as usize) {
                    let begin = Instant::now();
                    tokio::time::sleep(Duration::from_micros(rng.gen_range(100..3_000))).await;
                    let status = if rng.gen_bool(0.9) { 200 } else { 503 };
                    let result = RequestResult::new(status, begin.elapsed());
                    sent.push(result);
                    tx.send(result).await.unwrap();
                }
                sent
            })
        })
        .collect()
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn worker_pool_summary() {
    init();

    const TOTAL: u64 = 200;
    let (tx, mut rx) = mpsc::channel(16);
    let start = Instant::now();
    let handles = spawn_workers(8, TOTAL, tx);

    let summary = ResultAggregator::new(TOTAL).aggregate(&mut rx, start).await;

    let mut sent = vec![];
    for handle in handles {
        sent.extend(handle.await.unwrap());
    }

    assert_eq!(sent.len() as u64, TOTAL);
    assert_eq!(summary.received, TOTAL);
    assert_eq!(summary.status_codes.total(), TOTAL);
    assert_eq!(
        summary.status_codes.get(200) + summary.status_codes.get(503),
        TOTAL
    );

    let fastest = summary.fastest.unwrap();
    let slowest = summary.slowest.unwrap();
    assert!(sent
        .iter()
        .all(|r| fastest <= r.duration && r.duration <= slowest));

    let sum: u128 = sent.iter().map(|r| r.duration.as_nanos()).sum();
    assert_eq!(summary.mean_latency_nanos, sum as f64 / TOTAL as f64);
    assert!(summary.requests_per_second > 0.);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn interrupted_run_divides_by_target() {
    init();

    let (tx, mut rx) = mpsc::channel(16);
    let start = Instant::now();
    // Asked for 100 requests but only 40 ever complete.
    let handles = spawn_workers(4, 40, tx);

    let summary = ResultAggregator::new(100).aggregate(&mut rx, start).await;
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(summary.received, 40);
    assert_eq!(summary.target_count, 100);
    let expected = summary.observed_mean_latency_nanos * 40. / 100.;
    assert!((summary.mean_latency_nanos - expected).abs() < 1e-3);
}

#[tokio::test]
async fn report_is_written_in_order() {
    let (tx, mut rx) = mpsc::channel(8);
    for (code, millis) in [(200, 10), (200, 50), (500, 5)] {
        tx.send(RequestResult::new(code, Duration::from_millis(millis)))
            .await
            .unwrap();
    }
    drop(tx);

    let start = Instant::now();
    let summary = ResultAggregator::new(3)
        .aggregate_span(&mut rx, RunSpan::new(start, start + Duration::from_secs(1)))
        .await;

    let mut out = vec![];
    summary
        .write_report(&mut out, &ReportConfig::default())
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("  total:\t1 secs\n"));
    assert!(text.contains("  slowest:\t0.05 secs\n"));
    assert!(text.contains("  requests/sec:\t3\n"));
    assert!(text.contains("  speed index:\tpoor\n"));
    assert!(text.contains("  [200]\t2 responses\n"));
    assert!(text.contains("  [500]\t1 responses\n"));
    assert!(text.find("total:").unwrap() < text.find("[200]").unwrap());
}

#[tokio::test]
async fn summary_serializes_to_json() -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(RequestResult::new(200, Duration::from_millis(100)))?;
    tx.send(RequestResult::transport_failure(Duration::from_millis(300)))?;
    drop(tx);

    let start = Instant::now();
    let summary = ResultAggregator::new(2)
        .aggregate_span(&mut rx, RunSpan::new(start, start + Duration::from_secs(2)))
        .await;

    let json = serde_json::to_value(&summary)?;
    assert_eq!(json["total"], 2.0);
    assert_eq!(json["slowest"], 0.3);
    assert_eq!(json["requests_per_second"], 1.0);
    assert_eq!(json["status_codes"]["0"], 1);
    assert_eq!(json["status_codes"]["200"], 1);
    Ok(())
}
