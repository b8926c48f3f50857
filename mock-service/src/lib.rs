use axum::{debug_handler, extract::Path, http::StatusCode, routing::get, Router};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    serve(listener).await
}

pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/status/:status/delay/ms/:delay_ms", get(status))
        .route("/bytes/:len", get(bytes))
        .layer(TraceLayer::new_for_http())
}

#[debug_handler]
pub async fn delay(Path(delay_ms): Path<u64>) {
    REQUESTS.fetch_add(1, Ordering::Relaxed);
    counter!("mock-service.requests").increment(1);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

#[debug_handler]
pub async fn status(Path((status, delay_ms)): Path<(u16, u64)>) -> StatusCode {
    REQUESTS.fetch_add(1, Ordering::Relaxed);
    counter!("mock-service.requests").increment(1);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    StatusCode::from_u16(status).unwrap_or_else(|_| {
        debug!("Invalid status {status} requested");
        StatusCode::BAD_REQUEST
    })
}

#[debug_handler]
pub async fn bytes(Path(len): Path<usize>) -> Vec<u8> {
    REQUESTS.fetch_add(1, Ordering::Relaxed);
    counter!("mock-service.requests").increment(1);
    histogram!("mock-service.body_bytes").record(len as f64);
    body(len)
}

/// Deterministic body served by `/bytes/:len`.
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/** Request Printer **/

static REQUESTS: AtomicU64 = AtomicU64::new(0);

pub async fn rps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let requests = REQUESTS.swap(0, Ordering::Relaxed);
        println!("{requests} RPS");
    }
}
