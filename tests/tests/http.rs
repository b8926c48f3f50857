mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use futures::TryStreamExt;
    use pummel::prelude::*;
    use reqwest::Client;
    use std::io;
    use std::net::SocketAddr;
    use std::num::NonZeroU32;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc;
    use tokio_util::io::StreamReader;

    async fn request(client: &Client, url: &str) -> RequestResult {
        let begin = Instant::now();
        match client.get(url).send().await {
            Ok(res) => RequestResult::new(res.status().as_u16(), begin.elapsed()),
            Err(_) => RequestResult::transport_failure(begin.elapsed()),
        }
    }

    #[tokio::test]
    async fn status_code_distribution() {
        init();
        let addr = spawn_mock_service().await;
        let client = Client::new();

        const TOTAL: u64 = 40;
        let (tx, mut rx) = mpsc::channel(8);
        let start = Instant::now();

        for worker in 0..4u64 {
            let tx = tx.clone();
            let client = client.clone();
            tokio::spawn(async move {
                for i in (worker..TOTAL).step_by(4) {
                    let status = if i % 5 == 0 { 404 } else { 200 };
                    let url = format!("http://{addr}/status/{status}/delay/ms/5");
                    let _ = tx.send(request(&client, &url).await).await;
                }
            });
        }
        drop(tx);

        let summary = ResultAggregator::new(TOTAL).aggregate(&mut rx, start).await;

        assert_eq!(summary.received, TOTAL);
        assert_eq!(summary.status_codes.get(200), 32);
        assert_eq!(summary.status_codes.get(404), 8);
        assert!(summary.fastest.unwrap() >= Duration::from_millis(5));
        summary.print(&ReportConfig::default()).unwrap();
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_failure() {
        init();
        // Bind and drop to get a port nobody listens on.
        let addr: SocketAddr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let result = request(&Client::new(), &format!("http://{addr}/delay/ms/0")).await;
        assert_eq!(result.status_code, TRANSPORT_FAILURE_STATUS);
    }

    #[tokio::test]
    #[ntest::timeout(20_000)]
    async fn throttled_body_download() {
        init();
        let addr = spawn_mock_service().await;
        const LEN: usize = 30_000;

        let res = Client::new()
            .get(format!("http://{addr}/bytes/{LEN}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);

        let body = Box::pin(res.bytes_stream().map_err(io::Error::other));
        let limiter = ByteRateLimiter::new(
            LimiterConfig::per_second(NonZeroU32::new(20_000).unwrap())
                .burst(NonZeroU32::new(5_000).unwrap()),
        );
        let mut reader = RateLimitedReader::new(StreamReader::new(body), limiter);

        let start = Instant::now();
        let mut buf = vec![0u8; LEN];
        assert_eq!(reader.read(&mut buf).await.unwrap(), LEN);

        assert_eq!(buf, mock_service::body(LEN));
        // 25000 bytes past the first burst at 20000 bytes/s.
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
