//! Token bucket limiters for byte-rate throttling.
use crate::error::ThrottleError;
use arc_swap::ArcSwap;
use governor::{DefaultDirectRateLimiter, InsufficientCapacity, Quota, RateLimiter};
use pummel_core::LimiterConfig;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// A token bucket measured in bytes.
///
/// Readers only ever query the burst size and wait for tokens; configuring the bucket is up to
/// whoever owns it.
pub trait ByteLimiter: Send + Sync {
    /// Bucket capacity. Readers never ask for more than this in a single wait.
    fn burst(&self) -> NonZeroU32;

    /// Wait until `n` tokens are available and consume them.
    ///
    /// Implementations may reject `n` above [`ByteLimiter::burst`] with
    /// [`ThrottleError::InsufficientCapacity`].
    fn wait_n(&self, n: NonZeroU32) -> impl Future<Output = Result<(), ThrottleError>> + Send;
}

impl<L: ByteLimiter> ByteLimiter for Arc<L> {
    fn burst(&self) -> NonZeroU32 {
        (**self).burst()
    }

    fn wait_n(&self, n: NonZeroU32) -> impl Future<Output = Result<(), ThrottleError>> + Send {
        (**self).wait_n(n)
    }
}

/// [`ByteLimiter`] backed by a `governor` rate limiter.
///
/// Clones share the same bucket, so handing one clone to every reader caps the combined rate of
/// all of them. Build a separate limiter per reader to cap each connection on its own.
#[derive(Clone)]
pub struct ByteRateLimiter {
    state: Arc<ArcSwap<LimiterState>>,
    cancel: Option<CancellationToken>,
}

struct LimiterState {
    limiter: DefaultDirectRateLimiter,
    config: LimiterConfig,
}

impl LimiterState {
    fn new(config: LimiterConfig) -> Self {
        Self {
            limiter: rate_limiter(config),
            config,
        }
    }
}

impl ByteRateLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            state: Arc::new(ArcSwap::new(Arc::new(LimiterState::new(config)))),
            cancel: None,
        }
    }

    /// Abort pending and future waits once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> LimiterConfig {
        self.state.load().config
    }

    /// Replace the bucket for every clone of this limiter.
    ///
    /// Waits already in progress finish against the previous bucket. The new bucket starts full.
    pub fn set_config(&self, config: LimiterConfig) {
        if config != self.config() {
            info!(
                "Byte rate limit set to {}/s with a burst of {}",
                config.bytes_per_second, config.burst
            );
            self.state.store(Arc::new(LimiterState::new(config)));
        }
    }
}

impl ByteLimiter for ByteRateLimiter {
    fn burst(&self) -> NonZeroU32 {
        self.config().burst
    }

    /// Requests above the burst of the current bucket are paid for in burst-sized pieces, so a
    /// chunk sized before [`ByteRateLimiter::set_config`] lowered the burst still goes through.
    fn wait_n(&self, n: NonZeroU32) -> impl Future<Output = Result<(), ThrottleError>> + Send {
        let state = self.state.clone();
        let cancel = self.cancel.clone();

        async move {
            let state = state.load_full();
            let burst = state.config.burst.get();
            if n.get() > burst {
                debug!("Waiting for {n} bytes in pieces of {burst}");
            }

            let mut remaining = n.get();
            while let Some(piece) = NonZeroU32::new(remaining.min(burst)) {
                until_ready(&state.limiter, piece, cancel.as_ref()).await?;
                remaining -= piece.get();
            }
            Ok(())
        }
    }
}

async fn until_ready(
    limiter: &DefaultDirectRateLimiter,
    n: NonZeroU32,
    cancel: Option<&CancellationToken>,
) -> Result<(), ThrottleError> {
    let wait = limiter.until_n_ready(n);
    let res = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ThrottleError::Cancelled),
                res = wait => res,
            }
        }
        None => wait.await,
    };

    res.map_err(|InsufficientCapacity(burst)| ThrottleError::InsufficientCapacity {
        requested: n.get(),
        burst,
    })
}

fn rate_limiter(config: LimiterConfig) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(config.bytes_per_second).allow_burst(config.burst))
}
