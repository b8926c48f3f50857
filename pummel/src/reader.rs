//! Byte-rate limited reads of a response body.
use crate::error::{ReadError, ThrottleError};
use crate::limiter::ByteLimiter;
use pin_project::pin_project;
use std::future::{poll_fn, Future};
use std::io;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Instant;
use tokio::io::{AsyncRead, ReadBuf};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

type WaitFuture = Pin<Box<dyn Future<Output = Result<(), ThrottleError>> + Send>>;

/// Wraps a byte source so that bytes are pulled from it no faster than a [`ByteLimiter`] allows.
///
/// The source is read in chunks of at most the limiter's burst size, and every chunk is paid for
/// with exactly as many tokens as bytes it contains before it is handed to the caller. A single
/// wait therefore never asks for more than the bucket can hold.
///
/// Two ways of reading are provided:
///
/// * [`RateLimitedReader::read`] fills the whole buffer (or stops at end of stream) and reports
///   failures together with the number of bytes already delivered.
/// * The [`AsyncRead`] impl delivers one chunk per call, for use with `tokio::io` utilities. If a
///   wait is cancelled, the bytes of that chunk are still delivered and the error is returned by
///   the following call.
#[pin_project]
pub struct RateLimitedReader<R, L> {
    #[pin]
    inner: R,
    limiter: L,
    chunk: Vec<u8>,
    state: State,
}

enum State {
    Idle,
    Throttling { wait: WaitFuture, started: Instant },
    Draining {
        pos: usize,
        error: Option<ThrottleError>,
    },
}

pub(crate) enum ChunkError {
    Source(io::Error),
    Throttle(ThrottleError),
}

impl From<ChunkError> for io::Error {
    fn from(err: ChunkError) -> Self {
        match err {
            ChunkError::Source(err) => err,
            ChunkError::Throttle(err) => err.into(),
        }
    }
}

impl<R, L> RateLimitedReader<R, L> {
    pub fn new(inner: R, limiter: L) -> Self {
        Self {
            inner,
            limiter,
            chunk: Vec::new(),
            state: State::Idle,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn limiter(&self) -> &L {
        &self.limiter
    }

    /// Unwrap the source. Bytes which were read from it but not yet handed out are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R, L> RateLimitedReader<R, L>
where
    R: AsyncRead,
    L: ByteLimiter + Clone + 'static,
{
    fn poll_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<(), ChunkError>> {
        let mut this = self.project();

        loop {
            match this.state {
                State::Idle => {
                    if buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }

                    let burst = this.limiter.burst().get() as usize;
                    let size = buf.remaining().min(burst);
                    this.chunk.resize(size, 0);

                    let mut chunk_buf = ReadBuf::new(&mut this.chunk[..]);
                    ready!(this.inner.as_mut().poll_read(cx, &mut chunk_buf))
                        .map_err(ChunkError::Source)?;
                    let read = chunk_buf.filled().len();
                    this.chunk.truncate(read);

                    // Always Some unless the source hit end of stream.
                    let Some(tokens) = NonZeroU32::new(read as u32) else {
                        trace!("Source exhausted.");
                        return Poll::Ready(Ok(()));
                    };

                    #[cfg(feature = "metrics")]
                    metrics::counter!("pummel.reader.bytes").increment(read as u64);

                    let limiter = this.limiter.clone();
                    *this.state = State::Throttling {
                        wait: Box::pin(async move { limiter.wait_n(tokens).await }),
                        started: Instant::now(),
                    };
                }
                State::Throttling { wait, started } => {
                    let res = ready!(wait.as_mut().poll(cx));
                    let waited = started.elapsed();
                    trace!(
                        "Waited {} for {} bytes",
                        humantime::format_duration(waited),
                        this.chunk.len()
                    );

                    #[cfg(feature = "metrics")]
                    metrics::histogram!("pummel.reader.wait").record(waited.as_nanos() as f64);

                    *this.state = State::Draining {
                        pos: 0,
                        error: res.err(),
                    };
                }
                State::Draining { pos, error } => {
                    if *pos < this.chunk.len() {
                        if buf.remaining() == 0 {
                            return Poll::Ready(Ok(()));
                        }

                        let n = buf.remaining().min(this.chunk.len() - *pos);
                        buf.put_slice(&this.chunk[*pos..*pos + n]);
                        *pos += n;

                        if *pos == this.chunk.len() && error.is_none() {
                            *this.state = State::Idle;
                        }
                        return Poll::Ready(Ok(()));
                    }

                    let error = error.take();
                    *this.state = State::Idle;
                    if let Some(err) = error {
                        return Poll::Ready(Err(ChunkError::Throttle(err)));
                    }
                }
            }
        }
    }

    /// Throttle error left behind by a chunk which was fully delivered.
    fn take_pending_error(&mut self) -> Option<ThrottleError> {
        match &mut self.state {
            State::Draining { pos, error } if *pos == self.chunk.len() => {
                let error = error.take();
                self.state = State::Idle;
                error
            }
            _ => None,
        }
    }
}

impl<R, L> RateLimitedReader<R, L>
where
    R: AsyncRead + Unpin,
    L: ByteLimiter + Clone + 'static,
{
    /// Fill `buf` from the source at the limiter's pace.
    ///
    /// Returns the number of bytes written, which is `buf.len()` unless the source reached end of
    /// stream first. A source error or an interrupted wait ends the call immediately; the error
    /// reports how many bytes were already written to `buf`.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        let mut buf = ReadBuf::new(buf);

        while buf.remaining() > 0 {
            let before = buf.filled().len();
            let res = poll_fn(|cx| Pin::new(&mut *self).poll_chunk(cx, &mut buf)).await;

            match res {
                Ok(()) if buf.filled().len() == before => break,
                Ok(()) => {}
                Err(ChunkError::Source(source)) => {
                    return Err(ReadError::Source {
                        filled: buf.filled().len(),
                        source,
                    })
                }
                Err(ChunkError::Throttle(source)) => {
                    return Err(ReadError::Throttled {
                        filled: buf.filled().len(),
                        source,
                    })
                }
            }
        }

        let filled = buf.filled().len();
        match self.take_pending_error() {
            Some(source) => Err(ReadError::Throttled { filled, source }),
            None => Ok(filled),
        }
    }
}

impl<R, L> AsyncRead for RateLimitedReader<R, L>
where
    R: AsyncRead,
    L: ByteLimiter + Clone + 'static,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.poll_chunk(cx, buf).map_err(io::Error::from)
    }
}
