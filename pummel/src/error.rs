use std::io;
use thiserror::Error;

/// Failure while waiting on a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    #[error("Rate limiter wait was cancelled.")]
    Cancelled,

    #[error("Requested {requested} tokens but the limiter burst is {burst}.")]
    InsufficientCapacity { requested: u32, burst: u32 },
}

impl From<ThrottleError> for io::Error {
    fn from(err: ThrottleError) -> Self {
        match err {
            ThrottleError::Cancelled => io::Error::other(err),
            ThrottleError::InsufficientCapacity { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
        }
    }
}

/// Failure of a [`RateLimitedReader::read`](crate::RateLimitedReader::read) call.
///
/// Both variants carry the number of bytes which were already placed into the caller's buffer
/// before the failure. Those bytes are valid and are not read again.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Reading the source failed after {filled} bytes: {source}")]
    Source {
        filled: usize,
        #[source]
        source: io::Error,
    },

    #[error("Throttling stopped after {filled} bytes: {source}")]
    Throttled {
        filled: usize,
        #[source]
        source: ThrottleError,
    },
}

impl ReadError {
    pub fn filled(&self) -> usize {
        match self {
            Self::Source { filled, .. } | Self::Throttled { filled, .. } => *filled,
        }
    }

    /// True when the limiter wait was cancelled, as opposed to the source failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Throttled {
                source: ThrottleError::Cancelled,
                ..
            }
        )
    }
}

impl From<ReadError> for io::Error {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Source { source, .. } => source,
            ReadError::Throttled { source, .. } => source.into(),
        }
    }
}
