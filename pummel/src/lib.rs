#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod aggregator;
pub mod error;
pub mod limiter;
pub mod reader;

pub use aggregator::{ResultAggregator, ResultSource, RunSpan};
pub use error::{ReadError, ThrottleError};
pub use limiter::{ByteLimiter, ByteRateLimiter};
pub use reader::RateLimitedReader;

pub use pummel_core::*;

pub mod prelude {
    pub use crate::aggregator::{ResultAggregator, ResultSource, RunSpan};
    pub use crate::error::{ReadError, ThrottleError};
    pub use crate::limiter::{ByteLimiter, ByteRateLimiter};
    pub use crate::reader::RateLimitedReader;

    pub use pummel_core::{
        AggregatorConfig, DrainPolicy, LatencyUnit, LimiterConfig, ReportConfig, RequestResult,
        SpeedIndex, StatusCodeHistogram, Summary, TRANSPORT_FAILURE_STATUS,
    };
}
