/// Status code recorded for requests that failed before a response arrived.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// Requests per second above which a run is rated [`SpeedIndex::Excellent`](crate::SpeedIndex).
pub const EXCELLENT_RPS: f64 = 500.;

/// Requests per second above which a run is rated [`SpeedIndex::Good`](crate::SpeedIndex).
pub const GOOD_RPS: f64 = 100.;

/// Requests per second above which a run is rated [`SpeedIndex::Mediocre`](crate::SpeedIndex).
pub const MEDIOCRE_RPS: f64 = 50.;

pub(crate) const NANOS_PER_SEC: f64 = 1e9;
