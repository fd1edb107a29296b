//! # Supervisor runtime parameters.
//!
//! [`SupervisorConfig`] is the subset of the file configuration the
//! supervisor loop needs. Build it with
//! [`Config::supervisor_config`](crate::Config::supervisor_config) or by hand
//! (tests, demos).

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Parameters for the supervisor loop.
///
/// ## Field semantics
/// - `publish_interval`: pacing sleep between steady-state iterations
/// - `backoff`: delay progression between failed cycles (never reset)
/// - `cleaning_interval`: minimum time between fan cleanings
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    pub publish_interval: Duration,
    pub backoff: BackoffPolicy,
    pub cleaning_interval: Duration,
    pub bus_capacity: usize,
}

impl Default for SupervisorConfig {
    /// Defaults:
    /// - `publish_interval = 10s`
    /// - `backoff = BackoffPolicy::default()` (5s, x2, capped at 300s)
    /// - `cleaning_interval = 24h`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
            cleaning_interval: Duration::from_secs(24 * 60 * 60),
            bus_capacity: 1024,
        }
    }
}
