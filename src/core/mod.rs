//! Runtime core: the supervisor state machine and what it is built from.
//!
//! The public API from this module is [`Supervisor`], its builder and
//! [`SupervisorConfig`].
//!
//! Internal modules:
//! - [`supervisor`]: bring-up, teardown, backoff and stop handling;
//! - [`session`]: one connected episode (announce, poll/maintain/publish loop);
//! - [`maintenance`]: fan-cleaning schedule;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`builder`]: wiring of bus and subscribers.

mod builder;
mod config;
mod maintenance;
mod session;
mod shutdown;
mod supervisor;

#[cfg(test)]
pub(crate) mod testkit;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use maintenance::MaintenanceSchedule;
pub use supervisor::Supervisor;
