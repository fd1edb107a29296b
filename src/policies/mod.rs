//! Retry policies.
//!
//! This module groups the knobs that control **how long** the supervisor
//! waits between bring-up attempts.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized reconnects
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=5s, factor=2.0, max=300s, jitter=None.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
