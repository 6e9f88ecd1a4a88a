//! Runtime pieces of the `sprinkle-server` daemon.
//!
//! - [`config`] - CLI/environment settings and their validation.
//! - [`sweeper`] - periodic archival sweep driven by a Tokio interval.
//! - [`telemetry`] - `tracing` subscriber setup.

pub mod config;
pub mod sweeper;
pub mod telemetry;
