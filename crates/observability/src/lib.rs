//! Log output for the emitter crates.
//!
//! The emitter itself only records `tracing` events; nothing is printed until
//! a subscriber is installed. Call [`init`] to configure one from
//! `RUST_LOG` and `NSBUS_LOG_FORMAT`, or build an [`ObservabilityConfig`] and
//! pass it to [`init_with`] to pick the filter and [`LogFormat`] directly.

/// Install the subscriber described by the environment.
///
/// Only the first call in a process installs anything.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration and installation.
pub mod tracing;

pub use self::tracing::{LogFormat, ObservabilityConfig, init_with};
