//! Error model shared by the workspace.

use thiserror::Error;

/// Result type used across the bus crates.
pub type BusResult<T> = Result<T, BusError>;

/// Bus-level error.
///
/// Engine operations themselves are total: registering, emitting and removing
/// never fail on an owned emitter. Errors only arise at the edges (parsing
/// handles, reading configuration, or a poisoned lock around a shared emitter).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A listener identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A configuration value was malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A shared emitter's lock was poisoned by a panicking listener.
    #[error("emitter lock poisoned")]
    Poisoned,
}

impl BusError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
