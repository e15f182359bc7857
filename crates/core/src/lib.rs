//! `nsbus-core` — foundation building blocks.
//!
//! This crate contains **pure** primitives (no emitter state): namespaces,
//! listener handles, the error model and configuration.

pub mod config;
pub mod error;
pub mod id;
pub mod namespace;

pub use config::EmitterConfig;
pub use error::{BusError, BusResult};
pub use id::ListenerId;
pub use namespace::Namespace;
