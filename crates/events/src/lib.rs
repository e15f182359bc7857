//! Namespaced in-process events.
//!
//! Listeners subscribe to a dot-delimited namespace (`user`, `user.created`)
//! and fire for that namespace and everything below it, most specific first.

pub mod emitter;
pub mod facade;
pub mod listener;
pub mod queue;
pub mod shared;
pub mod trie;

pub use emitter::{Delivery, Detach, Dispatch, Emitter, JsonArgs};
pub use facade::NamespaceEmitter;
pub use listener::{Callback, Flow, Listener};
pub use queue::{PendingEvent, PendingQueue};
pub use shared::SharedEmitter;

pub use nsbus_core::{BusError, BusResult, EmitterConfig, ListenerId, Namespace};
