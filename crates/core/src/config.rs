//! Emitter configuration.

use serde::{Deserialize, Serialize};

use crate::error::{BusError, BusResult};

/// Environment variable toggling the pending-event queue.
pub const ENV_QUEUE_UNHANDLED: &str = "NSBUS_QUEUE_UNHANDLED";
/// Environment variable capping the pending-event queue.
pub const ENV_MAX_PENDING: &str = "NSBUS_MAX_PENDING";

/// Knobs for a freshly constructed emitter.
///
/// The default matches a bare emitter: queueing off, no cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Keep events that found no listener and replay them on registration.
    pub queue_unhandled_events: bool,

    /// Upper bound on queued events. When full, the oldest entry is dropped.
    pub max_pending: Option<usize>,
}

impl EmitterConfig {
    pub fn queueing(mut self, enable: bool) -> Self {
        self.queue_unhandled_events = enable;
        self
    }

    pub fn max_pending(mut self, cap: usize) -> Self {
        self.max_pending = Some(cap);
        self
    }

    /// Read configuration from `NSBUS_*` environment variables.
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> BusResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EmitterConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BusResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_QUEUE_UNHANDLED) {
            config.queue_unhandled_events = parse_flag(ENV_QUEUE_UNHANDLED, &raw)?;
        }

        if let Some(raw) = lookup(ENV_MAX_PENDING) {
            let cap = raw.trim().parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                BusError::config(format!("{ENV_MAX_PENDING}: expected a positive integer, got {raw:?}"))
            })?;
            config.max_pending = Some(cap);
        }

        tracing::debug!(
            queue_unhandled_events = config.queue_unhandled_events,
            max_pending = ?config.max_pending,
            "loaded emitter config"
        );
        Ok(config)
    }
}

fn parse_flag(key: &str, raw: &str) -> BusResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(BusError::config(format!("{key}: expected a boolean, got {raw:?}"))),
    }
}
