//! Strongly-typed listener handles.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BusError;

/// Identifier handed out when a listener is registered.
///
/// Closures have no identity of their own, so the handle is the reliable way
/// to unsubscribe a specific registration later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ListenerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<ListenerId> for Uuid {
    fn from(value: ListenerId) -> Self {
        value.0
    }
}

impl FromStr for ListenerId {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| BusError::invalid_id(format!("ListenerId: {e}")))?;
        Ok(Self(uuid))
    }
}
