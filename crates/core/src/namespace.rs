//! Dot-delimited hierarchical names.
//!
//! A namespace such as `user.created` is a child of `user`, which is a child of
//! the root (the empty namespace). Normalization splits on `.` and drops empty
//! segments, so `..user.created.` and `user.created` are the same namespace.
//! No other characters are special: `user.*` is a two-segment namespace whose
//! second segment happens to be `*`.

use core::convert::Infallible;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Segment separator.
pub const SEPARATOR: char = '.';

/// A normalized namespace path.
///
/// Compared by value: two namespaces are equal when their segments are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    /// The root namespace; every event lies beneath it.
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalize `raw` into a namespace. Never fails.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Depth below the root.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// The enclosing namespace, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// The ancestor made of the first `depth` segments (clamped to `len()`).
    pub fn prefix(&self, depth: usize) -> Self {
        Self {
            segments: self.segments[..depth.min(self.segments.len())].to_vec(),
        }
    }

    /// Extend this namespace by one or more segments (`child` is normalized too).
    pub fn child(&self, child: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(Self::parse(child).segments);
        Self { segments }
    }

    /// True when `self` is `other` or one of its ancestors.
    ///
    /// This is the matching rule: a listener registered at `self` fires for an
    /// event emitted at `other`.
    pub fn is_ancestor_of(&self, other: &Namespace) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

impl core::fmt::Display for Namespace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Namespace {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Namespace {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Namespace {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&String> for Namespace {
    fn from(value: &String) -> Self {
        Self::parse(value)
    }
}

impl From<&Namespace> for Namespace {
    fn from(value: &Namespace) -> Self {
        value.clone()
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.to_string()
    }
}
