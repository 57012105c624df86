//! Strongly-typed identifiers used throughout the weft workspace.

use std::fmt;

/// Identifies a base signal within a chunk.
///
/// Keys are assigned by the collaborator that builds the network
/// description. They are opaque 64-bit values (historically the host
/// addresses of builder-side objects), unique within one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalKey(pub i64);

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SignalKey {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Identifies a probe within a chunk.
///
/// Same key space as [`SignalKey`] but kept as a distinct type: probe
/// keys name sampling points, not storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeKey(pub i64);

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProbeKey {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Matches one cross-chunk transfer: a send/recv pair and its wait.
///
/// Tags are unique within a process pair; the transport routes and the
/// wait operators block on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub i32);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Tag {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

/// Index of a chunk's process within the simulation group.
///
/// Rank 0 is the master; workers are 1..n.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing step counter.
///
/// Incremented each time a chunk advances simulated time by `dt`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
