//! Error types for the weft simulation engine.
//!
//! Split by lifecycle: [`SetupError`] covers everything that can go wrong
//! while a chunk is being assembled (all fatal, surfaced to the builder),
//! [`StepError`] covers the two failure classes that can occur inside the
//! step loop (host-callback shape mismatches and transport failures).

use std::error::Error;
use std::fmt;

use crate::id::{ProbeKey, SignalKey, Tag};

/// Errors raised during chunk assembly, before the step loop starts.
///
/// All setup errors are fatal: the calling collaborator is expected to
/// abort the simulation rather than attempt recovery.
#[derive(Clone, Debug, PartialEq)]
pub enum SetupError {
    /// A base signal was registered under a key that already exists.
    DuplicateKey {
        /// The contested key.
        key: SignalKey,
    },
    /// A lookup or view construction referenced an unregistered key.
    UnknownSignal {
        /// The missing key.
        key: SignalKey,
    },
    /// A view's window does not lie within its base signal.
    ViewOutOfBounds {
        /// Key of the base signal the view targets.
        key: SignalKey,
        /// Description of the offending window.
        window: String,
        /// Total element count of the base signal.
        len: usize,
    },
    /// An operator was constructed with incompatible view shapes.
    ShapeMismatch {
        /// Which operator rejected the shapes.
        operator: &'static str,
        /// Description of the mismatch.
        detail: String,
    },
    /// An operator was constructed with an invalid scalar parameter.
    InvalidParameter {
        /// Which operator rejected the parameter.
        operator: &'static str,
        /// Description of the invalid value.
        detail: String,
    },
    /// A send or recv operator has no wait with the same tag in its chunk.
    UnmatchedTag {
        /// The unmatched tag.
        tag: Tag,
    },
    /// Two wait operators in one chunk carry the same tag.
    DuplicateTag {
        /// The contested tag.
        tag: Tag,
    },
    /// The operator factory was given an unrecognized class name.
    UnknownOperator {
        /// The unrecognized name.
        name: String,
    },
    /// A probe was initialized for a run while still holding snapshots.
    NotEmpty {
        /// Key of the probe that must be harvested first.
        key: ProbeKey,
    },
    /// A probe was registered under a key that already exists.
    DuplicateProbe {
        /// The contested key.
        key: ProbeKey,
    },
    /// A probe lookup referenced an unregistered key.
    UnknownProbe {
        /// The missing key.
        key: ProbeKey,
    },
    /// A serialized view, float list, or operator line failed to parse.
    Parse {
        /// The offending input, verbatim.
        input: String,
        /// What was expected instead.
        reason: String,
    },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey { key } => {
                write!(f, "base signal key {key} is already registered")
            }
            Self::UnknownSignal { key } => {
                write!(f, "no base signal registered under key {key}")
            }
            Self::ViewOutOfBounds { key, window, len } => {
                write!(
                    f,
                    "view {window} does not fit base signal {key} ({len} elements)"
                )
            }
            Self::ShapeMismatch { operator, detail } => {
                write!(f, "while creating {operator}: {detail}")
            }
            Self::InvalidParameter { operator, detail } => {
                write!(f, "while creating {operator}: {detail}")
            }
            Self::UnmatchedTag { tag } => {
                write!(f, "no wait operator with tag {tag}")
            }
            Self::DuplicateTag { tag } => {
                write!(f, "more than one wait operator with tag {tag}")
            }
            Self::UnknownOperator { name } => {
                write!(f, "unknown operator class '{name}'")
            }
            Self::NotEmpty { key } => {
                write!(
                    f,
                    "probe {key} still holds snapshots; harvest before re-initializing"
                )
            }
            Self::DuplicateProbe { key } => {
                write!(f, "probe key {key} is already registered")
            }
            Self::UnknownProbe { key } => {
                write!(f, "no probe registered under key {key}")
            }
            Self::Parse { input, reason } => {
                write!(f, "failed to parse '{input}': {reason}")
            }
        }
    }
}

impl Error for SetupError {}

/// Errors raised by an operator inside the step loop.
///
/// The numeric operator family never fails at step time; only the host
/// callback and the transport operators can.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A host callback returned a value whose shape does not match its
    /// output view.
    OutputShape {
        /// Number of elements the output view expects.
        expected: usize,
        /// Number of elements the callback returned.
        got: usize,
    },
    /// A message transfer failed. Aborts the whole process group; there
    /// is no partial-failure recovery.
    Transport {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputShape { expected, got } => {
                write!(
                    f,
                    "callback returned {got} elements, output view expects {expected}"
                )
            }
            Self::Transport { reason } => write!(f, "transport failure: {reason}"),
        }
    }
}

impl Error for StepError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_display_carries_offenders() {
        let err = SetupError::UnknownSignal {
            key: SignalKey(42),
        };
        assert!(format!("{err}").contains("42"));

        let err = SetupError::Parse {
            input: "7:(bad".to_string(),
            reason: "expected four ':'-separated parts".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("7:(bad"));
        assert!(msg.contains("four"));

        let err = SetupError::UnmatchedTag { tag: Tag(9) };
        assert!(format!("{err}").contains('9'));
    }

    #[test]
    fn step_error_display() {
        let err = StepError::OutputShape {
            expected: 3,
            got: 1,
        };
        let msg = format!("{err}");
        assert!(msg.contains('3') && msg.contains('1'));
    }
}
