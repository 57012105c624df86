//! The transport seam between operators and the message fabric.
//!
//! Transport operators run inside the chunk's step loop but must not
//! depend on a concrete fabric, so the chunk hands them this trait
//! instead. Send and recv are non-blocking posts recorded against their
//! tag; only `wait` blocks.

use crate::error::StepError;
use crate::id::{Rank, Tag};
use crate::signal::SignalView;

/// Outcome of a completed transfer.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitOutcome {
    /// A posted send has been handed to the fabric.
    SendComplete,
    /// A posted receive has arrived; the payload is to be written
    /// through `target`.
    Received {
        /// View registered when the receive was posted.
        target: SignalView,
        /// Row-major payload, one element per view element.
        payload: Vec<f64>,
    },
}

/// One chunk's endpoint on the message fabric.
///
/// At most one transfer may be pending per tag; the chunk's operator
/// ordering guarantees the matching wait runs before the tag is reused.
pub trait TransportLink {
    /// Post a non-blocking send of `payload` to `dst`. Returns
    /// immediately.
    fn post_send(&mut self, dst: Rank, tag: Tag, payload: Vec<f64>) -> Result<(), StepError>;

    /// Post a non-blocking receive from `src` into `target`. Returns
    /// immediately; the payload is surfaced by the matching `wait`.
    fn post_recv(&mut self, src: Rank, tag: Tag, target: SignalView) -> Result<(), StepError>;

    /// Block until the transfer pending under `tag` completes.
    fn wait(&mut self, tag: Tag) -> Result<WaitOutcome, StepError>;

    /// Block until every rank in the simulation group has arrived.
    fn barrier(&mut self) -> Result<(), StepError>;
}
