//! The [`Operator`] trait and the per-step execution context.
//!
//! Operators are the unit of simulation work: each one applies the
//! one-step update of a single model element, reading and writing signal
//! views bound at construction. A chunk stores them as
//! `Vec<Box<dyn Operator>>` and calls them in insertion order every
//! step; that order is the only coordination between them.

use crate::error::StepError;
use crate::id::StepId;
use crate::link::TransportLink;
use crate::signal::SignalStore;

/// A polymorphic one-step state update bound to fixed views and
/// parameters.
///
/// # Contract
///
/// - All shape and parameter validation happens at construction;
///   constructors return `Result<Self, SetupError>`. The numeric family
///   never fails inside `step()`; only the transport operators and the
///   host callback can.
/// - Operators may be stateful (filter rings, RNGs, sample counters);
///   `step()` takes `&mut self` and `reset()` rewinds that state for a
///   fresh run.
/// - Operators have no identity beyond their position in the chunk's
///   list; the engine never reorders them.
pub trait Operator: Send {
    /// Class name, used in diagnostics and by the operator factory.
    fn name(&self) -> &str;

    /// Apply the one-step update.
    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError>;

    /// Rewind internal state for a fresh run.
    ///
    /// Stochastic operators reseed their generator from `seed`; filters
    /// clear their rings; playback operators rewind their counters. The
    /// default does nothing.
    fn reset(&mut self, _seed: u64) {}
}

/// Execution context handed to each operator's `step()`.
///
/// Bundles mutable access to the chunk's signal store, the optional
/// transport endpoint (present only when the chunk takes part in a
/// multi-chunk run), and the current simulated time and step index.
pub struct StepContext<'a> {
    store: &'a mut SignalStore,
    link: Option<&'a mut dyn TransportLink>,
    time: f64,
    step: StepId,
}

impl<'a> StepContext<'a> {
    /// Construct a context. Called by the chunk's step loop; tests build
    /// one directly around a store.
    pub fn new(
        store: &'a mut SignalStore,
        link: Option<&'a mut dyn TransportLink>,
        time: f64,
        step: StepId,
    ) -> Self {
        Self {
            store,
            link,
            time,
            step,
        }
    }

    /// The chunk's signal store.
    pub fn store(&mut self) -> &mut SignalStore {
        self.store
    }

    /// Read-only access to the signal store.
    pub fn store_ref(&self) -> &SignalStore {
        self.store
    }

    /// The transport endpoint, or a [`StepError::Transport`] if the
    /// chunk has none attached.
    pub fn link(&mut self) -> Result<&mut dyn TransportLink, StepError> {
        match self.link.as_deref_mut() {
            Some(link) => Ok(link),
            None => Err(StepError::Transport {
                reason: "no transport endpoint attached to this chunk".to_string(),
            }),
        }
    }

    /// Current simulated time (always exactly `step * dt`).
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Current step index.
    pub fn step(&self) -> StepId {
        self.step
    }
}
