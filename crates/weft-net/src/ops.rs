//! Transport operators.
//!
//! `Send` and `Recv` are non-blocking posts executed in operator-list
//! order; only `Wait` blocks. Their position in the list is the user's
//! contract: placing a recv's wait after the operators that do not need
//! the data defers the block until it is strictly necessary, and
//! placing a send's wait just before the next step's send overlaps
//! compute with communication. `Barrier` is appended implicitly by
//! workers so all chunks advance in lockstep.

use weft_core::{Operator, Rank, SignalView, StepContext, StepError, Tag, WaitOutcome};

// ── SendOp ─────────────────────────────────────────────────────────

/// Post the current contents of a view to a peer rank.
pub struct SendOp {
    view: SignalView,
    dst: Rank,
    tag: Tag,
}

impl SendOp {
    /// Create a send of `view` to `dst` under `tag`.
    pub fn new(view: SignalView, dst: Rank, tag: Tag) -> Self {
        Self { view, dst, tag }
    }

    /// The transfer tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl Operator for SendOp {
    fn name(&self) -> &str {
        "Send"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        // Snapshot at post time: later operators may overwrite the view
        // before the matching wait runs.
        let payload = ctx.store().read(&self.view).into_vec();
        ctx.link()?.post_send(self.dst, self.tag, payload)
    }
}

// ── RecvOp ─────────────────────────────────────────────────────────

/// Post a receive from a peer rank into a view.
///
/// The payload lands in the view when the matching [`WaitOp`] runs;
/// every operator after that wait in the list sees the received values.
pub struct RecvOp {
    view: SignalView,
    src: Rank,
    tag: Tag,
}

impl RecvOp {
    /// Create a receive into `view` from `src` under `tag`.
    pub fn new(view: SignalView, src: Rank, tag: Tag) -> Self {
        Self { view, src, tag }
    }

    /// The transfer tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl Operator for RecvOp {
    fn name(&self) -> &str {
        "Recv"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        ctx.link()?.post_recv(self.src, self.tag, self.view)
    }
}

// ── WaitOp ─────────────────────────────────────────────────────────

/// Block until the transfer pending under this tag completes.
pub struct WaitOp {
    tag: Tag,
}

impl WaitOp {
    /// Create a wait for `tag`.
    pub fn new(tag: Tag) -> Self {
        Self { tag }
    }

    /// The transfer tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl Operator for WaitOp {
    fn name(&self) -> &str {
        "Wait"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let outcome = ctx.link()?.wait(self.tag)?;
        if let WaitOutcome::Received { target, payload } = outcome {
            ctx.store().write_flat(&target, &payload);
        }
        Ok(())
    }
}

// ── BarrierOp ──────────────────────────────────────────────────────

/// Block until every rank in the group reaches its barrier.
pub struct BarrierOp;

impl BarrierOp {
    /// Create a barrier operator.
    pub fn new() -> Self {
        Self
    }
}

impl Default for BarrierOp {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for BarrierOp {
    fn name(&self) -> &str {
        "Barrier"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        ctx.link()?.barrier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::Fabric;
    use weft_core::{BaseSignal, SignalKey, SignalStore, StepId};

    #[test]
    fn send_then_wait_delivers_into_target_view() {
        let mut eps = Fabric::new(2);
        let mut ep1 = eps.pop().unwrap();
        let mut ep0 = eps.pop().unwrap();

        let mut store0 = SignalStore::new();
        store0
            .register(SignalKey(1), "x", BaseSignal::column(&[3.0, 4.0]))
            .unwrap();
        let x = store0.full_view(SignalKey(1)).unwrap();

        let mut store1 = SignalStore::new();
        store1
            .register(SignalKey(2), "y", BaseSignal::column(&[0.0, 0.0]))
            .unwrap();
        let y = store1.full_view(SignalKey(2)).unwrap();

        let tag = Tag(42);
        let mut send = SendOp::new(x, Rank(1), tag);
        let mut send_wait = WaitOp::new(tag);
        let mut recv = RecvOp::new(y, Rank(0), tag);
        let mut recv_wait = WaitOp::new(tag);

        {
            let mut ctx = StepContext::new(&mut store0, Some(&mut ep0), 0.0, StepId(0));
            send.step(&mut ctx).unwrap();
            send_wait.step(&mut ctx).unwrap();
        }
        {
            let mut ctx = StepContext::new(&mut store1, Some(&mut ep1), 0.0, StepId(0));
            recv.step(&mut ctx).unwrap();
            recv_wait.step(&mut ctx).unwrap();
        }

        assert_eq!(store1.read(&y).as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn send_snapshot_taken_at_post_time() {
        let mut eps = Fabric::new(2);
        let mut ep1 = eps.pop().unwrap();
        let mut ep0 = eps.pop().unwrap();

        let mut store0 = SignalStore::new();
        store0
            .register(SignalKey(1), "x", BaseSignal::column(&[1.0]))
            .unwrap();
        let x = store0.full_view(SignalKey(1)).unwrap();

        let mut store1 = SignalStore::new();
        store1
            .register(SignalKey(2), "y", BaseSignal::column(&[0.0]))
            .unwrap();
        let y = store1.full_view(SignalKey(2)).unwrap();

        let tag = Tag(1);
        {
            let mut ctx = StepContext::new(&mut store0, Some(&mut ep0), 0.0, StepId(0));
            SendOp::new(x, Rank(1), tag).step(&mut ctx).unwrap();
            // Overwrite after the post; the payload must be unaffected.
            ctx.store().set(&x, 0, 0, 99.0);
            WaitOp::new(tag).step(&mut ctx).unwrap();
        }
        {
            let mut ctx = StepContext::new(&mut store1, Some(&mut ep1), 0.0, StepId(0));
            RecvOp::new(y, Rank(0), tag).step(&mut ctx).unwrap();
            WaitOp::new(tag).step(&mut ctx).unwrap();
        }
        assert_eq!(store1.get(&y, 0, 0), 1.0);
    }

    #[test]
    fn transport_ops_without_endpoint_fail() {
        let mut store = SignalStore::new();
        store
            .register(SignalKey(1), "x", BaseSignal::column(&[0.0]))
            .unwrap();
        let x = store.full_view(SignalKey(1)).unwrap();

        let mut ctx = StepContext::new(&mut store, None, 0.0, StepId(0));
        assert!(matches!(
            SendOp::new(x, Rank(1), Tag(1)).step(&mut ctx),
            Err(StepError::Transport { .. })
        ));
        assert!(matches!(
            BarrierOp::new().step(&mut ctx),
            Err(StepError::Transport { .. })
        ));
    }
}
