//! The in-process message fabric.
//!
//! [`Fabric::new`] builds one [`Endpoint`] per rank over unbounded
//! crossbeam channels: a full sender mesh plus a single inbox per rank.
//! Sends are therefore non-blocking posts; receives pull from the inbox
//! and stash messages for other tags until their own wait comes around.
//! A disconnected peer surfaces as [`StepError::Transport`]; the whole
//! process group aborts, there is no partial-failure recovery.

use std::collections::VecDeque;

use crossbeam_channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;

use weft_core::{Rank, SignalView, StepError, Tag, TransportLink, WaitOutcome};

use crate::protocol::{Envelope, Payload};

/// Builder for a group of connected endpoints.
pub struct Fabric;

impl Fabric {
    /// Create `n_ranks` fully connected endpoints.
    ///
    /// # Panics
    ///
    /// Panics if `n_ranks` is zero.
    pub fn new(n_ranks: usize) -> Vec<Endpoint> {
        assert!(n_ranks > 0, "a fabric needs at least one rank");
        let mut senders = Vec::with_capacity(n_ranks);
        let mut inboxes = Vec::with_capacity(n_ranks);
        for _ in 0..n_ranks {
            let (tx, rx) = unbounded();
            senders.push(tx);
            inboxes.push(rx);
        }
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Endpoint {
                rank: Rank(rank as u32),
                senders: senders.clone(),
                inbox,
                stash: VecDeque::new(),
                pending: IndexMap::new(),
            })
            .collect()
    }
}

/// A transfer posted but not yet waited on.
#[derive(Debug)]
enum PendingTransfer {
    Send,
    Recv { src: Rank, target: SignalView },
}

/// One rank's endpoint on the fabric.
///
/// Owned by the chunk for the duration of a run. Single-threaded: all
/// methods take `&mut self`, matching the chunk's sequential step loop.
pub struct Endpoint {
    rank: Rank,
    senders: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    stash: VecDeque<Envelope>,
    pending: IndexMap<Tag, PendingTransfer>,
}

impl Endpoint {
    /// This endpoint's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks in the group.
    pub fn n_ranks(&self) -> usize {
        self.senders.len()
    }

    /// Send a payload to `dst` under `tag`. Non-blocking.
    pub fn send(&self, dst: Rank, tag: Tag, payload: Payload) -> Result<(), StepError> {
        let sender = self.senders.get(dst.0 as usize).ok_or_else(|| {
            StepError::Transport {
                reason: format!("rank {dst} does not exist in a {}-rank group", self.n_ranks()),
            }
        })?;
        sender
            .send(Envelope {
                src: self.rank,
                tag,
                payload,
            })
            .map_err(|_| StepError::Transport {
                reason: format!("rank {dst} has disconnected"),
            })
    }

    /// Block until a message from `src` with `tag` arrives, stashing
    /// any other traffic for later waits.
    pub fn recv_matching(&mut self, src: Rank, tag: Tag) -> Result<Payload, StepError> {
        if let Some(pos) = self
            .stash
            .iter()
            .position(|env| env.src == src && env.tag == tag)
        {
            // Stash order preserves arrival order per (src, tag).
            return Ok(self.stash.remove(pos).expect("position valid").payload);
        }
        loop {
            let env = self.inbox.recv().map_err(|_| StepError::Transport {
                reason: format!(
                    "rank {} waiting on rank {src} tag {tag}: all peers disconnected",
                    self.rank
                ),
            })?;
            // An abort from any rank ends the run; there is no
            // partial-failure recovery.
            if let Payload::Abort { reason } = &env.payload {
                return Err(StepError::Transport {
                    reason: format!("rank {} aborted: {reason}", env.src),
                });
            }
            if env.src == src && env.tag == tag {
                return Ok(env.payload);
            }
            self.stash.push_back(env);
        }
    }

    /// Best-effort notification to every peer that this rank is
    /// aborting the run. Send failures are ignored; the peer is
    /// already gone.
    pub fn abort(&self, reason: &str) {
        for peer in 0..self.n_ranks() {
            let peer = Rank(peer as u32);
            if peer != self.rank {
                let _ = self.send(
                    peer,
                    crate::protocol::BARRIER_TAG,
                    Payload::Abort {
                        reason: reason.to_string(),
                    },
                );
            }
        }
    }
}

/// Setup/control framing. Both ends of the protocol go through these
/// helpers so master and workers speak identical framing.
impl Endpoint {
    /// Send one setup record on the setup tag.
    pub fn send_setup(
        &self,
        dst: Rank,
        record: crate::protocol::SetupRecord,
    ) -> Result<(), StepError> {
        self.send(dst, crate::protocol::SETUP_TAG, Payload::Setup(record))
    }

    /// Receive one setup record from `src`.
    pub fn recv_setup(&mut self, src: Rank) -> Result<crate::protocol::SetupRecord, StepError> {
        match self.recv_matching(src, crate::protocol::SETUP_TAG)? {
            Payload::Setup(record) => Ok(record),
            other => Err(StepError::Transport {
                reason: format!("expected setup record, got {other:?}"),
            }),
        }
    }

    /// One leg of the start-of-run broadcast.
    pub fn send_start(&self, dst: Rank, steps: u64) -> Result<(), StepError> {
        self.send(dst, crate::protocol::SETUP_TAG, Payload::StartRun { steps })
    }

    /// Receive the start-of-run step count.
    pub fn recv_start(&mut self, src: Rank) -> Result<u64, StepError> {
        match self.recv_matching(src, crate::protocol::SETUP_TAG)? {
            Payload::StartRun { steps } => Ok(steps),
            other => Err(StepError::Transport {
                reason: format!("expected run broadcast, got {other:?}"),
            }),
        }
    }

    /// Return one probe's harvested frames on the probe tag.
    pub fn send_probe_data(
        &self,
        dst: Rank,
        key: weft_core::ProbeKey,
        frames: Vec<weft_core::BaseSignal>,
    ) -> Result<(), StepError> {
        self.send(dst, crate::protocol::PROBE_TAG, Payload::ProbeData { key, frames })
    }

    /// Receive one probe's harvested frames from `src`.
    pub fn recv_probe_data(
        &mut self,
        src: Rank,
    ) -> Result<(weft_core::ProbeKey, Vec<weft_core::BaseSignal>), StepError> {
        match self.recv_matching(src, crate::protocol::PROBE_TAG)? {
            Payload::ProbeData { key, frames } => Ok((key, frames)),
            other => Err(StepError::Transport {
                reason: format!("expected probe data, got {other:?}"),
            }),
        }
    }
}

impl TransportLink for Endpoint {
    fn post_send(&mut self, dst: Rank, tag: Tag, payload: Vec<f64>) -> Result<(), StepError> {
        if self.pending.contains_key(&tag) {
            return Err(StepError::Transport {
                reason: format!("tag {tag} already has a pending transfer"),
            });
        }
        // The channel buffers the payload; the transfer is complete as
        // far as this rank is concerned once the wait runs.
        self.send(dst, tag, Payload::Data(payload))?;
        self.pending.insert(tag, PendingTransfer::Send);
        Ok(())
    }

    fn post_recv(&mut self, src: Rank, tag: Tag, target: SignalView) -> Result<(), StepError> {
        if self.pending.contains_key(&tag) {
            return Err(StepError::Transport {
                reason: format!("tag {tag} already has a pending transfer"),
            });
        }
        self.pending.insert(tag, PendingTransfer::Recv { src, target });
        Ok(())
    }

    fn wait(&mut self, tag: Tag) -> Result<WaitOutcome, StepError> {
        match self.pending.shift_remove(&tag) {
            None => Err(StepError::Transport {
                reason: format!("no pending transfer for tag {tag}"),
            }),
            Some(PendingTransfer::Send) => Ok(WaitOutcome::SendComplete),
            Some(PendingTransfer::Recv { src, target }) => {
                match self.recv_matching(src, tag)? {
                    Payload::Data(payload) => Ok(WaitOutcome::Received { target, payload }),
                    other => Err(StepError::Transport {
                        reason: format!("expected data on tag {tag}, got {other:?}"),
                    }),
                }
            }
        }
    }

    fn barrier(&mut self) -> Result<(), StepError> {
        // All-to-all token exchange. Per-pair channels are FIFO, so a
        // rank's tokens for successive barriers cannot overtake each
        // other; matching by (src, tag) in arrival order is enough.
        for peer in 0..self.n_ranks() {
            let peer = Rank(peer as u32);
            if peer != self.rank {
                self.send(peer, crate::protocol::BARRIER_TAG, Payload::Barrier)?;
            }
        }
        for peer in 0..self.n_ranks() {
            let peer = Rank(peer as u32);
            if peer != self.rank {
                self.recv_matching(peer, crate::protocol::BARRIER_TAG)?;
            }
        }
        Ok(())
    }
}
