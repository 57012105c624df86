//! One process's slice of the network: signals, operators, probes, and
//! the transport endpoint.

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use weft_core::{
    BaseSignal, Operator, ProbeKey, Rank, SetupError, SignalKey, SignalStore, SignalView, StepContext,
    StepError, StepId, Tag, TransportLink,
};
use weft_net::{Endpoint, RecvOp, SendOp, WaitOp};

use crate::probe::Probe;

// ── RunError ───────────────────────────────────────────────────────

/// Error returned from [`Chunk::run_n_steps`].
#[derive(Debug)]
pub enum RunError {
    /// Pre-run validation failed (transport wiring, probe init).
    Setup(SetupError),
    /// An operator failed mid-step.
    Step {
        /// Class name of the failing operator.
        operator: String,
        /// The underlying failure.
        source: StepError,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "{e}"),
            Self::Step { operator, source } => {
                write!(f, "operator '{operator}' failed: {source}")
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Setup(e) => Some(e),
            Self::Step { source, .. } => Some(source),
        }
    }
}

impl From<SetupError> for RunError {
    fn from(e: SetupError) -> Self {
        Self::Setup(e)
    }
}

// ── Chunk ──────────────────────────────────────────────────────────

/// The portion of a partitioned network simulated by one process.
///
/// Holds the base signals, the ordered operator list, the probes, and
/// (for multi-chunk runs) the transport endpoint. All registration is
/// single-threaded setup-time activity; once [`run_n_steps`] starts,
/// the operator list is immutable and executes in insertion order.
///
/// [`run_n_steps`]: Chunk::run_n_steps
pub struct Chunk {
    label: String,
    dt: f64,
    time: f64,
    step: u64,
    store: SignalStore,
    ops: Vec<Box<dyn Operator>>,
    probes: IndexMap<ProbeKey, Probe>,
    endpoint: Option<Endpoint>,
    // Side tables for setup-time wiring: (operator index, tag).
    sends: Vec<(usize, Tag)>,
    recvs: Vec<(usize, Tag)>,
    waits: Vec<(usize, Tag)>,
    wired: bool,
}

impl Chunk {
    /// Create an empty chunk with the given label and time step.
    pub fn new(label: impl Into<String>, dt: f64) -> Result<Self, SetupError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SetupError::InvalidParameter {
                operator: "Chunk",
                detail: format!("dt must be finite and positive, got {dt}"),
            });
        }
        Ok(Self {
            label: label.into(),
            dt,
            time: 0.0,
            step: 0,
            store: SignalStore::new(),
            ops: Vec::new(),
            probes: IndexMap::new(),
            endpoint: None,
            sends: Vec::new(),
            recvs: Vec::new(),
            waits: Vec::new(),
            wired: false,
        })
    }

    // ── Signals ────────────────────────────────────────────────────

    /// Register a base signal. All data an operator touches must be
    /// registered before the operator is added.
    pub fn add_base_signal(
        &mut self,
        key: SignalKey,
        label: impl Into<String>,
        data: BaseSignal,
    ) -> Result<(), SetupError> {
        self.store.register(key, label, data)
    }

    /// The chunk's signal store.
    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    /// Mutable signal store access, for seeding state between runs.
    pub fn store_mut(&mut self) -> &mut SignalStore {
        &mut self.store
    }

    /// Construct a view from its serialized form.
    pub fn view(&self, signal_string: &str) -> Result<SignalView, SetupError> {
        self.store.parse_view(signal_string)
    }

    // ── Operators ──────────────────────────────────────────────────

    /// Append a pre-built operator. Execution order is insertion order.
    pub fn add_op(&mut self, op: Box<dyn Operator>) {
        self.ops.push(op);
    }

    /// Append an operator from its serialized form.
    ///
    /// Transport lines are handled here rather than by the factory so
    /// the wiring tables stay current:
    /// `Send; <dst>; <tag>; <view>`, `Recv; <src>; <tag>; <view>`,
    /// `Wait; <tag>`, `Barrier`.
    pub fn add_op_str(&mut self, line: &str) -> Result<(), SetupError> {
        let mut parts = line.split(';').map(str::trim);
        let class = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();
        let arity = |n: usize| -> Result<(), SetupError> {
            if args.len() != n {
                return Err(SetupError::Parse {
                    input: line.to_string(),
                    reason: format!("{class} takes {n} arguments, got {}", args.len()),
                });
            }
            Ok(())
        };
        let int = |s: &str| -> Result<i64, SetupError> {
            s.parse::<i64>().map_err(|_| SetupError::Parse {
                input: line.to_string(),
                reason: format!("'{s}' is not an integer"),
            })
        };

        match class {
            "Send" => {
                arity(3)?;
                let dst = Rank(int(args[0])? as u32);
                let tag = Tag(int(args[1])? as i32);
                let view = self.store.parse_view(args[2])?;
                self.add_send(view, dst, tag);
            }
            "Recv" => {
                arity(3)?;
                let src = Rank(int(args[0])? as u32);
                let tag = Tag(int(args[1])? as i32);
                let view = self.store.parse_view(args[2])?;
                self.add_recv(view, src, tag);
            }
            "Wait" => {
                arity(1)?;
                self.add_wait(Tag(int(args[0])? as i32));
            }
            "Barrier" => {
                arity(0)?;
                self.add_op(Box::new(weft_net::BarrierOp::new()));
            }
            _ => {
                let op = weft_ops::build_operator(line, &self.store)?;
                self.add_op(op);
            }
        }
        Ok(())
    }

    /// Append a send operator and record it for wiring.
    pub fn add_send(&mut self, view: SignalView, dst: Rank, tag: Tag) {
        self.sends.push((self.ops.len(), tag));
        self.ops.push(Box::new(SendOp::new(view, dst, tag)));
        self.wired = false;
    }

    /// Append a recv operator and record it for wiring.
    pub fn add_recv(&mut self, view: SignalView, src: Rank, tag: Tag) {
        self.recvs.push((self.ops.len(), tag));
        self.ops.push(Box::new(RecvOp::new(view, src, tag)));
        self.wired = false;
    }

    /// Append a wait operator and record it for wiring.
    pub fn add_wait(&mut self, tag: Tag) {
        self.waits.push((self.ops.len(), tag));
        self.ops.push(Box::new(WaitOp::new(tag)));
        self.wired = false;
    }

    /// Number of operators in the list.
    pub fn n_ops(&self) -> usize {
        self.ops.len()
    }

    // ── Probes ─────────────────────────────────────────────────────

    /// Register a probe over a serialized view.
    pub fn add_probe_str(
        &mut self,
        key: ProbeKey,
        signal_string: &str,
        period: u64,
    ) -> Result<(), SetupError> {
        let target = self.store.parse_view(signal_string)?;
        self.add_probe(key, Probe::new(target, period)?)
    }

    /// Register a pre-built probe.
    pub fn add_probe(&mut self, key: ProbeKey, probe: Probe) -> Result<(), SetupError> {
        if self.probes.contains_key(&key) {
            return Err(SetupError::DuplicateProbe { key });
        }
        self.probes.insert(key, probe);
        Ok(())
    }

    /// Number of registered probes.
    pub fn n_probes(&self) -> usize {
        self.probes.len()
    }

    /// Probe keys in registration order.
    pub fn probe_keys(&self) -> Vec<ProbeKey> {
        self.probes.keys().copied().collect()
    }

    /// Drain the snapshots of the probe registered under `key`.
    pub fn harvest_probe(&mut self, key: ProbeKey) -> Result<Vec<BaseSignal>, SetupError> {
        self.probes
            .get_mut(&key)
            .map(Probe::harvest)
            .ok_or(SetupError::UnknownProbe { key })
    }

    // ── Transport ──────────────────────────────────────────────────

    /// Attach the chunk's endpoint on the message fabric.
    pub fn attach_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = Some(endpoint);
    }

    /// The attached endpoint, if any.
    pub fn endpoint_mut(&mut self) -> Option<&mut Endpoint> {
        self.endpoint.as_mut()
    }

    /// Validate the send/recv ↔ wait pairing.
    ///
    /// Every send and recv must have exactly one wait with the same tag
    /// somewhere in this chunk's list, earlier or later; the check runs
    /// once, before the first step of a run.
    fn wire(&mut self) -> Result<(), SetupError> {
        if self.wired {
            return Ok(());
        }
        let mut wait_by_tag: IndexMap<Tag, usize> = IndexMap::new();
        for (idx, tag) in &self.waits {
            if wait_by_tag.insert(*tag, *idx).is_some() {
                return Err(SetupError::DuplicateTag { tag: *tag });
            }
        }
        for (_, tag) in self.sends.iter().chain(self.recvs.iter()) {
            if !wait_by_tag.contains_key(tag) {
                return Err(SetupError::UnmatchedTag { tag: *tag });
            }
        }
        self.wired = true;
        Ok(())
    }

    // ── Execution ──────────────────────────────────────────────────

    /// Run `n` steps.
    ///
    /// Each step: every operator in insertion order, then every probe's
    /// sampler, then the step counter and simulated time advance.
    pub fn run_n_steps(&mut self, n: u64) -> Result<(), RunError> {
        self.wire()?;
        let start = self.step;
        for (key, probe) in self.probes.iter_mut() {
            probe.init_for_run(*key, start, n)?;
        }
        debug!(label = %self.label, steps = n, "chunk starting run");

        for _ in 0..n {
            for op in self.ops.iter_mut() {
                let link = self
                    .endpoint
                    .as_mut()
                    .map(|ep| ep as &mut dyn TransportLink);
                let mut ctx = StepContext::new(&mut self.store, link, self.time, StepId(self.step));
                op.step(&mut ctx).map_err(|source| RunError::Step {
                    operator: op.name().to_string(),
                    source,
                })?;
            }
            for (_, probe) in self.probes.iter_mut() {
                probe.sample(self.step, &self.store);
            }
            self.step += 1;
            // Recomputed from the step count so time stays an exact
            // integer multiple of dt.
            self.time = self.step as f64 * self.dt;
        }
        Ok(())
    }

    /// Rewind time and reseed every operator for a fresh run.
    ///
    /// Operator `i` receives `seed + i`, so each stochastic operator's
    /// sequence is independent of unrelated operators. Unharvested
    /// probe snapshots are discarded.
    pub fn reset(&mut self, seed: u64) {
        self.step = 0;
        self.time = 0.0;
        for (i, op) in self.ops.iter_mut().enumerate() {
            op.reset(seed.wrapping_add(i as u64));
        }
        for (_, probe) in self.probes.iter_mut() {
            probe.harvest();
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Diagnostic label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Time step in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.step
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("label", &self.label)
            .field("dt", &self.dt)
            .field("step", &self.step)
            .field("signals", &self.store.len())
            .field("ops", &self.ops.len())
            .field("probes", &self.probes.len())
            .finish()
    }
}
