//! The distributed step loop: master/worker setup streaming, lockstep
//! execution, and probe gathering.
//!
//! One rank per chunk. Rank 0 is the master: it streams every worker
//! its setup records, builds and runs its own chunk in the calling
//! thread, broadcasts the step count, and assembles the harvested probe
//! data. Workers build their chunks from the stream, append the
//! implicit end-of-step barrier, run, and return their probe data over
//! the fabric. Any failing rank notifies the rest of the group and the
//! whole run aborts; there is no partial-failure recovery.

use std::fmt;
use std::thread;

use indexmap::IndexMap;
use tracing::{debug, info};

use weft_core::{BaseSignal, ProbeKey, Rank, SetupError, StepError, TransportLink};
use weft_net::{BarrierOp, Endpoint, Fabric, SetupRecord};

use crate::chunk::{Chunk, RunError};

// ── SimError ───────────────────────────────────────────────────────

/// Error returned from [`Simulator::run`].
#[derive(Debug)]
pub enum SimError {
    /// Simulator construction or master-side setup failed.
    Setup(SetupError),
    /// The master's own chunk failed.
    Master(RunError),
    /// A worker rank failed; the run was aborted.
    Worker {
        /// Rank of the failing worker.
        rank: Rank,
        /// Rendered failure.
        message: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "{e}"),
            Self::Master(e) => write!(f, "master chunk failed: {e}"),
            Self::Worker { rank, message } => {
                write!(f, "worker {rank} failed: {message}")
            }
        }
    }
}

impl std::error::Error for SimError {}

impl From<SetupError> for SimError {
    fn from(e: SetupError) -> Self {
        Self::Setup(e)
    }
}

fn transport(source: StepError) -> RunError {
    RunError::Step {
        operator: "Transport".to_string(),
        source,
    }
}

// ── ChunkPlan ──────────────────────────────────────────────────────

/// The finished description of one rank's chunk: its label and its
/// setup records in operator insertion order.
///
/// Produced by an external builder; the simulator only replays it.
#[derive(Clone, Debug)]
pub struct ChunkPlan {
    /// Diagnostic label for the chunk.
    pub label: String,
    /// Setup records, in insertion order. A trailing `Stop` is implied.
    pub records: Vec<SetupRecord>,
}

impl ChunkPlan {
    /// A plan with the given label and no records yet.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            records: Vec::new(),
        }
    }

    fn n_probes(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, SetupRecord::AddProbe { .. }))
            .count()
    }
}

/// Apply one setup record to a chunk under construction.
fn apply_record(chunk: &mut Chunk, record: SetupRecord) -> Result<(), SetupError> {
    match record {
        SetupRecord::AddSignal { key, label, data } => chunk.add_base_signal(key, label, data),
        SetupRecord::AddOp { line } => chunk.add_op_str(&line),
        SetupRecord::AddProbe { key, view, period } => chunk.add_probe_str(key, &view, period),
        SetupRecord::Stop => Ok(()),
    }
}

// ── Worker ─────────────────────────────────────────────────────────

/// Worker-side lifecycle: build from the setup stream, run, return
/// probe data. On failure, notifies the group before returning.
fn run_worker(endpoint: Endpoint, label: String, dt: f64) -> Result<(), RunError> {
    let rank = endpoint.rank();
    let mut chunk = match Chunk::new(label, dt) {
        Ok(chunk) => chunk,
        Err(e) => {
            endpoint.abort(&e.to_string());
            return Err(e.into());
        }
    };
    chunk.attach_endpoint(endpoint);

    let result = worker_drive(&mut chunk, rank);
    if let Err(e) = &result {
        if let Some(ep) = chunk.endpoint_mut() {
            ep.abort(&e.to_string());
        }
    }
    result
}

fn worker_drive(chunk: &mut Chunk, rank: Rank) -> Result<(), RunError> {
    let master = Rank(0);
    debug!(%rank, "worker receiving network");

    loop {
        let record = chunk
            .endpoint_mut()
            .expect("endpoint attached")
            .recv_setup(master)
            .map_err(transport)?;
        match record {
            SetupRecord::Stop => break,
            record => apply_record(chunk, record)?,
        }
    }
    debug!(%rank, ops = chunk.n_ops(), probes = chunk.n_probes(), "worker built chunk");

    // Implicit global barrier at the end of every step.
    chunk.add_op(Box::new(BarrierOp::new()));

    let steps = chunk
        .endpoint_mut()
        .expect("endpoint attached")
        .recv_start(master)
        .map_err(transport)?;
    info!(%rank, steps, "worker starting simulation");

    chunk.run_n_steps(steps)?;

    chunk
        .endpoint_mut()
        .expect("endpoint attached")
        .barrier()
        .map_err(transport)?;

    // Return probe data keyed by probe key, in registration order.
    for key in chunk.probe_keys() {
        let frames = chunk.harvest_probe(key)?;
        chunk
            .endpoint_mut()
            .expect("endpoint attached")
            .send_probe_data(master, key, frames)
            .map_err(transport)?;
    }

    chunk
        .endpoint_mut()
        .expect("endpoint attached")
        .barrier()
        .map_err(transport)?;
    debug!(%rank, "worker done");
    Ok(())
}

// ── Simulator ──────────────────────────────────────────────────────

/// Drives a partitioned simulation: one chunk per rank, coupled through
/// the message fabric, advancing in lockstep for a fixed number of
/// steps.
///
/// A single-plan simulator degenerates to a plain sequential run with
/// no worker threads.
pub struct Simulator {
    dt: f64,
    plans: Vec<ChunkPlan>,
}

impl Simulator {
    /// Create a simulator over per-rank chunk plans. Plan 0 is the
    /// master's own chunk.
    pub fn new(dt: f64, plans: Vec<ChunkPlan>) -> Result<Self, SetupError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SetupError::InvalidParameter {
                operator: "Simulator",
                detail: format!("dt must be finite and positive, got {dt}"),
            });
        }
        if plans.is_empty() {
            return Err(SetupError::InvalidParameter {
                operator: "Simulator",
                detail: "at least one chunk plan is required".to_string(),
            });
        }
        Ok(Self { dt, plans })
    }

    /// Number of ranks (chunks) in the simulation.
    pub fn n_ranks(&self) -> usize {
        self.plans.len()
    }

    /// Run `n_steps` on every chunk and gather the probe data.
    ///
    /// Returns the harvested snapshots keyed by probe key: the
    /// master's probes first, then each worker's in rank order.
    pub fn run(self, n_steps: u64) -> Result<IndexMap<ProbeKey, Vec<BaseSignal>>, SimError> {
        let n_ranks = self.plans.len();
        let mut endpoints = Fabric::new(n_ranks).into_iter();
        let master_ep = endpoints.next().expect("fabric has master endpoint");

        // Spawn workers first; the setup stream below feeds them.
        let mut handles = Vec::with_capacity(n_ranks - 1);
        for (rank, (plan, endpoint)) in self.plans.iter().skip(1).zip(endpoints).enumerate() {
            let rank = Rank(rank as u32 + 1);
            let label = plan.label.clone();
            let dt = self.dt;
            let handle = thread::Builder::new()
                .name(format!("weft-worker-{rank}"))
                .spawn(move || run_worker(endpoint, label, dt))
                .map_err(|e| {
                    SimError::Setup(SetupError::InvalidParameter {
                        operator: "Simulator",
                        detail: format!("failed to spawn worker thread: {e}"),
                    })
                })?;
            handles.push((rank, handle));
        }

        // Build the master's own chunk, attach its endpoint, and drive
        // the run. Errors notify the workers before the join below.
        let mut chunk = match Chunk::new(self.plans[0].label.clone(), self.dt) {
            Ok(chunk) => chunk,
            Err(e) => {
                master_ep.abort(&e.to_string());
                return Err(e.into());
            }
        };
        chunk.attach_endpoint(master_ep);

        let mut outcome = master_drive(&mut chunk, &self.plans, n_steps);
        if let Err(e) = &outcome {
            if let Some(ep) = chunk.endpoint_mut() {
                ep.abort(&e.to_string());
            }
        }

        // Drop the master endpoint so a worker blocked on a transfer
        // observes the disconnect rather than hanging, then surface the
        // first worker failure (it usually explains a master-side
        // transport error).
        drop(chunk);
        for (rank, handle) in handles {
            let failure = match handle.join() {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some("worker thread panicked".to_string()),
            };
            if let Some(message) = failure {
                outcome = Err(SimError::Worker { rank, message });
            }
        }
        outcome
    }
}

fn master_drive(
    chunk: &mut Chunk,
    plans: &[ChunkPlan],
    n_steps: u64,
) -> Result<IndexMap<ProbeKey, Vec<BaseSignal>>, SimError> {
    let master_err = |source: StepError| SimError::Master(transport(source));

    // Stream each worker its records, in insertion order.
    for (rank, plan) in plans.iter().enumerate().skip(1) {
        let dst = Rank(rank as u32);
        debug!(%dst, records = plan.records.len(), "master streaming setup");
        let ep = chunk.endpoint_mut().expect("endpoint attached");
        for record in &plan.records {
            ep.send_setup(dst, record.clone()).map_err(master_err)?;
        }
        ep.send_setup(dst, SetupRecord::Stop).map_err(master_err)?;
    }

    // The master's own chunk, with the same implicit trailing barrier.
    for record in plans[0].records.clone() {
        apply_record(chunk, record).map_err(SimError::Setup)?;
    }
    chunk.add_op(Box::new(BarrierOp::new()));

    // Broadcast the step count.
    {
        let ep = chunk.endpoint_mut().expect("endpoint attached");
        for rank in 1..plans.len() {
            ep.send_start(Rank(rank as u32), n_steps)
                .map_err(master_err)?;
        }
    }
    info!(ranks = plans.len(), steps = n_steps, "simulation starting");

    chunk.run_n_steps(n_steps).map_err(SimError::Master)?;

    chunk
        .endpoint_mut()
        .expect("endpoint attached")
        .barrier()
        .map_err(master_err)?;

    // Gather: the master's own probes, then each worker's.
    let mut results: IndexMap<ProbeKey, Vec<BaseSignal>> = IndexMap::new();
    for key in chunk.probe_keys() {
        let frames = chunk.harvest_probe(key).map_err(SimError::Setup)?;
        results.insert(key, frames);
    }
    for (rank, plan) in plans.iter().enumerate().skip(1) {
        let src = Rank(rank as u32);
        let ep = chunk.endpoint_mut().expect("endpoint attached");
        for _ in 0..plan.n_probes() {
            let (key, frames) = ep.recv_probe_data(src).map_err(|source| SimError::Worker {
                rank: src,
                message: source.to_string(),
            })?;
            results.insert(key, frames);
        }
    }

    chunk
        .endpoint_mut()
        .expect("endpoint attached")
        .barrier()
        .map_err(master_err)?;

    Ok(results)
}
