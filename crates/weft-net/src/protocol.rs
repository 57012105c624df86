//! Message payloads and the setup/control protocol.
//!
//! All traffic between ranks travels as tagged [`Envelope`]s. Signal
//! data during the run uses per-transfer tags; setup records, the run
//! broadcast, and probe return use the two reserved tags below. Each
//! setup record carries an explicit `i32` flag so the stream framing
//! matches the wire contract (`flag, payload, …, STOP`).

use weft_core::{BaseSignal, ProbeKey, Rank, SignalKey, Tag};

/// Reserved tag for the setup stream and the run broadcast.
pub const SETUP_TAG: Tag = Tag(-1);

/// Reserved tag for probe-data return.
pub const PROBE_TAG: Tag = Tag(-2);

/// Reserved tag for barrier tokens.
pub const BARRIER_TAG: Tag = Tag(-3);

/// Flag announcing a base-signal record.
pub const ADD_SIGNAL: i32 = 1;
/// Flag announcing an operator record.
pub const ADD_OP: i32 = 2;
/// Flag announcing a probe record.
pub const ADD_PROBE: i32 = 3;
/// Flag terminating a setup stream.
pub const STOP: i32 = 4;

/// One record of a chunk's setup stream.
///
/// Record order within a stream is the operator insertion order of the
/// receiving chunk.
#[derive(Clone, Debug, PartialEq)]
pub enum SetupRecord {
    /// Register a base signal.
    AddSignal {
        /// Key the chunk will register the signal under.
        key: SignalKey,
        /// Diagnostic label.
        label: String,
        /// Initial contents, dense row-major.
        data: BaseSignal,
    },
    /// Append an operator, serialized as a factory line.
    AddOp {
        /// The `ClassName; arg; …` line.
        line: String,
    },
    /// Register a probe.
    AddProbe {
        /// Key the probe's harvested data is returned under.
        key: ProbeKey,
        /// Serialized view the probe samples.
        view: String,
        /// Sample period in steps.
        period: u64,
    },
    /// End of stream.
    Stop,
}

impl SetupRecord {
    /// The wire flag identifying this record kind.
    pub fn flag(&self) -> i32 {
        match self {
            Self::AddSignal { .. } => ADD_SIGNAL,
            Self::AddOp { .. } => ADD_OP,
            Self::AddProbe { .. } => ADD_PROBE,
            Self::Stop => STOP,
        }
    }
}

/// Payload of one message between ranks.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Signal contents for one tagged transfer.
    Data(Vec<f64>),
    /// Chunk-construction stream (master → worker, setup tag).
    Setup(SetupRecord),
    /// Start-of-run broadcast (master → worker, setup tag).
    StartRun {
        /// Number of steps every chunk will run.
        steps: u64,
    },
    /// Harvested probe data (worker → master, probe tag).
    ProbeData {
        /// Probe key the frames belong to.
        key: ProbeKey,
        /// Snapshots in capture order.
        frames: Vec<BaseSignal>,
    },
    /// Barrier token.
    Barrier,
    /// Fatal failure notification; the whole group aborts.
    Abort {
        /// Rendered failure from the aborting rank.
        reason: String,
    },
}

/// A routed message: source rank, tag, payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Rank that sent the message.
    pub src: Rank,
    /// Tag the receiver matches on.
    pub tag: Tag,
    /// The message body.
    pub payload: Payload,
}
