//! weft: a lockstep simulation core for spiking-network models
//! partitioned across communicating chunks.
//!
//! This is the facade crate re-exporting the public API of the weft
//! sub-crates. Most users only need the [`prelude`].
//!
//! # Quick start
//!
//! ```rust
//! use weft::prelude::*;
//! use weft::ops::{CopySignal, Reset};
//!
//! // One chunk, two signals, two operators, one probe.
//! let mut chunk = Chunk::new("demo", 0.001).unwrap();
//! chunk
//!     .add_base_signal(SignalKey(1), "a", BaseSignal::column(&[1.0, 2.0, 3.0]))
//!     .unwrap();
//! chunk
//!     .add_base_signal(SignalKey(2), "b", BaseSignal::column(&[0.0, 0.0, 0.0]))
//!     .unwrap();
//!
//! let a = chunk.view("1:(3,1):(1,1):0").unwrap();
//! let b = chunk.view("2:(3,1):(1,1):0").unwrap();
//! chunk.add_op(Box::new(Reset::new(b, 5.0)));
//! chunk.add_op(Box::new(CopySignal::new(a, b).unwrap()));
//! chunk.add_probe_str(ProbeKey(1), "1:(3,1):(1,1):0", 1).unwrap();
//!
//! chunk.run_n_steps(1).unwrap();
//! let frames = chunk.harvest_probe(ProbeKey(1)).unwrap();
//! assert_eq!(frames[0].as_slice(), &[5.0, 5.0, 5.0]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `weft-core` | Signals, views, IDs, errors, the `Operator` trait |
//! | [`ops`] | `weft-ops` | The numeric operator family and the string factory |
//! | [`net`] | `weft-net` | Message fabric, transport operators, setup protocol |
//! | [`engine`] | `weft-engine` | `Chunk`, `Probe`, and the `Simulator` step loop |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types: signals, views, IDs, errors, the operator trait
/// (`weft-core`).
pub use weft_core as types;

/// The numeric operator family and the operator factory (`weft-ops`).
pub use weft_ops as ops;

/// Message fabric, transport operators, and the setup protocol
/// (`weft-net`).
pub use weft_net as net;

/// Chunks, probes, and the distributed step loop (`weft-engine`).
pub use weft_engine as engine;

/// Common imports for typical weft usage.
///
/// ```rust
/// use weft::prelude::*;
/// ```
pub mod prelude {
    pub use weft_core::{
        BaseSignal, Operator, ProbeKey, Rank, SetupError, SignalKey, SignalStore, SignalView,
        StepContext, StepError, StepId, Tag,
    };
    pub use weft_engine::{Chunk, ChunkPlan, Probe, RunError, SimError, Simulator};
    pub use weft_net::{Endpoint, Fabric, SetupRecord};
    pub use weft_ops::build_operator;
}
