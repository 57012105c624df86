//! In-process message fabric and transport operators for weft.
//!
//! Chunks run one per thread and are coupled exclusively through
//! point-to-point messages matched by integer tag. This crate provides
//! the fabric (endpoints over crossbeam channels), the transport
//! operators (`Send`/`Recv`/`Wait`/`Barrier`) that live inside a
//! chunk's operator list, and the setup/control protocol records the
//! simulator streams to its workers.

#![forbid(unsafe_code)]

pub mod fabric;
pub mod ops;
pub mod protocol;

pub use fabric::{Endpoint, Fabric};
pub use ops::{BarrierOp, RecvOp, SendOp, WaitOp};
pub use protocol::{
    Envelope, Payload, SetupRecord, ADD_OP, ADD_PROBE, ADD_SIGNAL, BARRIER_TAG, PROBE_TAG,
    SETUP_TAG, STOP,
};
