//! Chunk execution and the distributed step loop for weft.
//!
//! A [`Chunk`] is one process's slice of a partitioned network: its
//! base signals, its ordered operator list, its probes, and its
//! endpoint on the message fabric. The [`Simulator`] streams finished
//! chunk descriptions to worker threads, drives every chunk through the
//! same number of steps in lockstep, and gathers the probe data.

#![forbid(unsafe_code)]

pub mod chunk;
pub mod probe;
pub mod simulator;

pub use chunk::{Chunk, RunError};
pub use probe::Probe;
pub use simulator::{ChunkPlan, SimError, Simulator};
