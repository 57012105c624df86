//! The numeric operator family of the weft simulation engine.
//!
//! Each operator implements the one-step state update of one model
//! element: copies and gathers, accumulating products, synapse filters,
//! neuron models, learning rules, stochastic sources, and the host
//! callback. All shape and parameter validation happens at
//! construction; the step bodies are pure index arithmetic over the
//! chunk's signal store.
//!
//! [`build_operator`] reconstructs any of these from the serialized
//! `ClassName; arg; …` form used by the setup protocol.

#![forbid(unsafe_code)]

mod checks;

pub mod callback;
pub mod copies;
pub mod factory;
pub mod learning;
pub mod neurons;
pub mod noise;
pub mod products;
pub mod synapses;

pub use callback::{Callback, CallbackArgs, CallbackFn};
pub use copies::{CopySignal, Reset, SlicedCopy};
pub use factory::build_operator;
pub use learning::{Bcm, Oja, Voja};
pub use neurons::{
    AdaptiveLif, AdaptiveLifRate, Izhikevich, Lif, LifRate, RectifiedLinear, Sigmoid,
};
pub use noise::{WhiteNoise, WhiteSignal};
pub use products::{DotInc, ElementwiseInc};
pub use synapses::{NoDenSynapse, SimpleSynapse, Synapse, TriangleSynapse};
