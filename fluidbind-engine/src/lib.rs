//! fluidbind engine: synthesizer context over FluidSynth.
//!
//! Crate layout:
//! - [`backend`] : `Backend` / `SynthEngine` traits, the seam to the native engine
//! - [`fluid`]   : FluidSynth backend, C API loaded at runtime with `libloading`
//! - [`synth`]   : `Synth<B>` context object, lifecycle state machine, marshaling
//! - `testing`   : ramp backend for other crates' tests (feature `testing`)
//!
//! Every event/program call is a direct pass-through; the engine's status code
//! comes back unchanged. The binding only adds lifecycle checks, argument
//! marshaling, and frame-count validation.

pub mod backend;
pub mod fluid;
pub mod synth;
#[cfg(feature = "testing")]
pub mod testing;

pub use backend::{Backend, SynthEngine};
pub use fluid::{FluidApi, FluidSynth, FluidSynthEngine};
pub use synth::Synth;

// Re-export the shared types so downstream crates need only one dependency.
pub use fluidbind_core::layout;
pub use fluidbind_core::{
    Error, Result, SampleLayout, State, Status, SynthConfig, BINDING_API_VERSION, SUCCESS,
};
