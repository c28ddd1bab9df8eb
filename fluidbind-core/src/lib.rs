//! fluidbind core: shared types for the FluidSynth binding layer.
//!
//! Modules
//! - [`error`]  : binding error type (`thiserror`) and `Result` alias
//! - [`status`] : engine status codes passed back to callers unchanged
//! - [`state`]  : synthesizer lifecycle state machine
//! - [`config`] : `SynthConfig` (TOML + environment overrides)
//! - [`layout`] : 16-bit stereo PCM layout, frame validation, byte conversion
//!
//! Design
//! - Nothing here talks to the native library; the engine crate does that.
//! - Engine status codes and binding errors stay separate: the former are
//!   values, the latter are `Err`.

pub mod config;
pub mod error;
pub mod layout;
pub mod state;
pub mod status;

pub use config::SynthConfig;
pub use error::{Error, Result};
pub use layout::{SampleLayout, Strides};
pub use state::State;
pub use status::Status;

/// Interface revision of the binding itself (not of FluidSynth).
///
/// Revision 1 only had `start()`, which did the work of `init()` implicitly.
/// Revision 2 splits them: call `init()`, then optionally `start()`.
pub const BINDING_API_VERSION: i32 = 2;

/// Success sentinel returned by the flat lifecycle calls.
pub const SUCCESS: i32 = 1;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::config::SynthConfig;
    pub use crate::error::{Error, Result};
    pub use crate::layout::{
        check_frame_count, samples_to_bytes, SampleLayout, Strides, BYTES_PER_FRAME, CHANNELS,
    };
    pub use crate::state::State;
    pub use crate::status::{Status, FLUID_FAILED, FLUID_OK};
    pub use crate::{BINDING_API_VERSION, SUCCESS};
}
