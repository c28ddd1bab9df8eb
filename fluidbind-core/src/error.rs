//! Error types for the binding layer.
//!
//! These cover everything the binding itself can detect. Engine-level
//! failures (bad channel, unknown preset, unreadable soundfont) are returned
//! as [`Status`](crate::Status) values instead.

use thiserror::Error;

use crate::state::State;

/// Result type alias for fluidbind operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the binding boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation that needs a synthesizer was called before `init()` or after `stop()`.
    #[error("{op}: synthesizer is not initialized (state: {state})")]
    NotInitialized { op: &'static str, state: State },

    /// A lifecycle operation was called from a state that does not allow it.
    #[error("{op}: not allowed while {state}")]
    InvalidState { op: &'static str, state: State },

    /// Frame count outside `0..=max`.
    #[error("frame count {requested} out of range (0..={max})")]
    FrameCount { requested: i64, max: usize },

    /// An argument could not be marshaled to the native representation.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The FluidSynth shared library could not be opened.
    #[error("failed to load FluidSynth library ({tried}): {reason}")]
    Library { tried: String, reason: String },

    /// The library was opened but lacks a required entry point.
    #[error("FluidSynth library is missing symbol `{0}`")]
    MissingSymbol(&'static str),

    /// The engine returned a null handle.
    #[error("FluidSynth failed to allocate {0}")]
    Allocation(&'static str),

    /// The engine reported failure for a call that has no status return channel.
    #[error("{op} failed with engine status {code}")]
    Engine { op: &'static str, code: i32 },

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error (config files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by caller-supplied values rather than state or environment.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Error::FrameCount { .. } | Error::InvalidArgument { .. })
    }

    /// True for lifecycle ordering violations.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::NotInitialized { .. } | Error::InvalidState { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
