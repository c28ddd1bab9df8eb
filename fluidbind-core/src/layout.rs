//! 16-bit stereo PCM layout helpers.
//!
//! FluidSynth's `fluid_synth_write_s16` writes the left and right channels
//! through two (pointer, offset, increment) triples. Pointing both at the same
//! buffer gives either interleaved or planar output:
//!
//! | layout        | left (off, incr) | right (off, incr) |
//! |---------------|------------------|-------------------|
//! | `Interleaved` | (0, 2)           | (1, 2)            |
//! | `Planar`      | (0, 1)           | (frames, 1)       |
//!
//! Offsets and increments count samples, not bytes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Output channels per frame.
pub const CHANNELS: usize = 2;
/// Bytes per 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;
/// Bytes per stereo frame.
pub const BYTES_PER_FRAME: usize = CHANNELS * BYTES_PER_SAMPLE;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleLayout {
    /// L R L R ...
    #[default]
    Interleaved,
    /// L L ... R R ...
    Planar,
}

/// Offsets/increments handed to the engine, in samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Strides {
    pub left_offset: i32,
    pub left_incr: i32,
    pub right_offset: i32,
    pub right_incr: i32,
}

impl SampleLayout {
    /// Strides for a buffer holding `frames` frames.
    ///
    /// `frames` must already be validated against `i32` range.
    pub fn strides(self, frames: i32) -> Strides {
        match self {
            SampleLayout::Interleaved => Strides {
                left_offset: 0,
                left_incr: 2,
                right_offset: 1,
                right_incr: 2,
            },
            SampleLayout::Planar => Strides {
                left_offset: 0,
                left_incr: 1,
                right_offset: frames,
                right_incr: 1,
            },
        }
    }

    /// Samples needed for `frames` frames.
    #[inline]
    pub fn samples(self, frames: usize) -> usize {
        frames * CHANNELS
    }
}

/// Validate a caller-supplied frame count against `0..=max`.
pub fn check_frame_count(requested: i64, max: usize) -> Result<usize> {
    match usize::try_from(requested) {
        Ok(n) if n <= max => Ok(n),
        _ => Err(Error::FrameCount { requested, max }),
    }
}

/// Frames that fit in a sample buffer of `len` samples.
#[inline]
pub fn frames_in(len: usize) -> usize {
    len / CHANNELS
}

/// Serialize samples as little-endian bytes (`BYTES_PER_SAMPLE` each).
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
