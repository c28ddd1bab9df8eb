//! The seam between the binding and a synthesis engine.
//!
//! A [`Backend`] creates engines; a [`SynthEngine`] is one live instance
//! (settings + synthesizer, plus an audio driver once started). `Synth` is
//! generic over the backend so tests can swap in a recording engine without
//! trait objects.
//!
//! Integer returns are raw engine status codes. Engines release everything
//! they own on drop, audio driver first.

use std::ffi::CStr;

use fluidbind_core::{Result, Strides, SynthConfig};

pub trait SynthEngine: Send {
    /// Attach an audio output driver. A second call while running is a no-op.
    fn start_audio(&mut self) -> Result<()>;

    /// Detach the audio driver if one is attached.
    fn stop_audio(&mut self);

    fn sfload(&mut self, path: &CStr, reset_presets: bool) -> i32;
    fn program_select(&mut self, chan: i32, sfont_id: i32, bank: i32, preset: i32) -> i32;
    fn program_change(&mut self, chan: i32, program: i32) -> i32;
    fn bank_select(&mut self, chan: i32, bank: i32) -> i32;
    fn sfont_select(&mut self, chan: i32, sfont_id: i32) -> i32;
    fn program_reset(&mut self) -> i32;
    fn system_reset(&mut self) -> i32;

    fn noteon(&mut self, chan: i32, key: i32, vel: i32) -> i32;
    fn noteoff(&mut self, chan: i32, key: i32) -> i32;
    fn pitch_bend(&mut self, chan: i32, val: i32) -> i32;
    fn cc(&mut self, chan: i32, ctrl: i32, val: i32) -> i32;

    /// Render `frames` frames of 16-bit stereo into `out` using `strides`.
    ///
    /// `out` holds at least `frames * 2` samples.
    fn write_s16(&mut self, frames: i32, out: &mut [i16], strides: Strides) -> i32;
}

pub trait Backend {
    type Engine: SynthEngine;

    /// Short name for logs.
    fn name(&self) -> &str;

    /// Allocate settings and a synthesizer configured from `config`.
    fn create(&self, config: &SynthConfig) -> Result<Self::Engine>;

    /// Runtime version of the underlying engine, if known.
    fn engine_version(&self) -> Option<String> {
        None
    }
}
