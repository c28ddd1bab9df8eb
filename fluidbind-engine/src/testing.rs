//! In-process backend for exercising the binding surfaces without FluidSynth.
//!
//! Enabled with the `testing` feature. Events always succeed, `sfload` always
//! fails, and rendering writes a ramp (left = +frame, right = -frame) per
//! call. The frame count of every render call is recorded.

use std::ffi::CStr;
use std::sync::Arc;

use fluidbind_core::status::{FLUID_FAILED, FLUID_OK};
use fluidbind_core::{Result, Strides, SynthConfig};
use parking_lot::Mutex;

use crate::backend::{Backend, SynthEngine};

#[derive(Default)]
pub struct RampBackend {
    renders: Arc<Mutex<Vec<i32>>>,
}

impl RampBackend {
    /// Frames requested by each `write_s16` call so far, in order.
    pub fn renders(&self) -> Vec<i32> {
        self.renders.lock().clone()
    }
}

impl Backend for RampBackend {
    type Engine = RampEngine;

    fn name(&self) -> &str {
        "ramp"
    }

    fn create(&self, _config: &SynthConfig) -> Result<RampEngine> {
        Ok(RampEngine { renders: Arc::clone(&self.renders) })
    }
}

pub struct RampEngine {
    renders: Arc<Mutex<Vec<i32>>>,
}

impl SynthEngine for RampEngine {
    fn start_audio(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_audio(&mut self) {}

    fn sfload(&mut self, _path: &CStr, _reset_presets: bool) -> i32 {
        FLUID_FAILED
    }

    fn program_select(&mut self, _chan: i32, _sfont_id: i32, _bank: i32, _preset: i32) -> i32 {
        FLUID_OK
    }

    fn program_change(&mut self, _chan: i32, _program: i32) -> i32 {
        FLUID_OK
    }

    fn bank_select(&mut self, _chan: i32, _bank: i32) -> i32 {
        FLUID_OK
    }

    fn sfont_select(&mut self, _chan: i32, _sfont_id: i32) -> i32 {
        FLUID_OK
    }

    fn program_reset(&mut self) -> i32 {
        FLUID_OK
    }

    fn system_reset(&mut self) -> i32 {
        FLUID_OK
    }

    fn noteon(&mut self, _chan: i32, _key: i32, _vel: i32) -> i32 {
        FLUID_OK
    }

    fn noteoff(&mut self, _chan: i32, _key: i32) -> i32 {
        FLUID_OK
    }

    fn pitch_bend(&mut self, _chan: i32, _val: i32) -> i32 {
        FLUID_OK
    }

    fn cc(&mut self, _chan: i32, _ctrl: i32, _val: i32) -> i32 {
        FLUID_OK
    }

    fn write_s16(&mut self, frames: i32, out: &mut [i16], strides: Strides) -> i32 {
        self.renders.lock().push(frames);
        let Ok(n) = usize::try_from(frames) else {
            return FLUID_FAILED;
        };
        for f in 0..n {
            let l = strides.left_offset as usize + f * strides.left_incr as usize;
            let r = strides.right_offset as usize + f * strides.right_incr as usize;
            match (out.get(l), out.get(r)) {
                (Some(_), Some(_)) => {
                    out[l] = f as i16;
                    out[r] = -(f as i16);
                }
                _ => return FLUID_FAILED,
            }
        }
        FLUID_OK
    }
}
