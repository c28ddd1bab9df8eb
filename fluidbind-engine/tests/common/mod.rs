//! Recording backend that stands in for FluidSynth in tests.
//!
//! Every native call is appended to a shared log. Status codes follow
//! FluidSynth's conventions closely enough to exercise the binding: channels
//! outside `0..16` fail, soundfonts load only from existing files, and
//! rendering writes a recognizable ramp (left = +frame, right = -frame).

#![allow(dead_code)]

use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;

use fluidbind_core::layout::CHANNELS;
use fluidbind_core::status::{FLUID_FAILED, FLUID_OK};
use fluidbind_core::{Error, Result, Strides, SynthConfig};
use fluidbind_engine::{Backend, SynthEngine};
use parking_lot::Mutex;

pub type Log = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
pub struct MockBackend {
    pub log: Log,
    pub fail_create: bool,
    pub fail_driver: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.log.lock().iter().filter(|c| c.as_str() == call).count()
    }
}

impl Backend for MockBackend {
    type Engine = MockEngine;

    fn name(&self) -> &str {
        "mock"
    }

    fn create(&self, config: &SynthConfig) -> Result<MockEngine> {
        if self.fail_create {
            return Err(Error::Allocation("synthesizer"));
        }
        let mut log = self.log.lock();
        log.push("new_settings".into());
        log.push(format!("setnum synth.gain {}", config.gain));
        log.push("new_synth".into());
        Ok(MockEngine {
            log: Arc::clone(&self.log),
            driver: false,
            fail_driver: self.fail_driver,
            next_sfont: 1,
        })
    }

    fn engine_version(&self) -> Option<String> {
        Some("mock-2.3.4".into())
    }
}

pub struct MockEngine {
    log: Log,
    driver: bool,
    fail_driver: bool,
    next_sfont: i32,
}

impl MockEngine {
    fn push(&self, call: String) {
        self.log.lock().push(call);
    }

    fn chan_status(chan: i32) -> i32 {
        if (0..16).contains(&chan) {
            FLUID_OK
        } else {
            FLUID_FAILED
        }
    }
}

impl SynthEngine for MockEngine {
    fn start_audio(&mut self) -> Result<()> {
        if self.fail_driver {
            return Err(Error::Allocation("audio driver"));
        }
        if !self.driver {
            self.push("new_driver".into());
            self.driver = true;
        }
        Ok(())
    }

    fn stop_audio(&mut self) {
        if self.driver {
            self.push("delete_driver".into());
            self.driver = false;
        }
    }

    fn sfload(&mut self, path: &CStr, reset_presets: bool) -> i32 {
        let p = path.to_string_lossy().into_owned();
        self.push(format!("sfload {p} {}", i32::from(reset_presets)));
        if Path::new(&p).exists() {
            let id = self.next_sfont;
            self.next_sfont += 1;
            id
        } else {
            FLUID_FAILED
        }
    }

    fn program_select(&mut self, chan: i32, sfont_id: i32, bank: i32, preset: i32) -> i32 {
        self.push(format!("program_select {chan} {sfont_id} {bank} {preset}"));
        if sfont_id <= 0 || sfont_id >= self.next_sfont {
            return FLUID_FAILED;
        }
        Self::chan_status(chan)
    }

    fn program_change(&mut self, chan: i32, program: i32) -> i32 {
        self.push(format!("program_change {chan} {program}"));
        Self::chan_status(chan)
    }

    fn bank_select(&mut self, chan: i32, bank: i32) -> i32 {
        self.push(format!("bank_select {chan} {bank}"));
        Self::chan_status(chan)
    }

    fn sfont_select(&mut self, chan: i32, sfont_id: i32) -> i32 {
        self.push(format!("sfont_select {chan} {sfont_id}"));
        Self::chan_status(chan)
    }

    fn program_reset(&mut self) -> i32 {
        self.push("program_reset".into());
        FLUID_OK
    }

    fn system_reset(&mut self) -> i32 {
        self.push("system_reset".into());
        FLUID_OK
    }

    fn noteon(&mut self, chan: i32, key: i32, vel: i32) -> i32 {
        self.push(format!("noteon {chan} {key} {vel}"));
        if !(0..128).contains(&key) || !(0..128).contains(&vel) {
            return FLUID_FAILED;
        }
        Self::chan_status(chan)
    }

    fn noteoff(&mut self, chan: i32, key: i32) -> i32 {
        self.push(format!("noteoff {chan} {key}"));
        if !(0..128).contains(&key) {
            return FLUID_FAILED;
        }
        Self::chan_status(chan)
    }

    fn pitch_bend(&mut self, chan: i32, val: i32) -> i32 {
        self.push(format!("pitch_bend {chan} {val}"));
        Self::chan_status(chan)
    }

    fn cc(&mut self, chan: i32, ctrl: i32, val: i32) -> i32 {
        self.push(format!("cc {chan} {ctrl} {val}"));
        Self::chan_status(chan)
    }

    fn write_s16(&mut self, frames: i32, out: &mut [i16], strides: Strides) -> i32 {
        self.push(format!("write_s16 {frames}"));
        let n = frames as usize;
        assert!(out.len() >= n * CHANNELS, "buffer too small");
        for f in 0..n {
            let l = strides.left_offset as usize + f * strides.left_incr as usize;
            let r = strides.right_offset as usize + f * strides.right_incr as usize;
            out[l] = f as i16;
            out[r] = -(f as i16);
        }
        FLUID_OK
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        let mut log = self.log.lock();
        if self.driver {
            log.push("delete_driver".into());
        }
        log.push("delete_synth".into());
        log.push("delete_settings".into());
    }
}
