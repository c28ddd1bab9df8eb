//! Synthesizer context object.
//!
//! A `Synth` owns one engine instance and tracks the lifecycle
//! `Uninitialized -> Initialized -> Started -> Stopped`. Operations that need
//! a synthesizer fail with `Error::NotInitialized` instead of reaching the
//! engine with a null handle; `stop()` may be called any number of times.
//!
//! Usage:
//!
//! ```no_run
//! use fluidbind_engine::{Synth, SynthConfig};
//!
//! # fn main() -> fluidbind_engine::Result<()> {
//! let mut synth = Synth::new(SynthConfig::from_env());
//! synth.init()?;
//! let sf = synth.sfload("example.sf2")?;
//! synth.program_select(0, sf, 0, 0)?;
//! synth.noteon(0, 60, 30)?;
//! let pcm = synth.write_s16(44_100)?; // one second, 176400 bytes
//! synth.noteoff(0, 60)?;
//! synth.stop();
//! # let _ = pcm;
//! # Ok(())
//! # }
//! ```

use std::ffi::CString;
use std::path::Path;

use fluidbind_core::layout::{check_frame_count, frames_in, samples_to_bytes, SampleLayout};
use fluidbind_core::{Error, Result, State, Status, SynthConfig, BINDING_API_VERSION};

use crate::backend::{Backend, SynthEngine};
use crate::fluid::FluidSynth;

pub struct Synth<B: Backend = FluidSynth> {
    backend: B,
    config: SynthConfig,
    state: State,
    engine: Option<B::Engine>,
}

impl Synth<FluidSynth> {
    /// Context backed by the system FluidSynth library. Nothing is loaded
    /// until `init()`.
    pub fn new(config: SynthConfig) -> Self {
        Self::with_backend(FluidSynth::new(), config)
    }
}

impl<B: Backend> Synth<B> {
    pub fn with_backend(backend: B, config: SynthConfig) -> Self {
        Self {
            backend,
            config,
            state: State::Uninitialized,
            engine: None,
        }
    }

    /// Binding interface revision; independent of any instance state.
    #[inline]
    pub fn version() -> i32 {
        BINDING_API_VERSION
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runtime engine version, once the backend has loaded it.
    pub fn engine_version(&self) -> Option<String> {
        self.backend.engine_version()
    }

    // --- Lifecycle ----------------------------------------------------------------

    /// Allocate settings and synthesizer.
    pub fn init(&mut self) -> Result<()> {
        let next = self.state.on_init()?;
        self.config.validate()?;
        let engine = self.backend.create(&self.config)?;
        self.engine = Some(engine);
        self.state = next;
        tracing::info!(
            backend = self.backend.name(),
            sample_rate = self.config.sample_rate,
            "Synthesizer initialized"
        );
        Ok(())
    }

    /// Attach an audio driver; sound starts flowing on the engine's own thread.
    pub fn start(&mut self) -> Result<()> {
        let next = self.state.on_start()?;
        self.engine_mut("start")?.start_audio()?;
        self.state = next;
        tracing::info!(
            driver = self.config.audio_driver.as_deref().unwrap_or("default"),
            "Audio driver started"
        );
        Ok(())
    }

    /// Release driver, synthesizer and settings. Safe to call repeatedly.
    pub fn stop(&mut self) {
        match self.engine.take() {
            Some(mut engine) => {
                engine.stop_audio();
                drop(engine);
                tracing::info!("Synthesizer stopped");
            }
            None => tracing::debug!(state = %self.state, "stop: nothing to release"),
        }
        self.state = self.state.on_stop();
    }

    fn engine_mut(&mut self, op: &'static str) -> Result<&mut B::Engine> {
        self.state.require_synth(op)?;
        self.engine
            .as_mut()
            .ok_or(Error::NotInitialized { op, state: self.state })
    }

    // --- Soundfont and program control --------------------------------------------

    /// Load a soundfont. Returns the engine's soundfont id, or its failure
    /// sentinel (negative) when the file cannot be loaded.
    pub fn sfload(&mut self, path: impl AsRef<Path>) -> Result<i32> {
        let path = path.as_ref();
        let reset = self.config.reset_presets_on_load;
        let engine = self.engine_mut("sfload")?;
        let c_path = path_to_cstring(path)?;
        let id = engine.sfload(&c_path, reset);
        if id < 0 {
            tracing::warn!(status = id, "Failed to load soundfont {}", path.display());
        } else {
            tracing::debug!(sfont_id = id, "Loaded soundfont {}", path.display());
        }
        Ok(id)
    }

    pub fn program_select(&mut self, chan: i32, sfont_id: i32, bank: i32, preset: i32) -> Result<Status> {
        let rc = self
            .engine_mut("program_select")?
            .program_select(chan, sfont_id, bank, preset);
        tracing::trace!(chan, sfont_id, bank, preset, status = rc, "program_select");
        Ok(Status::from(rc))
    }

    pub fn program_change(&mut self, chan: i32, program: i32) -> Result<Status> {
        let rc = self.engine_mut("program_change")?.program_change(chan, program);
        tracing::trace!(chan, program, status = rc, "program_change");
        Ok(Status::from(rc))
    }

    pub fn bank_select(&mut self, chan: i32, bank: i32) -> Result<Status> {
        let rc = self.engine_mut("bank_select")?.bank_select(chan, bank);
        tracing::trace!(chan, bank, status = rc, "bank_select");
        Ok(Status::from(rc))
    }

    pub fn sfont_select(&mut self, chan: i32, sfont_id: i32) -> Result<Status> {
        let rc = self.engine_mut("sfont_select")?.sfont_select(chan, sfont_id);
        tracing::trace!(chan, sfont_id, status = rc, "sfont_select");
        Ok(Status::from(rc))
    }

    /// Restore every channel's program binding to the engine default.
    pub fn program_reset(&mut self) -> Result<Status> {
        let rc = self.engine_mut("program_reset")?.program_reset();
        tracing::debug!(status = rc, "program_reset");
        Ok(Status::from(rc))
    }

    /// Silence all voices and reset all channels.
    pub fn system_reset(&mut self) -> Result<Status> {
        let rc = self.engine_mut("system_reset")?.system_reset();
        tracing::debug!(status = rc, "system_reset");
        Ok(Status::from(rc))
    }

    // --- Real-time events ---------------------------------------------------------
    //
    // No range checks: channel/key/velocity go to the engine as given.

    pub fn noteon(&mut self, chan: i32, key: i32, vel: i32) -> Result<Status> {
        let rc = self.engine_mut("noteon")?.noteon(chan, key, vel);
        tracing::trace!(chan, key, vel, status = rc, "noteon");
        Ok(Status::from(rc))
    }

    pub fn noteoff(&mut self, chan: i32, key: i32) -> Result<Status> {
        let rc = self.engine_mut("noteoff")?.noteoff(chan, key);
        tracing::trace!(chan, key, status = rc, "noteoff");
        Ok(Status::from(rc))
    }

    pub fn pitch_bend(&mut self, chan: i32, val: i32) -> Result<Status> {
        let rc = self.engine_mut("pitch_bend")?.pitch_bend(chan, val);
        tracing::trace!(chan, val, status = rc, "pitch_bend");
        Ok(Status::from(rc))
    }

    pub fn cc(&mut self, chan: i32, ctrl: i32, val: i32) -> Result<Status> {
        let rc = self.engine_mut("cc")?.cc(chan, ctrl, val);
        tracing::trace!(chan, ctrl, val, status = rc, "cc");
        Ok(Status::from(rc))
    }

    // --- Sample retrieval ---------------------------------------------------------

    /// Render `frames` frames and return them as 16-bit little-endian bytes,
    /// `frames * 4` long, in the configured layout.
    pub fn write_s16(&mut self, frames: i64) -> Result<Vec<u8>> {
        let (max, layout) = (self.config.max_frames_per_call, self.config.layout);
        let engine = self.engine_mut("write_s16")?;
        let frames = check_frame_count(frames, max)?;
        if frames == 0 {
            return Ok(Vec::new());
        }
        let mut samples = vec![0i16; layout.samples(frames)];
        render(engine, frames, layout, &mut samples)?;
        Ok(samples_to_bytes(&samples))
    }

    /// Render as many whole frames as fit in `out`, without allocating.
    /// Returns the number of frames written.
    pub fn render_into(&mut self, out: &mut [i16]) -> Result<usize> {
        let (max, layout) = (self.config.max_frames_per_call, self.config.layout);
        let engine = self.engine_mut("render_into")?;
        let frames = frames_in(out.len());
        if frames > max {
            return Err(Error::FrameCount {
                requested: i64::try_from(frames).unwrap_or(i64::MAX),
                max,
            });
        }
        if frames == 0 {
            return Ok(0);
        }
        render(engine, frames, layout, &mut out[..layout.samples(frames)])?;
        Ok(frames)
    }
}

fn render<E: SynthEngine>(
    engine: &mut E,
    frames: usize,
    layout: SampleLayout,
    out: &mut [i16],
) -> Result<()> {
    let n = i32::try_from(frames).map_err(|_| Error::FrameCount {
        requested: i64::try_from(frames).unwrap_or(i64::MAX),
        max: i32::MAX as usize,
    })?;
    let rc = engine.write_s16(n, out, layout.strides(n));
    if rc < 0 {
        tracing::warn!(status = rc, frames, "write_s16 failed");
        return Err(Error::Engine { op: "write_s16", code: rc });
    }
    Ok(())
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path
        .to_str()
        .ok_or_else(|| Error::InvalidArgument {
            name: "path",
            reason: "not valid UTF-8".into(),
        })?
        .as_bytes()
        .to_vec();
    CString::new(bytes).map_err(|_| Error::InvalidArgument {
        name: "path",
        reason: "contains a NUL byte".into(),
    })
}
