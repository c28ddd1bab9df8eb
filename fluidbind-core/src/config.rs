//! Synthesizer configuration.
//!
//! Values map onto FluidSynth settings when the synthesizer is created
//! (`synth.sample-rate`, `synth.gain`, `synth.polyphony`,
//! `synth.midi-channels`, `audio.driver`). The rest steer the binding itself.
//!
//! Sources, later wins: defaults, TOML, environment
//! (`FLUIDBIND_LIBRARY`, `FLUIDBIND_AUDIO_DRIVER`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::SampleLayout;

pub const ENV_LIBRARY: &str = "FLUIDBIND_LIBRARY";
pub const ENV_AUDIO_DRIVER: &str = "FLUIDBIND_AUDIO_DRIVER";

/// About 95 s of stereo audio at 44.1 kHz (16 MiB).
pub const DEFAULT_MAX_FRAMES: usize = 1 << 22;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    /// Explicit path to the FluidSynth shared library.
    pub library: Option<PathBuf>,
    /// FluidSynth audio driver name (`alsa`, `pulseaudio`, `coreaudio`, ...).
    pub audio_driver: Option<String>,
    pub sample_rate: f64,
    pub gain: f64,
    pub polyphony: i32,
    pub midi_channels: i32,
    pub layout: SampleLayout,
    /// Upper bound for a single `write_s16` call.
    pub max_frames_per_call: usize,
    /// Passed as `reset_presets` to `fluid_synth_sfload`.
    pub reset_presets_on_load: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            library: None,
            audio_driver: None,
            sample_rate: 44_100.0,
            gain: 0.2,
            polyphony: 256,
            midi_channels: 16,
            layout: SampleLayout::Interleaved,
            max_frames_per_call: DEFAULT_MAX_FRAMES,
            reset_presets_on_load: false,
        }
    }
}

impl SynthConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: SynthConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&text)?.with_env_overrides();
        tracing::debug!("Loaded synth config from {}", path.display());
        Ok(cfg)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var_os(ENV_LIBRARY).map(PathBuf::from),
            std::env::var(ENV_AUDIO_DRIVER).ok(),
        )
    }

    fn with_overrides(mut self, library: Option<PathBuf>, driver: Option<String>) -> Self {
        if let Some(lib) = library.filter(|p| !p.as_os_str().is_empty()) {
            tracing::debug!("{ENV_LIBRARY} overrides library path: {}", lib.display());
            self.library = Some(lib);
        }
        if let Some(drv) = driver.filter(|d| !d.is_empty()) {
            tracing::debug!("{ENV_AUDIO_DRIVER} overrides audio driver: {drv}");
            self.audio_driver = Some(drv);
        }
        self
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Range checks mirroring FluidSynth's own setting limits.
    pub fn validate(&self) -> Result<()> {
        if !(8_000.0..=96_000.0).contains(&self.sample_rate) {
            return Err(Error::Config(format!(
                "sample_rate {} outside 8000..=96000",
                self.sample_rate
            )));
        }
        if !(0.0..=10.0).contains(&self.gain) {
            return Err(Error::Config(format!("gain {} outside 0..=10", self.gain)));
        }
        if !(1..=65_535).contains(&self.polyphony) {
            return Err(Error::Config(format!(
                "polyphony {} outside 1..=65535",
                self.polyphony
            )));
        }
        if !(16..=256).contains(&self.midi_channels) || self.midi_channels % 16 != 0 {
            return Err(Error::Config(format!(
                "midi_channels {} must be a multiple of 16 in 16..=256",
                self.midi_channels
            )));
        }
        // planar right offset and the sample count must both fit an i32
        let cap = (i32::MAX as usize) / 2;
        if self.max_frames_per_call == 0 || self.max_frames_per_call > cap {
            return Err(Error::Config(format!(
                "max_frames_per_call {} outside 1..={cap}",
                self.max_frames_per_call
            )));
        }
        if matches!(&self.audio_driver, Some(d) if d.contains('\0')) {
            return Err(Error::Config("audio_driver contains a NUL byte".into()));
        }
        Ok(())
    }
}
