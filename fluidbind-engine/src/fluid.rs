//! FluidSynth backend.
//!
//! The C API is resolved at runtime with `libloading`, so the binding builds
//! without FluidSynth headers or import libraries and reports a missing
//! library as an error from `init()` instead of failing to link.
//!
//! Threading
//! - Every synthesizer is created with `synth.threadsafe-api = 1`, so caller
//!   events are serialized against FluidSynth's own audio thread once a driver
//!   is running.
//! - A `FluidSynthEngine` is `Send` but not `Sync`; `Synth` hands out `&mut`.

use std::ffi::{c_char, c_double, c_int, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libloading::Library;
use parking_lot::Mutex;

use fluidbind_core::layout::CHANNELS;
use fluidbind_core::status::FLUID_FAILED;
use fluidbind_core::{Error, Result, Strides, SynthConfig};

use crate::backend::{Backend, SynthEngine};

// ----------------------------- Opaque C handles ---------------------------------

#[repr(C)]
pub struct FluidSettings {
    _private: [u8; 0],
}

#[repr(C)]
pub struct FluidSynthHandle {
    _private: [u8; 0],
}

#[repr(C)]
pub struct FluidAudioDriver {
    _private: [u8; 0],
}

// ----------------------------- Entry point signatures ---------------------------

type NewSettingsFn = unsafe extern "C" fn() -> *mut FluidSettings;
type DeleteSettingsFn = unsafe extern "C" fn(*mut FluidSettings);
type SetNumFn = unsafe extern "C" fn(*mut FluidSettings, *const c_char, c_double) -> c_int;
type SetIntFn = unsafe extern "C" fn(*mut FluidSettings, *const c_char, c_int) -> c_int;
type SetStrFn = unsafe extern "C" fn(*mut FluidSettings, *const c_char, *const c_char) -> c_int;
type NewSynthFn = unsafe extern "C" fn(*mut FluidSettings) -> *mut FluidSynthHandle;
type DeleteSynthFn = unsafe extern "C" fn(*mut FluidSynthHandle);
type NewDriverFn =
    unsafe extern "C" fn(*mut FluidSettings, *mut FluidSynthHandle) -> *mut FluidAudioDriver;
type DeleteDriverFn = unsafe extern "C" fn(*mut FluidAudioDriver);
type SfLoadFn = unsafe extern "C" fn(*mut FluidSynthHandle, *const c_char, c_int) -> c_int;
type Synth0Fn = unsafe extern "C" fn(*mut FluidSynthHandle) -> c_int;
type Synth2Fn = unsafe extern "C" fn(*mut FluidSynthHandle, c_int, c_int) -> c_int;
type Synth3Fn = unsafe extern "C" fn(*mut FluidSynthHandle, c_int, c_int, c_int) -> c_int;
type Synth4Fn = unsafe extern "C" fn(*mut FluidSynthHandle, c_int, c_int, c_int, c_int) -> c_int;
type WriteS16Fn = unsafe extern "C" fn(
    *mut FluidSynthHandle,
    c_int,
    *mut c_void,
    c_int,
    c_int,
    *mut c_void,
    c_int,
    c_int,
) -> c_int;
type VersionStrFn = unsafe extern "C" fn() -> *mut c_char;

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        const DEFAULT_LIBRARY_NAMES: &[&str] =
            &["libfluidsynth-3.dll", "libfluidsynth-2.dll", "fluidsynth.dll"];
    } else if #[cfg(target_os = "macos")] {
        const DEFAULT_LIBRARY_NAMES: &[&str] = &[
            "libfluidsynth.3.dylib",
            "libfluidsynth.dylib",
            "/opt/homebrew/lib/libfluidsynth.dylib",
            "/usr/local/lib/libfluidsynth.dylib",
        ];
    } else {
        const DEFAULT_LIBRARY_NAMES: &[&str] = &[
            "libfluidsynth.so.3",
            "libfluidsynth.so.2",
            "libfluidsynth.so.1",
            "libfluidsynth.so",
        ];
    }
}

/// Resolve a required symbol as a copied function pointer.
macro_rules! sym {
    ($lib:expr, $name:literal, $ty:ty) => {{
        // SAFETY: `$ty` matches the prototype of `$name` in fluidsynth.h.
        let s = unsafe { $lib.get::<$ty>(concat!($name, "\0").as_bytes()) }
            .map_err(|_| Error::MissingSymbol($name))?;
        *s
    }};
}

/// Function table for the subset of the FluidSynth C API the binding uses.
///
/// The pointers stay valid for as long as `_lib` is loaded, which is the
/// lifetime of this struct.
#[derive(Debug)]
pub struct FluidApi {
    new_fluid_settings: NewSettingsFn,
    delete_fluid_settings: DeleteSettingsFn,
    settings_setnum: SetNumFn,
    settings_setint: SetIntFn,
    settings_setstr: SetStrFn,
    new_fluid_synth: NewSynthFn,
    delete_fluid_synth: DeleteSynthFn,
    new_fluid_audio_driver: NewDriverFn,
    delete_fluid_audio_driver: DeleteDriverFn,
    sfload: SfLoadFn,
    program_select: Synth4Fn,
    noteon: Synth3Fn,
    noteoff: Synth2Fn,
    pitch_bend: Synth2Fn,
    cc: Synth3Fn,
    program_change: Synth2Fn,
    bank_select: Synth2Fn,
    sfont_select: Synth2Fn,
    program_reset: Synth0Fn,
    system_reset: Synth0Fn,
    write_s16: WriteS16Fn,
    version_str: Option<VersionStrFn>,
    path: String,
    _lib: Library,
}

impl FluidApi {
    /// Open `path`, or the platform default names when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (lib, name) = match path {
            Some(p) => {
                // SAFETY: loading a shared library runs its initializers; FluidSynth's are benign.
                let lib = unsafe { Library::new(p) }.map_err(|e| Error::Library {
                    tried: p.display().to_string(),
                    reason: e.to_string(),
                })?;
                (lib, p.display().to_string())
            }
            None => open_default()?,
        };
        Self::from_library(lib, name)
    }

    fn from_library(lib: Library, path: String) -> Result<Self> {
        // SAFETY: optional symbol, same prototype as in fluidsynth.h.
        let version_str = unsafe { lib.get::<VersionStrFn>(b"fluid_version_str\0") }
            .ok()
            .map(|s| *s);

        let api = Self {
            new_fluid_settings: sym!(lib, "new_fluid_settings", NewSettingsFn),
            delete_fluid_settings: sym!(lib, "delete_fluid_settings", DeleteSettingsFn),
            settings_setnum: sym!(lib, "fluid_settings_setnum", SetNumFn),
            settings_setint: sym!(lib, "fluid_settings_setint", SetIntFn),
            settings_setstr: sym!(lib, "fluid_settings_setstr", SetStrFn),
            new_fluid_synth: sym!(lib, "new_fluid_synth", NewSynthFn),
            delete_fluid_synth: sym!(lib, "delete_fluid_synth", DeleteSynthFn),
            new_fluid_audio_driver: sym!(lib, "new_fluid_audio_driver", NewDriverFn),
            delete_fluid_audio_driver: sym!(lib, "delete_fluid_audio_driver", DeleteDriverFn),
            sfload: sym!(lib, "fluid_synth_sfload", SfLoadFn),
            program_select: sym!(lib, "fluid_synth_program_select", Synth4Fn),
            noteon: sym!(lib, "fluid_synth_noteon", Synth3Fn),
            noteoff: sym!(lib, "fluid_synth_noteoff", Synth2Fn),
            pitch_bend: sym!(lib, "fluid_synth_pitch_bend", Synth2Fn),
            cc: sym!(lib, "fluid_synth_cc", Synth3Fn),
            program_change: sym!(lib, "fluid_synth_program_change", Synth2Fn),
            bank_select: sym!(lib, "fluid_synth_bank_select", Synth2Fn),
            sfont_select: sym!(lib, "fluid_synth_sfont_select", Synth2Fn),
            program_reset: sym!(lib, "fluid_synth_program_reset", Synth0Fn),
            system_reset: sym!(lib, "fluid_synth_system_reset", Synth0Fn),
            write_s16: sym!(lib, "fluid_synth_write_s16", WriteS16Fn),
            version_str,
            path,
            _lib: lib,
        };
        tracing::debug!("Loaded FluidSynth API from {}", api.path);
        Ok(api)
    }

    /// Where the library was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `fluid_version_str()`, when exported.
    pub fn version(&self) -> Option<String> {
        let f = self.version_str?;
        // SAFETY: returns a pointer to a static NUL-terminated string or null.
        let p = unsafe { f() };
        if p.is_null() {
            return None;
        }
        // SAFETY: non-null, static, NUL-terminated.
        Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
    }
}

fn open_default() -> Result<(Library, String)> {
    let mut last_err = String::from("no candidates");
    for name in DEFAULT_LIBRARY_NAMES {
        // SAFETY: see `FluidApi::load`.
        match unsafe { Library::new(name) } {
            Ok(lib) => return Ok((lib, (*name).to_string())),
            Err(e) => last_err = e.to_string(),
        }
    }
    Err(Error::Library {
        tried: DEFAULT_LIBRARY_NAMES.join(", "),
        reason: last_err,
    })
}

// ----------------------------- Backend ------------------------------------------

/// Backend that creates FluidSynth instances.
///
/// The library is opened on the first `create` and shared by every engine
/// this backend creates afterwards.
#[derive(Default)]
pub struct FluidSynth {
    api: Mutex<Option<(Option<PathBuf>, Arc<FluidApi>)>>,
}

impl FluidSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded API for `library`, reusing the cached one when the path matches.
    fn api(&self, library: Option<&Path>) -> Result<Arc<FluidApi>> {
        let mut slot = self.api.lock();
        if let Some((path, api)) = slot.as_ref() {
            if path.as_deref() == library {
                return Ok(Arc::clone(api));
            }
        }
        let api = Arc::new(FluidApi::load(library)?);
        *slot = Some((library.map(Path::to_path_buf), Arc::clone(&api)));
        Ok(api)
    }
}

impl Backend for FluidSynth {
    type Engine = FluidSynthEngine;

    fn name(&self) -> &str {
        "fluidsynth"
    }

    fn create(&self, config: &SynthConfig) -> Result<FluidSynthEngine> {
        let api = self.api(config.library.as_deref())?;

        // SAFETY: no preconditions.
        let settings = unsafe { (api.new_fluid_settings)() };
        if settings.is_null() {
            return Err(Error::Allocation("settings"));
        }
        // From here on, Drop releases whatever has been allocated.
        let mut engine = FluidSynthEngine {
            api,
            settings,
            synth: ptr::null_mut(),
            driver: ptr::null_mut(),
        };
        engine.apply_settings(config)?;

        // SAFETY: settings is a live handle.
        engine.synth = unsafe { (engine.api.new_fluid_synth)(engine.settings) };
        if engine.synth.is_null() {
            return Err(Error::Allocation("synthesizer"));
        }
        Ok(engine)
    }

    fn engine_version(&self) -> Option<String> {
        self.api.lock().as_ref().and_then(|(_, api)| api.version())
    }
}

// ----------------------------- Engine instance ----------------------------------

/// One FluidSynth settings/synth/driver triple.
pub struct FluidSynthEngine {
    api: Arc<FluidApi>,
    settings: *mut FluidSettings,
    synth: *mut FluidSynthHandle,
    driver: *mut FluidAudioDriver,
}

// SAFETY: the handles are owned exclusively by this value and FluidSynth does
// not tie them to the creating thread.
unsafe impl Send for FluidSynthEngine {}

impl FluidSynthEngine {
    fn apply_settings(&mut self, config: &SynthConfig) -> Result<()> {
        self.set_num(c"synth.sample-rate", config.sample_rate);
        self.set_num(c"synth.gain", config.gain);
        self.set_int(c"synth.polyphony", config.polyphony);
        self.set_int(c"synth.midi-channels", config.midi_channels);
        self.set_int(c"synth.threadsafe-api", 1);
        if let Some(driver) = &config.audio_driver {
            let value = CString::new(driver.as_str()).map_err(|_| Error::InvalidArgument {
                name: "audio_driver",
                reason: "contains a NUL byte".into(),
            })?;
            self.set_str(c"audio.driver", &value);
        }
        Ok(())
    }

    fn set_num(&mut self, name: &CStr, value: f64) {
        // SAFETY: settings is live; name is NUL-terminated.
        let rc = unsafe { (self.api.settings_setnum)(self.settings, name.as_ptr(), value) };
        log_setting(name, &value, rc);
    }

    fn set_int(&mut self, name: &CStr, value: i32) {
        // SAFETY: as above.
        let rc = unsafe { (self.api.settings_setint)(self.settings, name.as_ptr(), value) };
        log_setting(name, &value, rc);
    }

    fn set_str(&mut self, name: &CStr, value: &CStr) {
        // SAFETY: as above; FluidSynth copies the value.
        let rc =
            unsafe { (self.api.settings_setstr)(self.settings, name.as_ptr(), value.as_ptr()) };
        log_setting(name, &value, rc);
    }

    /// Library this engine was created from.
    pub fn api(&self) -> &FluidApi {
        &self.api
    }

    pub fn has_driver(&self) -> bool {
        !self.driver.is_null()
    }

    fn release(&mut self) {
        // driver -> synth -> settings; each only once
        if !self.driver.is_null() {
            // SAFETY: driver was created by new_fluid_audio_driver and not yet deleted.
            unsafe { (self.api.delete_fluid_audio_driver)(self.driver) };
            self.driver = ptr::null_mut();
        }
        if !self.synth.is_null() {
            // SAFETY: synth was created by new_fluid_synth and not yet deleted.
            unsafe { (self.api.delete_fluid_synth)(self.synth) };
            self.synth = ptr::null_mut();
        }
        if !self.settings.is_null() {
            // SAFETY: settings was created by new_fluid_settings and not yet deleted.
            unsafe { (self.api.delete_fluid_settings)(self.settings) };
            self.settings = ptr::null_mut();
        }
    }
}

fn log_setting(name: &CStr, value: &dyn std::fmt::Debug, rc: c_int) {
    if rc == FLUID_FAILED {
        tracing::warn!("FluidSynth rejected setting {name:?} = {value:?}");
    } else {
        tracing::debug!("FluidSynth setting {name:?} = {value:?}");
    }
}

// The synth pointer is non-null for the whole life of an engine handed out by
// `FluidSynth::create`; every call below relies on that.
impl SynthEngine for FluidSynthEngine {
    fn start_audio(&mut self) -> Result<()> {
        if !self.driver.is_null() {
            return Ok(());
        }
        // SAFETY: settings and synth are live.
        self.driver = unsafe { (self.api.new_fluid_audio_driver)(self.settings, self.synth) };
        if self.driver.is_null() {
            return Err(Error::Allocation("audio driver"));
        }
        Ok(())
    }

    fn stop_audio(&mut self) {
        if !self.driver.is_null() {
            // SAFETY: live driver, deleted once.
            unsafe { (self.api.delete_fluid_audio_driver)(self.driver) };
            self.driver = ptr::null_mut();
        }
    }

    fn sfload(&mut self, path: &CStr, reset_presets: bool) -> i32 {
        // SAFETY: live synth; FluidSynth copies the filename.
        unsafe { (self.api.sfload)(self.synth, path.as_ptr(), c_int::from(reset_presets)) }
    }

    fn program_select(&mut self, chan: i32, sfont_id: i32, bank: i32, preset: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.program_select)(self.synth, chan, sfont_id, bank, preset) }
    }

    fn program_change(&mut self, chan: i32, program: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.program_change)(self.synth, chan, program) }
    }

    fn bank_select(&mut self, chan: i32, bank: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.bank_select)(self.synth, chan, bank) }
    }

    fn sfont_select(&mut self, chan: i32, sfont_id: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.sfont_select)(self.synth, chan, sfont_id) }
    }

    fn program_reset(&mut self) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.program_reset)(self.synth) }
    }

    fn system_reset(&mut self) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.system_reset)(self.synth) }
    }

    fn noteon(&mut self, chan: i32, key: i32, vel: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.noteon)(self.synth, chan, key, vel) }
    }

    fn noteoff(&mut self, chan: i32, key: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.noteoff)(self.synth, chan, key) }
    }

    fn pitch_bend(&mut self, chan: i32, val: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.pitch_bend)(self.synth, chan, val) }
    }

    fn cc(&mut self, chan: i32, ctrl: i32, val: i32) -> i32 {
        // SAFETY: live synth.
        unsafe { (self.api.cc)(self.synth, chan, ctrl, val) }
    }

    fn write_s16(&mut self, frames: i32, out: &mut [i16], strides: Strides) -> i32 {
        let Ok(needed) = usize::try_from(frames) else {
            return FLUID_FAILED;
        };
        if out.len() < needed * CHANNELS {
            return FLUID_FAILED;
        }
        let buf = out.as_mut_ptr().cast::<c_void>();
        // SAFETY: live synth; both channel pointers address `out`, which holds
        // `frames * 2` samples, and the strides stay inside it.
        unsafe {
            (self.api.write_s16)(
                self.synth,
                frames,
                buf,
                strides.left_offset,
                strides.left_incr,
                buf,
                strides.right_offset,
                strides.right_incr,
            )
        }
    }
}

impl Drop for FluidSynthEngine {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_reported() {
        let err = FluidApi::load(Some(Path::new("/nonexistent/libfluidsynth.so"))).unwrap_err();
        match err {
            Error::Library { tried, .. } => assert!(tried.contains("nonexistent")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn backend_create_fails_cleanly_without_library() {
        let backend = FluidSynth::new();
        let cfg = SynthConfig {
            library: Some(PathBuf::from("/nonexistent/libfluidsynth.so")),
            ..SynthConfig::default()
        };
        assert!(matches!(backend.create(&cfg), Err(Error::Library { .. })));
        assert_eq!(backend.engine_version(), None);
    }

    #[test]
    fn default_names_are_platform_specific() {
        assert!(!DEFAULT_LIBRARY_NAMES.is_empty());
        assert!(DEFAULT_LIBRARY_NAMES.iter().all(|n| n.contains("fluidsynth")));
    }
}
