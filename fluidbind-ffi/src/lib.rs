//! C ABI wrapper for the fluidbind synthesizer context.
//!
//! Exposes the flat binding surface over an opaque handle so hosts other than
//! Python can drive FluidSynth the same way.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`, prefixed `fluidbind_`.
//! - Opaque handle type: `FluidbindSynth` (heap-allocated; free with `fluidbind_free`).
//! - Lifecycle calls return `1` on success.
//! - Engine calls return the FluidSynth status code (or soundfont id) unchanged.
//! - Binding errors are negative codes `<= -100` (`FLUIDBIND_ERR_*`); the
//!   message is available from `fluidbind_last_error` until the next call.
//!
//! Threading
//! - A handle is NOT thread-safe; serialize all calls on the same handle.

#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{c_char, c_int, CStr, CString};
use std::path::PathBuf;
use std::ptr;

use fluidbind_core::layout::{check_frame_count, CHANNELS};
use fluidbind_engine::{Backend, Error, Result, Synth, SynthConfig, BINDING_API_VERSION, SUCCESS};

pub const FLUIDBIND_ERR_NULL: c_int = -100;
pub const FLUIDBIND_ERR_STATE: c_int = -101;
pub const FLUIDBIND_ERR_ARGUMENT: c_int = -102;
pub const FLUIDBIND_ERR_LIBRARY: c_int = -103;
pub const FLUIDBIND_ERR_ENGINE: c_int = -104;
pub const FLUIDBIND_ERR_CONFIG: c_int = -105;

/// Opaque synthesizer handle we hand to C.
pub struct FluidbindSynth {
    inner: Synth,
    last_error: Option<CString>,
}

impl FluidbindSynth {
    fn new(config: SynthConfig) -> Self {
        Self { inner: Synth::new(config), last_error: None }
    }

    fn record(&mut self, e: &Error) -> c_int {
        tracing::debug!("fluidbind ffi error: {e}");
        self.last_error = CString::new(e.to_string().replace('\0', "?")).ok();
        error_code(e)
    }
}

fn error_code(e: &Error) -> c_int {
    match e {
        Error::NotInitialized { .. } | Error::InvalidState { .. } => FLUIDBIND_ERR_STATE,
        Error::FrameCount { .. } | Error::InvalidArgument { .. } => FLUIDBIND_ERR_ARGUMENT,
        Error::Library { .. } | Error::MissingSymbol(_) => FLUIDBIND_ERR_LIBRARY,
        Error::Allocation(_) | Error::Engine { .. } => FLUIDBIND_ERR_ENGINE,
        Error::Config(_) | Error::Io(_) => FLUIDBIND_ERR_CONFIG,
    }
}

/// Run `f` against a live handle, translating binding errors to codes.
fn with_synth(handle: *mut FluidbindSynth, f: impl FnOnce(&mut Synth) -> Result<c_int>) -> c_int {
    if handle.is_null() {
        return FLUIDBIND_ERR_NULL;
    }
    let h = unsafe { &mut *handle };
    match f(&mut h.inner) {
        Ok(v) => {
            h.last_error = None;
            v
        }
        Err(e) => h.record(&e),
    }
}

fn arg_cstr<'a>(p: *const c_char, name: &'static str) -> Result<&'a CStr> {
    if p.is_null() {
        return Err(Error::InvalidArgument { name, reason: "null pointer".into() });
    }
    Ok(unsafe { CStr::from_ptr(p) })
}

fn arg_str<'a>(p: *const c_char, name: &'static str) -> Result<&'a str> {
    arg_cstr(p, name)?
        .to_str()
        .map_err(|_| Error::InvalidArgument { name, reason: "not valid UTF-8".into() })
}

/// Paths are raw bytes on unix, UTF-8 elsewhere.
fn arg_path(p: *const c_char) -> Result<PathBuf> {
    #[cfg(unix)]
    let path = {
        use std::os::unix::ffi::OsStrExt;
        PathBuf::from(std::ffi::OsStr::from_bytes(arg_cstr(p, "path")?.to_bytes()))
    };
    #[cfg(not(unix))]
    let path = PathBuf::from(arg_str(p, "path")?);
    Ok(path)
}

// --- Creation / destruction -------------------------------------------------------

/// Binding interface revision.
#[no_mangle]
pub extern "C" fn fluidbind_version() -> c_int {
    BINDING_API_VERSION
}

/// Create a synthesizer context. `config_toml` may be null for defaults;
/// environment overrides apply either way. Returns null on invalid config.
#[no_mangle]
pub extern "C" fn fluidbind_new(config_toml: *const c_char) -> *mut FluidbindSynth {
    let config = if config_toml.is_null() {
        Ok(SynthConfig::default())
    } else {
        arg_str(config_toml, "config_toml").and_then(SynthConfig::from_toml_str)
    };
    match config {
        Ok(cfg) => Box::into_raw(Box::new(FluidbindSynth::new(cfg.with_env_overrides()))),
        Err(e) => {
            tracing::warn!("fluidbind_new: {e}");
            ptr::null_mut()
        }
    }
}

/// Destroy a context previously returned by `fluidbind_new`, releasing any
/// engine resources it still holds.
#[no_mangle]
pub extern "C" fn fluidbind_free(handle: *mut FluidbindSynth) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle));
        }
    }
}

/// Message for the last failed call on `handle`, or null.
#[no_mangle]
pub extern "C" fn fluidbind_last_error(handle: *const FluidbindSynth) -> *const c_char {
    if handle.is_null() {
        return ptr::null();
    }
    let h = unsafe { &*handle };
    h.last_error.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

// --- Lifecycle --------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn fluidbind_init(handle: *mut FluidbindSynth) -> c_int {
    with_synth(handle, |s| s.init().map(|()| SUCCESS))
}

#[no_mangle]
pub extern "C" fn fluidbind_start(handle: *mut FluidbindSynth) -> c_int {
    with_synth(handle, |s| s.start().map(|()| SUCCESS))
}

/// Release driver, synthesizer and settings. Idempotent.
#[no_mangle]
pub extern "C" fn fluidbind_stop(handle: *mut FluidbindSynth) -> c_int {
    with_synth(handle, |s| {
        s.stop();
        Ok(SUCCESS)
    })
}

// --- Soundfont and program control ------------------------------------------------

/// Load a soundfont; returns its id or the engine failure sentinel.
#[no_mangle]
pub extern "C" fn fluidbind_sfload(handle: *mut FluidbindSynth, path: *const c_char) -> c_int {
    with_synth(handle, |s| sfload_from(s, path))
}

fn sfload_from<B: Backend>(s: &mut Synth<B>, path: *const c_char) -> Result<c_int> {
    s.state().require_synth("sfload")?;
    s.sfload(arg_path(path)?)
}

#[no_mangle]
pub extern "C" fn fluidbind_program_select(
    handle: *mut FluidbindSynth,
    chan: c_int,
    sfont_id: c_int,
    bank: c_int,
    preset: c_int,
) -> c_int {
    with_synth(handle, |s| s.program_select(chan, sfont_id, bank, preset).map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_program_change(handle: *mut FluidbindSynth, chan: c_int, program: c_int) -> c_int {
    with_synth(handle, |s| s.program_change(chan, program).map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_bank_select(handle: *mut FluidbindSynth, chan: c_int, bank: c_int) -> c_int {
    with_synth(handle, |s| s.bank_select(chan, bank).map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_sfont_select(handle: *mut FluidbindSynth, chan: c_int, sfont_id: c_int) -> c_int {
    with_synth(handle, |s| s.sfont_select(chan, sfont_id).map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_program_reset(handle: *mut FluidbindSynth) -> c_int {
    with_synth(handle, |s| s.program_reset().map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_system_reset(handle: *mut FluidbindSynth) -> c_int {
    with_synth(handle, |s| s.system_reset().map(i32::from))
}

// --- Real-time events -------------------------------------------------------------

#[no_mangle]
pub extern "C" fn fluidbind_noteon(handle: *mut FluidbindSynth, chan: c_int, key: c_int, vel: c_int) -> c_int {
    with_synth(handle, |s| s.noteon(chan, key, vel).map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_noteoff(handle: *mut FluidbindSynth, chan: c_int, key: c_int) -> c_int {
    with_synth(handle, |s| s.noteoff(chan, key).map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_pitch_bend(handle: *mut FluidbindSynth, chan: c_int, val: c_int) -> c_int {
    with_synth(handle, |s| s.pitch_bend(chan, val).map(i32::from))
}

#[no_mangle]
pub extern "C" fn fluidbind_cc(handle: *mut FluidbindSynth, chan: c_int, ctrl: c_int, val: c_int) -> c_int {
    with_synth(handle, |s| s.cc(chan, ctrl, val).map(i32::from))
}

// --- Rendering --------------------------------------------------------------------

/// Render `frames` frames of 16-bit stereo into `out` (`out_len` samples,
/// at least `frames * 2`). Returns the number of frames rendered.
#[no_mangle]
pub extern "C" fn fluidbind_write_s16(
    handle: *mut FluidbindSynth,
    frames: c_int,
    out: *mut i16,
    out_len: usize,
) -> c_int {
    with_synth(handle, |s| write_into(s, frames, out, out_len))
}

fn write_into<B: Backend>(s: &mut Synth<B>, frames: c_int, out: *mut i16, out_len: usize) -> Result<c_int> {
    s.state().require_synth("write_s16")?;
    let n = check_frame_count(i64::from(frames), s.config().max_frames_per_call)?;
    if n == 0 {
        return Ok(0);
    }
    let needed = n * CHANNELS;
    if out.is_null() || out_len < needed {
        return Err(Error::InvalidArgument {
            name: "out",
            reason: format!("need {needed} samples, got {out_len}"),
        });
    }
    let buf = unsafe { std::slice::from_raw_parts_mut(out, needed) };
    let written = s.render_into(buf)?;
    Ok(c_int::try_from(written).unwrap_or(c_int::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidbind_engine::testing::RampBackend;

    fn missing_library_handle() -> *mut FluidbindSynth {
        let cfg = CString::new("library = \"/nonexistent/libfluidsynth.so\"").unwrap();
        let h = fluidbind_new(cfg.as_ptr());
        assert!(!h.is_null());
        h
    }

    fn last_error(h: *mut FluidbindSynth) -> String {
        let p = fluidbind_last_error(h);
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
    }

    #[test]
    fn version_is_two() {
        assert_eq!(fluidbind_version(), 2);
    }

    #[test]
    fn null_handle_is_reported() {
        let null = ptr::null_mut();
        assert_eq!(fluidbind_init(null), FLUIDBIND_ERR_NULL);
        assert_eq!(fluidbind_noteon(null, 0, 60, 100), FLUIDBIND_ERR_NULL);
        assert!(fluidbind_last_error(null).is_null());
        fluidbind_free(null);
    }

    #[test]
    fn invalid_config_returns_null() {
        let cfg = CString::new("polyphony = 0").unwrap();
        assert!(fluidbind_new(cfg.as_ptr()).is_null());
    }

    #[test]
    fn events_before_init_are_state_errors() {
        let h = fluidbind_new(ptr::null());
        assert_eq!(fluidbind_noteon(h, 0, 60, 100), FLUIDBIND_ERR_STATE);
        assert!(last_error(h).contains("noteon"));
        let mut buf = [0i16; 8];
        assert_eq!(fluidbind_write_s16(h, 4, buf.as_mut_ptr(), buf.len()), FLUIDBIND_ERR_STATE);
        fluidbind_free(h);
    }

    #[test]
    fn missing_library_is_a_library_error() {
        let h = missing_library_handle();
        assert_eq!(fluidbind_init(h), FLUIDBIND_ERR_LIBRARY);
        assert!(last_error(h).contains("nonexistent"));
        fluidbind_free(h);
    }

    #[test]
    fn stop_twice_succeeds() {
        let h = fluidbind_new(ptr::null());
        assert_eq!(fluidbind_stop(h), SUCCESS);
        assert_eq!(fluidbind_stop(h), SUCCESS);
        assert!(fluidbind_last_error(h).is_null());
        fluidbind_free(h);
    }

    #[test]
    fn state_is_checked_before_arguments() {
        let h = fluidbind_new(ptr::null());
        assert_eq!(fluidbind_write_s16(h, 0, ptr::null_mut(), 0), FLUIDBIND_ERR_STATE);
        assert_eq!(fluidbind_write_s16(h, -1, ptr::null_mut(), 0), FLUIDBIND_ERR_STATE);
        assert_eq!(fluidbind_write_s16(h, 4, ptr::null_mut(), 0), FLUIDBIND_ERR_STATE);
        assert_eq!(fluidbind_sfload(h, ptr::null()), FLUIDBIND_ERR_STATE);
        assert!(last_error(h).contains("sfload"));
        fluidbind_free(h);
    }

    fn ramp_synth(max_frames: usize) -> Synth<RampBackend> {
        let cfg = SynthConfig { max_frames_per_call: max_frames, ..SynthConfig::default() };
        let mut s = Synth::with_backend(RampBackend::default(), cfg);
        s.init().unwrap();
        s
    }

    fn write_code(s: &mut Synth<RampBackend>, frames: c_int, out: *mut i16, out_len: usize) -> c_int {
        write_into(s, frames, out, out_len).unwrap_or_else(|e| error_code(&e))
    }

    #[test]
    fn write_fills_the_caller_buffer() {
        let mut s = ramp_synth(64);
        let mut buf = [7i16; 10];
        assert_eq!(write_code(&mut s, 4, buf.as_mut_ptr(), buf.len()), 4);
        assert_eq!(buf[..8], [0i16, 0, 1, -1, 2, -2, 3, -3]);
        assert_eq!(buf[8..], [7i16, 7]);
        assert_eq!(s.backend().renders(), vec![4]);
    }

    #[test]
    fn zero_frames_after_init_touch_nothing() {
        let mut s = ramp_synth(64);
        assert_eq!(write_code(&mut s, 0, ptr::null_mut(), 0), 0);
        assert!(s.backend().renders().is_empty());
    }

    #[test]
    fn write_rejects_bad_buffers() {
        let mut s = ramp_synth(64);
        assert_eq!(write_code(&mut s, 4, ptr::null_mut(), 8), FLUIDBIND_ERR_ARGUMENT);

        let mut short = [0i16; 7];
        assert_eq!(write_code(&mut s, 4, short.as_mut_ptr(), short.len()), FLUIDBIND_ERR_ARGUMENT);
        assert_eq!(short, [0i16; 7]);
        assert!(s.backend().renders().is_empty());
    }

    #[test]
    fn write_rejects_bad_frame_counts() {
        let mut s = ramp_synth(16);
        let mut buf = [0i16; 64];
        assert_eq!(write_code(&mut s, 17, buf.as_mut_ptr(), buf.len()), FLUIDBIND_ERR_ARGUMENT);
        assert_eq!(write_code(&mut s, -1, buf.as_mut_ptr(), buf.len()), FLUIDBIND_ERR_ARGUMENT);
        assert_eq!(write_code(&mut s, 16, buf.as_mut_ptr(), buf.len()), 16);
        assert_eq!(s.backend().renders(), vec![16]);
    }

    #[test]
    fn null_path_after_init_is_an_argument_error() {
        let mut s = ramp_synth(64);
        let e = sfload_from(&mut s, ptr::null()).unwrap_err();
        assert_eq!(error_code(&e), FLUIDBIND_ERR_ARGUMENT);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_pass_through() {
        use std::os::unix::ffi::OsStrExt;
        let raw = CString::new(b"/tmp/caf\xe9.sf2".to_vec()).unwrap();
        let path = arg_path(raw.as_ptr()).unwrap();
        assert_eq!(path.as_os_str().as_bytes(), b"/tmp/caf\xe9.sf2");

        // reaches the engine, which reports its own failure sentinel
        let mut s = ramp_synth(64);
        assert_eq!(sfload_from(&mut s, raw.as_ptr()).unwrap(), -1);
    }

    #[test]
    fn error_codes_are_distinct() {
        let codes = [
            FLUIDBIND_ERR_NULL,
            FLUIDBIND_ERR_STATE,
            FLUIDBIND_ERR_ARGUMENT,
            FLUIDBIND_ERR_LIBRARY,
            FLUIDBIND_ERR_ENGINE,
            FLUIDBIND_ERR_CONFIG,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a <= -100);
            assert!(codes[i + 1..].iter().all(|b| b != a));
        }
    }
}
