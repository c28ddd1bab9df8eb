// python/src/lib.rs

//! Python bindings for FluidSynth.
//!
//! Built as the extension module `pyfluidsynth` with `pyo3`. Two surfaces:
//!
//! - the flat module functions (`init`, `start`, `noteon`, `write_s16`, ...),
//!   backed by one process-wide default synthesizer;
//! - a `Synth` class for independent instances.
//!
//! ```python
//! import pyfluidsynth as fl
//!
//! fl.init()
//! sf = fl.sfload("example.sf2")
//! fl.program_select(0, sf, 0, 0)
//! fl.noteon(0, 60, 30)
//! pcm = fl.write_s16(44100)      # bytes, 4 per frame
//! fl.noteoff(0, 60)
//! fl.stop()
//! ```
//!
//! Argument type/arity errors raise `TypeError`/`OverflowError` from pyo3's
//! extraction before anything reaches the engine. Binding errors raise
//! `ValueError` (bad values, bad config) or `FluidSynthError` (lifecycle,
//! library loading).
//! Engine failures come back as negative integers, never as exceptions.

use std::path::PathBuf;

use fluidbind_engine::{Error, Status, Synth, SynthConfig, BINDING_API_VERSION, SUCCESS};
use parking_lot::Mutex;
use pyo3::create_exception;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyTuple};

create_exception!(pyfluidsynth, FluidSynthError, PyRuntimeError);

fn to_py_err(e: Error) -> PyErr {
    if e.is_argument_error() || matches!(e, Error::Config(_)) {
        PyValueError::new_err(e.to_string())
    } else {
        FluidSynthError::new_err(e.to_string())
    }
}

// ----------------------------- Default synthesizer ------------------------------

static DEFAULT: Mutex<Option<Synth>> = parking_lot::const_mutex(None);

fn with_default<T>(f: impl FnOnce(&mut Synth) -> fluidbind_engine::Result<T>) -> PyResult<T> {
    let mut guard = DEFAULT.lock();
    let synth = guard.get_or_insert_with(|| Synth::new(SynthConfig::from_env()));
    f(synth).map_err(to_py_err)
}

/// API version number of the bindings (2: `init()` then optionally `start()`).
#[pyfunction]
fn version() -> i32 {
    BINDING_API_VERSION
}

/// Init fluidsynth. `config` is an optional path to a TOML synth config.
#[pyfunction]
#[pyo3(signature = (config=None))]
fn init(config: Option<PathBuf>) -> PyResult<i32> {
    if let Some(path) = config {
        let cfg = SynthConfig::load(&path).map_err(to_py_err)?;
        let mut guard = DEFAULT.lock();
        if let Some(current) = guard.as_ref() {
            // never drop a live synthesizer behind the caller's back
            current.state().on_init().map_err(to_py_err)?;
        }
        *guard = Some(Synth::new(cfg));
    }
    with_default(|s| s.init().map(|()| SUCCESS))
}

/// Start fluidsynth audio driver.
#[pyfunction]
fn start() -> PyResult<i32> {
    with_default(|s| s.start().map(|()| SUCCESS))
}

/// Stop fluidsynth. Safe to call more than once.
#[pyfunction]
fn stop() -> i32 {
    if let Some(s) = DEFAULT.lock().as_mut() {
        s.stop();
    }
    SUCCESS
}

/// Load soundfont. Returns its id, or a negative value on failure.
#[pyfunction]
fn sfload(path: PathBuf) -> PyResult<i32> {
    with_default(|s| s.sfload(&path))
}

/// Select program.
#[pyfunction]
fn program_select(chan: i32, sfont_id: i32, bank: i32, preset: i32) -> PyResult<i32> {
    with_default(|s| s.program_select(chan, sfont_id, bank, preset).map(i32::from))
}

/// Start note.
#[pyfunction]
fn noteon(chan: i32, key: i32, vel: i32) -> PyResult<i32> {
    with_default(|s| s.noteon(chan, key, vel).map(i32::from))
}

/// Stop note.
#[pyfunction]
fn noteoff(chan: i32, key: i32) -> PyResult<i32> {
    with_default(|s| s.noteoff(chan, key).map(i32::from))
}

/// Pitch bend.
#[pyfunction]
fn pitch_bend(chan: i32, val: i32) -> PyResult<i32> {
    with_default(|s| s.pitch_bend(chan, val).map(i32::from))
}

/// Control change.
#[pyfunction]
fn cc(chan: i32, ctrl: i32, val: i32) -> PyResult<i32> {
    with_default(|s| s.cc(chan, ctrl, val).map(i32::from))
}

/// Program change.
#[pyfunction]
fn program_change(chan: i32, program: i32) -> PyResult<i32> {
    with_default(|s| s.program_change(chan, program).map(i32::from))
}

/// Bank select.
#[pyfunction]
fn bank_select(chan: i32, bank: i32) -> PyResult<i32> {
    with_default(|s| s.bank_select(chan, bank).map(i32::from))
}

/// SoundFont select.
#[pyfunction]
fn sfont_select(chan: i32, sfont_id: i32) -> PyResult<i32> {
    with_default(|s| s.sfont_select(chan, sfont_id).map(i32::from))
}

/// Program reset.
#[pyfunction]
fn program_reset() -> PyResult<i32> {
    with_default(|s| s.program_reset().map(i32::from))
}

/// System reset.
#[pyfunction]
fn system_reset() -> PyResult<i32> {
    with_default(|s| s.system_reset().map(i32::from))
}

/// Get samples: `frames` stereo 16-bit frames as bytes (4 per frame).
#[pyfunction]
fn write_s16(py: Python<'_>, frames: i64) -> PyResult<Bound<'_, PyBytes>> {
    let bytes = py.allow_threads(|| with_default(|s| s.write_s16(frames)))?;
    Ok(PyBytes::new_bound(py, &bytes))
}

// ----------------------------- Python class -------------------------------------

/// Independent synthesizer instance.
///
/// ```python
/// from pyfluidsynth import Synth
///
/// with Synth() as s:
///     s.init()
///     sf = s.sfload("example.sf2")
///     s.program_select(0, sf, 0, 0)
///     s.noteon(0, 60, 100)
///     block = s.write_s16(1024)
/// ```
#[pyclass(name = "Synth", module = "pyfluidsynth")]
pub struct PySynth {
    inner: Synth,
}

#[pymethods]
impl PySynth {
    /// Args:
    ///     config (str | None): TOML synth config text.
    ///     library (str | None): path to the FluidSynth shared library.
    #[new]
    #[pyo3(signature = (config=None, library=None))]
    fn new(config: Option<&str>, library: Option<PathBuf>) -> PyResult<Self> {
        let mut cfg = match config {
            Some(text) => SynthConfig::from_toml_str(text).map_err(to_py_err)?,
            None => SynthConfig::default(),
        }
        .with_env_overrides();
        if library.is_some() {
            cfg.library = library;
        }
        Ok(Self { inner: Synth::new(cfg) })
    }

    #[staticmethod]
    fn version() -> i32 {
        BINDING_API_VERSION
    }

    /// Lifecycle state: "uninitialized", "initialized", "started" or "stopped".
    #[getter]
    fn state(&self) -> &'static str {
        self.inner.state().as_str()
    }

    /// FluidSynth runtime version, available after `init()`.
    fn engine_version(&self) -> Option<String> {
        self.inner.engine_version()
    }

    fn init(&mut self) -> PyResult<i32> {
        self.inner.init().map(|()| SUCCESS).map_err(to_py_err)
    }

    fn start(&mut self) -> PyResult<i32> {
        self.inner.start().map(|()| SUCCESS).map_err(to_py_err)
    }

    fn stop(&mut self) -> i32 {
        self.inner.stop();
        SUCCESS
    }

    fn sfload(&mut self, path: PathBuf) -> PyResult<i32> {
        self.inner.sfload(&path).map_err(to_py_err)
    }

    fn program_select(&mut self, chan: i32, sfont_id: i32, bank: i32, preset: i32) -> PyResult<i32> {
        self.inner
            .program_select(chan, sfont_id, bank, preset)
            .map(i32::from)
            .map_err(to_py_err)
    }

    fn noteon(&mut self, chan: i32, key: i32, vel: i32) -> PyResult<i32> {
        self.inner.noteon(chan, key, vel).map(i32::from).map_err(to_py_err)
    }

    fn noteoff(&mut self, chan: i32, key: i32) -> PyResult<i32> {
        self.inner.noteoff(chan, key).map(i32::from).map_err(to_py_err)
    }

    fn pitch_bend(&mut self, chan: i32, val: i32) -> PyResult<i32> {
        self.inner.pitch_bend(chan, val).map(i32::from).map_err(to_py_err)
    }

    fn cc(&mut self, chan: i32, ctrl: i32, val: i32) -> PyResult<i32> {
        self.inner.cc(chan, ctrl, val).map(i32::from).map_err(to_py_err)
    }

    fn program_change(&mut self, chan: i32, program: i32) -> PyResult<i32> {
        self.inner.program_change(chan, program).map(i32::from).map_err(to_py_err)
    }

    fn bank_select(&mut self, chan: i32, bank: i32) -> PyResult<i32> {
        self.inner.bank_select(chan, bank).map(i32::from).map_err(to_py_err)
    }

    fn sfont_select(&mut self, chan: i32, sfont_id: i32) -> PyResult<i32> {
        self.inner.sfont_select(chan, sfont_id).map(i32::from).map_err(to_py_err)
    }

    fn program_reset(&mut self) -> PyResult<i32> {
        self.inner.program_reset().map(i32::from).map_err(to_py_err)
    }

    fn system_reset(&mut self) -> PyResult<i32> {
        self.inner.system_reset().map(i32::from).map_err(to_py_err)
    }

    fn write_s16<'py>(&mut self, py: Python<'py>, frames: i64) -> PyResult<Bound<'py, PyBytes>> {
        let inner = &mut self.inner;
        let bytes = py.allow_threads(|| inner.write_s16(frames)).map_err(to_py_err)?;
        Ok(PyBytes::new_bound(py, &bytes))
    }

    fn __enter__(slf: PyRefMut<'_, Self>) -> PyRefMut<'_, Self> {
        slf
    }

    #[pyo3(signature = (*_args))]
    fn __exit__(&mut self, _args: &Bound<'_, PyTuple>) -> bool {
        self.inner.stop();
        false
    }
}

// ----------------------------- Module init ---------------------------------------

#[pymodule]
fn pyfluidsynth(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(init, m)?)?;
    m.add_function(wrap_pyfunction!(start, m)?)?;
    m.add_function(wrap_pyfunction!(stop, m)?)?;
    m.add_function(wrap_pyfunction!(sfload, m)?)?;
    m.add_function(wrap_pyfunction!(program_select, m)?)?;
    m.add_function(wrap_pyfunction!(noteon, m)?)?;
    m.add_function(wrap_pyfunction!(noteoff, m)?)?;
    m.add_function(wrap_pyfunction!(pitch_bend, m)?)?;
    m.add_function(wrap_pyfunction!(cc, m)?)?;
    m.add_function(wrap_pyfunction!(program_change, m)?)?;
    m.add_function(wrap_pyfunction!(bank_select, m)?)?;
    m.add_function(wrap_pyfunction!(sfont_select, m)?)?;
    m.add_function(wrap_pyfunction!(program_reset, m)?)?;
    m.add_function(wrap_pyfunction!(system_reset, m)?)?;
    m.add_function(wrap_pyfunction!(write_s16, m)?)?;
    m.add_class::<PySynth>()?;
    m.add("FluidSynthError", m.py().get_type_bound::<FluidSynthError>())?;
    m.add("FLUID_OK", Status::OK.code())?;
    m.add("FLUID_FAILED", Status::FAILED.code())?;

    // Release the default synthesizer's driver and handles at interpreter exit.
    let atexit = m.py().import_bound("atexit")?;
    atexit.call_method1("register", (m.getattr("stop")?,))?;
    Ok(())
}
