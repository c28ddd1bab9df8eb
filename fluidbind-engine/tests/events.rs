mod common;

use std::io::Write;

use common::MockBackend;
use fluidbind_engine::{Error, Status, Synth, SynthConfig};

fn ready() -> Synth<MockBackend> {
    let mut s = Synth::with_backend(MockBackend::new(), SynthConfig::default());
    s.init().unwrap();
    s
}

#[test]
fn events_before_init_never_reach_the_engine() {
    let mut s = Synth::with_backend(MockBackend::new(), SynthConfig::default());
    assert!(matches!(s.noteon(0, 60, 30), Err(Error::NotInitialized { op: "noteon", .. })));
    assert!(matches!(s.noteoff(0, 60), Err(Error::NotInitialized { .. })));
    assert!(matches!(s.cc(0, 7, 100), Err(Error::NotInitialized { .. })));
    assert!(matches!(s.pitch_bend(0, 8192), Err(Error::NotInitialized { .. })));
    assert!(matches!(s.program_reset(), Err(Error::NotInitialized { .. })));
    assert!(matches!(s.sfload("x.sf2"), Err(Error::NotInitialized { op: "sfload", .. })));
    assert!(matches!(s.write_s16(16), Err(Error::NotInitialized { op: "write_s16", .. })));
    assert!(s.backend().calls().is_empty());
}

#[test]
fn events_after_stop_are_rejected() {
    let mut s = ready();
    s.stop();
    assert!(matches!(s.noteon(0, 60, 30), Err(Error::NotInitialized { .. })));
}

#[test]
fn in_range_notes_succeed() {
    let mut s = ready();
    for chan in 0..16 {
        for key in [0, 60, 127] {
            assert_eq!(s.noteon(chan, key, 100).unwrap(), Status::OK);
            assert_eq!(s.noteoff(chan, key).unwrap(), Status::OK);
        }
    }
}

#[test]
fn out_of_range_values_are_forwarded_unchanged() {
    let mut s = ready();
    assert!(s.noteon(16, 60, 30).unwrap().is_failed());
    assert!(s.noteon(0, 200, 30).unwrap().is_failed());
    assert!(s.noteoff(-1, 60).unwrap().is_failed());
    let calls = s.backend().calls();
    assert!(calls.contains(&"noteon 16 60 30".to_string()));
    assert!(calls.contains(&"noteon 0 200 30".to_string()));
    assert!(calls.contains(&"noteoff -1 60".to_string()));
}

#[test]
fn controls_pass_arguments_through() {
    let mut s = ready();
    assert!(s.pitch_bend(1, 16383).unwrap().is_ok());
    assert!(s.cc(2, 64, 127).unwrap().is_ok());
    assert!(s.program_change(3, 40).unwrap().is_ok());
    assert!(s.bank_select(4, 128).unwrap().is_ok());
    assert!(s.sfont_select(5, 1).unwrap().is_ok());
    assert!(s.program_reset().unwrap().is_ok());
    assert!(s.system_reset().unwrap().is_ok());
    let calls = s.backend().calls();
    for expected in [
        "pitch_bend 1 16383",
        "cc 2 64 127",
        "program_change 3 40",
        "bank_select 4 128",
        "sfont_select 5 1",
        "program_reset",
        "system_reset",
    ] {
        assert!(calls.iter().any(|c| c == expected), "missing {expected}");
    }
}

#[test]
fn sfload_missing_file_returns_failure_sentinel() {
    let mut s = ready();
    let id = s.sfload("/nonexistent/example.sf2").unwrap();
    assert_eq!(id, -1);
}

#[test]
fn sfload_and_program_select() {
    let mut f = tempfile::Builder::new().suffix(".sf2").tempfile().unwrap();
    f.write_all(b"RIFF").unwrap();
    let mut s = ready();
    let id = s.sfload(f.path()).unwrap();
    assert_eq!(id, 1);
    assert!(s.program_select(0, id, 0, 0).unwrap().is_ok());
    assert!(s.program_select(0, 99, 0, 0).unwrap().is_failed());
    let expected = format!("sfload {} 0", f.path().display());
    assert!(s.backend().calls().contains(&expected));
}

#[test]
fn sfload_honors_reset_presets_option() {
    let cfg = SynthConfig {
        reset_presets_on_load: true,
        ..SynthConfig::default()
    };
    let mut s = Synth::with_backend(MockBackend::new(), cfg);
    s.init().unwrap();
    s.sfload("/nonexistent/a.sf2").unwrap();
    assert!(s
        .backend()
        .calls()
        .contains(&"sfload /nonexistent/a.sf2 1".to_string()));
}

#[test]
fn sfload_rejects_interior_nul() {
    let mut s = ready();
    let err = s.sfload("bad\0.sf2").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { name: "path", .. }));
    assert!(!s.backend().calls().iter().any(|c| c.starts_with("sfload")));
}

#[test]
fn events_work_while_started() {
    let mut s = ready();
    s.start().unwrap();
    assert!(s.noteon(0, 60, 30).unwrap().is_ok());
    assert!(s.noteoff(0, 60).unwrap().is_ok());
}
