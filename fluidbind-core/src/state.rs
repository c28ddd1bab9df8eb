//! Synthesizer lifecycle state machine.
//!
//! ```text
//! Uninitialized --init--> Initialized --start--> Started
//!       |                      |                    |
//!       +--------stop----------+--------stop--------+--> Stopped --init--> Initialized
//! ```
//!
//! `stop` is accepted from every state and is a no-op once stopped.

use core::fmt;

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Uninitialized,
    Initialized,
    Started,
    Stopped,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::Initialized => "initialized",
            State::Started => "started",
            State::Stopped => "stopped",
        }
    }

    /// Whether a synthesizer handle exists in this state.
    #[inline]
    pub fn has_synth(self) -> bool {
        matches!(self, State::Initialized | State::Started)
    }

    /// Guard for every operation that forwards to the synthesizer.
    #[inline]
    pub fn require_synth(self, op: &'static str) -> Result<()> {
        if self.has_synth() {
            Ok(())
        } else {
            Err(Error::NotInitialized { op, state: self })
        }
    }

    /// Next state after a successful `init`.
    pub fn on_init(self) -> Result<State> {
        match self {
            State::Uninitialized | State::Stopped => Ok(State::Initialized),
            State::Initialized | State::Started => Err(Error::InvalidState { op: "init", state: self }),
        }
    }

    /// Next state after a successful `start`.
    pub fn on_start(self) -> Result<State> {
        match self {
            State::Initialized => Ok(State::Started),
            State::Started => Err(Error::InvalidState { op: "start", state: self }),
            State::Uninitialized | State::Stopped => {
                Err(Error::NotInitialized { op: "start", state: self })
            }
        }
    }

    #[inline]
    pub fn on_stop(self) -> State {
        State::Stopped
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let s = State::default();
        let s = s.on_init().unwrap();
        assert_eq!(s, State::Initialized);
        let s = s.on_start().unwrap();
        assert_eq!(s, State::Started);
        assert!(s.require_synth("noteon").is_ok());
        assert_eq!(s.on_stop(), State::Stopped);
    }

    #[test]
    fn events_need_a_synth() {
        for s in [State::Uninitialized, State::Stopped] {
            let err = s.require_synth("cc").unwrap_err();
            assert!(matches!(err, Error::NotInitialized { op: "cc", .. }));
        }
    }

    #[test]
    fn double_init_and_double_start_are_rejected() {
        assert!(matches!(
            State::Initialized.on_init(),
            Err(Error::InvalidState { op: "init", .. })
        ));
        assert!(matches!(
            State::Started.on_start(),
            Err(Error::InvalidState { op: "start", .. })
        ));
        assert!(matches!(
            State::Uninitialized.on_start(),
            Err(Error::NotInitialized { op: "start", .. })
        ));
    }

    #[test]
    fn stop_is_idempotent_and_reinit_is_allowed() {
        let s = State::Stopped.on_stop();
        assert_eq!(s, State::Stopped);
        assert_eq!(s.on_init().unwrap(), State::Initialized);
    }
}
