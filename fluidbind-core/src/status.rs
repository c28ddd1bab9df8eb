//! Engine status codes.
//!
//! FluidSynth reports success/failure of most calls as a plain `int`. The
//! binding passes that value back untouched; `Status` only adds names.

use core::fmt;

/// FluidSynth's success value.
pub const FLUID_OK: i32 = 0;
/// FluidSynth's generic failure value.
pub const FLUID_FAILED: i32 = -1;

/// Raw status code returned by an engine call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    pub const OK: Status = Status(FLUID_OK);
    pub const FAILED: Status = Status(FLUID_FAILED);

    #[inline]
    pub fn code(self) -> i32 {
        self.0
    }

    /// Zero or positive codes are success (soundfont ids are positive).
    #[inline]
    pub fn is_ok(self) -> bool {
        self.0 >= FLUID_OK
    }

    #[inline]
    pub fn is_failed(self) -> bool {
        !self.is_ok()
    }
}

impl From<i32> for Status {
    #[inline]
    fn from(code: i32) -> Self {
        Status(code)
    }
}

impl From<Status> for i32 {
    #[inline]
    fn from(s: Status) -> Self {
        s.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "ok ({})", self.0)
        } else {
            write!(f, "failed ({})", self.0)
        }
    }
}
