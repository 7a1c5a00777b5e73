//! Wall-clock collaborator.
//!
//! The reading assembler stamps every `MeterReading` with a time taken from
//! a `Clock` so that tests can inject a fixed instant instead of the host
//! clock.

use chrono::NaiveDateTime;

/// Source of the read-cycle timestamp.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock pinned to a fixed instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
