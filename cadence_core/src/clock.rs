// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sources of "now".
//!
//! The scheduler never reads a platform clock directly. It asks a [`Clock`],
//! which a backend implements over the host's monotonic clock and tests
//! implement with a [`ManualClock`] they advance by hand.

use core::cell::Cell;

use crate::time::{Duration, HostTime};

/// A monotonic time source.
pub trait Clock {
    /// Returns the current host time. Successive calls never go backwards.
    fn now(&self) -> HostTime;
}

/// A clock that only moves when told to.
///
/// Shared through an `Rc` between the code that advances it and the
/// scheduler that reads it.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<HostTime>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub const fn new(start: HostTime) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Moves the clock forward by `d`, saturating at [`HostTime::MAX`].
    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get().saturating_add(d));
    }

    /// Moves the clock to `t`. Times earlier than the current reading are
    /// ignored so the clock stays monotonic.
    pub fn set(&self, t: HostTime) {
        if t > self.now.get() {
            self.now.set(t);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HostTime {
        self.now.get()
    }
}
