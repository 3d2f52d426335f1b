// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display refresh timing.
//!
//! [`VsyncTiming`] remembers the last vsync the display reported and the
//! current refresh interval, and extrapolates the vsync grid from them. It
//! is a pure predictor: something outside the scheduler (a display driver
//! callback, a test) writes observations into it through `&self`, which is
//! why it is shared as an `Rc<VsyncTiming>` and stores its state in cells.
//!
//! The grid is `last_vsync_time + k * vsync_interval` for every integer `k`,
//! so predictions work for times before the last observed vsync too.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use crate::clock::Clock;
use crate::time::{Duration, HostTime};

/// The 60 Hz refresh interval, rounded down to whole nanoseconds.
pub const DEFAULT_VSYNC_INTERVAL: Duration = Duration(16_666_666);

/// Last observed vsync and the current refresh interval.
pub struct VsyncTiming {
    clock: Rc<dyn Clock>,
    last_vsync_time: Cell<HostTime>,
    vsync_interval: Cell<Duration>,
}

impl fmt::Debug for VsyncTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsyncTiming")
            .field("last_vsync_time", &self.last_vsync_time.get())
            .field("vsync_interval", &self.vsync_interval.get())
            .finish_non_exhaustive()
    }
}

impl VsyncTiming {
    /// Creates timing state anchored at `last_vsync_time`.
    #[must_use]
    pub fn new(clock: Rc<dyn Clock>, last_vsync_time: HostTime, vsync_interval: Duration) -> Self {
        Self {
            clock,
            last_vsync_time: Cell::new(last_vsync_time),
            vsync_interval: Cell::new(vsync_interval),
        }
    }

    /// Current host time according to the shared clock.
    #[inline]
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.clock.now()
    }

    /// The most recent vsync reported by the display.
    #[inline]
    #[must_use]
    pub fn last_vsync_time(&self) -> HostTime {
        self.last_vsync_time.get()
    }

    /// The current refresh interval.
    #[inline]
    #[must_use]
    pub fn vsync_interval(&self) -> Duration {
        self.vsync_interval.get()
    }

    /// Records a new refresh interval, e.g. after a mode switch.
    pub fn set_vsync_interval(&self, interval: Duration) {
        log::debug!("vsync interval set to {}ns", interval.nanos());
        self.vsync_interval.set(interval);
    }

    /// Records the time of an observed vsync.
    pub fn set_last_vsync_time(&self, t: HostTime) {
        self.last_vsync_time.set(t);
    }

    /// Returns the earliest vsync on the grid that is both strictly after
    /// [`now`](Self::now) and at or after `t`.
    ///
    /// With a zero interval there is no grid and the result is
    /// `max(t, now + 1ns)`.
    #[must_use]
    pub fn predicted_vsync_at_or_after(&self, t: HostTime) -> HostTime {
        let lower = t.max(self.now().saturating_add(Duration(1)));
        grid_at_or_after(self.last_vsync_time(), self.vsync_interval(), lower)
    }
}

/// Smallest `anchor + k * interval` (any integer `k`) that is `>= lower`.
fn grid_at_or_after(anchor: HostTime, interval: Duration, lower: HostTime) -> HostTime {
    if interval.is_zero() {
        return lower;
    }
    let step = interval.nanos();
    if lower >= anchor {
        let k = (lower - anchor).nanos().div_ceil(step);
        anchor.saturating_add(Duration(k.saturating_mul(step)))
    } else {
        let m = (anchor - lower).nanos() / step;
        anchor - Duration(m * step)
    }
}
