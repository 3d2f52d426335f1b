// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! POSIX host clock reads.

use cadence_core::clock::Clock;
use cadence_core::time::HostTime;
use rustix::time::{ClockId, Timespec, clock_gettime};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// A [`Clock`] backed by `clock_gettime`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PosixClock {
    id: ClockId,
}

impl Default for PosixClock {
    fn default() -> Self {
        Self::monotonic()
    }
}

impl PosixClock {
    /// `CLOCK_MONOTONIC`, the clock display drivers usually timestamp vsyncs
    /// with.
    #[must_use]
    pub const fn monotonic() -> Self {
        Self {
            id: ClockId::Monotonic,
        }
    }

    /// A specific POSIX clock, e.g. the one a presentation-feedback protocol
    /// advertises.
    #[must_use]
    pub const fn new(id: ClockId) -> Self {
        Self { id }
    }

    /// The underlying clock id.
    #[must_use]
    pub const fn id(self) -> ClockId {
        self.id
    }
}

impl Clock for PosixClock {
    fn now(&self) -> HostTime {
        timespec_to_host_time(clock_gettime(self.id))
    }
}

/// Returns the current monotonic host time in nanoseconds.
#[must_use]
pub fn now() -> HostTime {
    PosixClock::monotonic().now()
}

pub(crate) fn timespec_to_host_time(timespec: Timespec) -> HostTime {
    let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(timespec.tv_nsec)
        .unwrap_or(0)
        .min(999_999_999);

    let total = u128::from(seconds)
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(u128::from(nanos));
    HostTime(u64::try_from(total).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic_non_decreasing() {
        let first = now();
        let second = now();
        assert!(second >= first, "monotonic clock should not go backwards");
    }

    #[test]
    fn explicit_clock_id_is_usable() {
        let clock = PosixClock::new(ClockId::Monotonic);
        assert_eq!(clock, PosixClock::default());
        assert!(clock.now().nanos() > 0, "monotonic time should be positive");
    }

    #[test]
    fn timespec_conversion_builds_nanoseconds() {
        let input = Timespec {
            tv_sec: 12,
            tv_nsec: 345_678_901,
        };
        assert_eq!(
            timespec_to_host_time(input),
            HostTime(12 * 1_000_000_000 + 345_678_901)
        );
    }

    #[test]
    fn timespec_conversion_saturates_on_large_values() {
        let input = Timespec {
            tv_sec: i64::MAX,
            tv_nsec: 999_999_999,
        };
        assert_eq!(timespec_to_host_time(input), HostTime(u64::MAX));
    }

    #[test]
    fn negative_timespec_clamps_to_zero() {
        let input = Timespec {
            tv_sec: -5,
            tv_nsec: -1,
        };
        assert_eq!(timespec_to_host_time(input), HostTime(0));
    }
}
