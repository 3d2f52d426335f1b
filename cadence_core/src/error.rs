// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduler errors.
//!
//! These only report misuse by the scheduler's owner. Failed updates,
//! dropped frames, and rejected renders are part of normal operation and are
//! handled without surfacing an error.

use crate::session::{FrameNumber, PresentId, SchedulingIdPair};

/// A caller broke the scheduler's contract. The scheduler state is left as
/// it was before the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The present id was never handed out by `register_present`.
    #[error("{0} was never registered")]
    UnregisteredPresent(SchedulingIdPair),
    /// The present is not newer than one already scheduled for its session.
    #[error("{id} is not newer than {last_scheduled}, already scheduled for its session")]
    OutOfOrderPresent {
        /// The rejected present.
        id: SchedulingIdPair,
        /// The last present scheduled for the same session.
        last_scheduled: PresentId,
    },
    /// A render outcome was reported for a frame that is not in flight.
    #[error("frame {0} is not in flight")]
    UnknownFrame(FrameNumber),
}
