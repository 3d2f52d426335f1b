// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers for producers, their presents, and rendered frames.

use core::fmt;

use crate::time::HostTime;

/// Identifies a producer session. Chosen by the caller.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(pub u64);

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {}", self.0)
    }
}

/// Identifies one present of a session.
///
/// Assigned by the present registry: the first present of a session is `1`
/// and each later one is exactly one more.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PresentId(pub u64);

impl PresentId {
    /// The id given to a session's first present.
    pub const FIRST: Self = Self(1);

    /// The id following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for PresentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PresentId({})", self.0)
    }
}

impl fmt::Display for PresentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "present {}", self.0)
    }
}

/// A present, fully qualified by its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchedulingIdPair {
    /// Owning session.
    pub session_id: SessionId,
    /// Present within the session.
    pub present_id: PresentId,
}

impl SchedulingIdPair {
    /// Pairs a session with one of its presents.
    #[inline]
    #[must_use]
    pub const fn new(session_id: SessionId, present_id: PresentId) -> Self {
        Self {
            session_id,
            present_id,
        }
    }
}

impl fmt::Display for SchedulingIdPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.present_id)
    }
}

/// Counts renders started by a scheduler. The first render is frame `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameNumber(pub u64);

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A present waiting for its requested presentation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingPresent {
    /// Which present.
    pub id: SchedulingIdPair,
    /// The earliest time the producer wants it on screen.
    pub requested_presentation_time: HostTime,
}
