// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Latched presents waiting for, or riding in, a render.

use crate::session::{PresentId, SessionId};
use crate::time::HostTime;
use crate::updater::LatchedTimes;

/// The presents that will be reported together when a frame is shown.
///
/// Every entry keeps the time it was latched. Records are merged when a
/// frame could not be rendered yet, so one record can hold presents latched
/// at several different times.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LatchRecord {
    entries: LatchedTimes,
}

impl LatchRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a present was latched at `latched_at`. An entry that is
    /// already present keeps its original time.
    pub fn insert(&mut self, session_id: SessionId, present_id: PresentId, latched_at: HostTime) {
        self.entries
            .entry(session_id)
            .or_default()
            .entry(present_id)
            .or_insert(latched_at);
    }

    /// Moves every entry of `other` into `self`.
    pub fn merge(&mut self, other: Self) {
        for (session_id, presents) in other.entries {
            for (present_id, latched_at) in presents {
                self.insert(session_id, present_id, latched_at);
            }
        }
    }

    /// Drops a session's entries. Returns how many were dropped.
    pub fn remove_session(&mut self, session_id: SessionId) -> usize {
        self.entries.remove(&session_id).map_or(0, |p| p.len())
    }

    /// Highest latched present of a session.
    #[must_use]
    pub fn latest(&self, session_id: SessionId) -> Option<PresentId> {
        self.entries
            .get(&session_id)
            .and_then(|p| p.last_key_value())
            .map(|(id, _)| *id)
    }

    /// Sessions with at least one entry, in id order.
    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.entries.keys().copied()
    }

    /// Total number of latched presents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(|p| p.len()).sum()
    }

    /// Returns `true` if nothing is latched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The per-session latch times, as reported to session updaters.
    #[must_use]
    pub fn latched_times(&self) -> &LatchedTimes {
        &self.entries
    }
}
