// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Present ids and the fences that ride along with them.
//!
//! [`PresentRegistry`] hands out present ids per session and keeps the
//! [`FenceSet`] of every present whose buffers may still be read. Fence sets
//! live in one map keyed by `(session, present)`, so every sweep visits them
//! in present-id order.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::fence::{FenceSet, ReleaseFence};
use crate::session::{PresentId, SchedulingIdPair, SessionId};

/// Assigns present ids and owns outstanding release fences.
#[derive(Debug, Default)]
pub struct PresentRegistry {
    last_ids: BTreeMap<SessionId, PresentId>,
    retired_through: BTreeMap<SessionId, PresentId>,
    fences: BTreeMap<(SessionId, PresentId), FenceSet>,
}

impl PresentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a present for `session_id` and takes ownership of its
    /// fences. Unknown sessions start at [`PresentId::FIRST`].
    pub fn register_present(
        &mut self,
        session_id: SessionId,
        release_fences: Vec<Box<dyn ReleaseFence>>,
    ) -> PresentId {
        let id = self
            .last_ids
            .get(&session_id)
            .map_or(PresentId::FIRST, |last| last.next());
        self.last_ids.insert(session_id, id);
        self.fences
            .insert((session_id, id), FenceSet::new(release_fences));
        log::trace!("registered {session_id}/{id}");
        id
    }

    /// Returns `true` if `pair` was handed out by
    /// [`register_present`](Self::register_present) and its session has not
    /// been removed since.
    #[must_use]
    pub fn is_registered(&self, pair: SchedulingIdPair) -> bool {
        let floor = self
            .retired_through
            .get(&pair.session_id)
            .map_or(PresentId(0), |id| *id);
        self.last_ids
            .get(&pair.session_id)
            .is_some_and(|last| pair.present_id > floor && pair.present_id <= *last)
    }

    /// The most recent id registered for `session_id`.
    #[must_use]
    pub fn last_present_id(&self, session_id: SessionId) -> Option<PresentId> {
        self.last_ids.get(&session_id).copied()
    }

    /// Removes and returns the fences of a present. `None` if they were
    /// already taken or signaled.
    pub fn take_fences(&mut self, session_id: SessionId, present_id: PresentId) -> Option<FenceSet> {
        self.fences.remove(&(session_id, present_id))
    }

    /// Signals every outstanding fence set of `session_id` older than
    /// `latest`, in present-id order. Returns how many sets were signaled.
    pub fn signal_superseded(&mut self, session_id: SessionId, latest: PresentId) -> usize {
        let keys: Vec<_> = self
            .fences
            .range((session_id, PresentId(0))..(session_id, latest))
            .map(|(key, _)| *key)
            .collect();
        self.signal_keys(&keys)
    }

    /// Signals every outstanding fence set of `session_id` and forgets it.
    ///
    /// The id counter is kept, so a session that comes back continues where
    /// it left off instead of reusing ids. Every id handed out so far is
    /// retired and no longer counts as registered.
    pub fn remove_session(&mut self, session_id: SessionId) -> usize {
        if let Some(&last) = self.last_ids.get(&session_id) {
            self.retired_through.insert(session_id, last);
        }
        let keys: Vec<_> = self
            .fences
            .range((session_id, PresentId(0))..=(session_id, PresentId(u64::MAX)))
            .map(|(key, _)| *key)
            .collect();
        self.signal_keys(&keys)
    }

    /// Signals everything still outstanding, in `(session, present)` order.
    pub fn signal_all(&mut self) -> usize {
        let fences = core::mem::take(&mut self.fences);
        let count = fences.len();
        for set in fences.into_values() {
            set.signal();
        }
        count
    }

    /// Number of presents whose fences have not been signaled or taken.
    #[must_use]
    pub fn outstanding_fence_sets(&self) -> usize {
        self.fences.len()
    }

    fn signal_keys(&mut self, keys: &[(SessionId, PresentId)]) -> usize {
        let mut count = 0;
        for key in keys {
            if let Some(set) = self.fences.remove(key) {
                log::trace!("releasing {}/{}", key.0, key.1);
                set.signal();
                count += 1;
            }
        }
        count
    }
}
