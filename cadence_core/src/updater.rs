// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Session updaters: the code that applies latched presents to the scene.
//!
//! The scheduler does not own its updaters. It holds them weakly in an
//! [`UpdaterSet`], so an updater disappears from the set when its owner drops
//! the last `Rc`. Dispatch works on a snapshot of weak handles taken before
//! the first call, and each handle is upgraded just before its own call:
//!
//! - an updater added while a dispatch is running is not called in that pass,
//! - an updater dropped by an earlier updater in the same pass is skipped.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::session::{PresentId, SessionId};
use crate::time::HostTime;

/// Latched presents per session, with the time each one was latched.
pub type LatchedTimes = BTreeMap<SessionId, BTreeMap<PresentId, HostTime>>;

/// What a session updater reports back from
/// [`update_sessions`](SessionUpdater::update_sessions).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateResults {
    /// Sessions whose update could not be applied.
    pub sessions_with_failed_updates: BTreeSet<SessionId>,
}

/// Applies latched presents and hears about presented frames.
///
/// Both methods take `&self`: an updater may be re-entered or dropped by
/// another updater while the scheduler is dispatching, so implementations
/// keep their mutable state in cells.
pub trait SessionUpdater {
    /// Applies, for every session in the map, all presents up to and
    /// including the given id.
    ///
    /// `trace_id` identifies the frame for cross-component tracing.
    fn update_sessions(
        &self,
        sessions_to_update: &BTreeMap<SessionId, PresentId>,
        trace_id: u64,
    ) -> UpdateResults;

    /// Reports a frame that reached the display.
    ///
    /// `latched_times` holds every present the frame carried, including
    /// those latched for earlier attempts that were dropped.
    fn on_frame_presented(&self, latched_times: &LatchedTimes, presented_time: HostTime);
}

/// A shared, weakly-holding list of [`SessionUpdater`]s.
///
/// Cloning the set clones the handle, not the list. An updater that wants to
/// register another updater from inside a callback keeps a clone.
#[derive(Clone, Default)]
pub struct UpdaterSet {
    updaters: Rc<RefCell<Vec<Weak<dyn SessionUpdater>>>>,
}

impl fmt::Debug for UpdaterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdaterSet")
            .field("live", &self.live_count())
            .finish()
    }
}

impl UpdaterSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an updater. The set only keeps a weak handle.
    pub fn add<U: SessionUpdater + 'static>(&self, updater: &Rc<U>) {
        let updater: Rc<dyn SessionUpdater> = updater.clone();
        self.add_dyn(&updater);
    }

    /// Adds an already type-erased updater.
    pub fn add_dyn(&self, updater: &Rc<dyn SessionUpdater>) {
        self.updaters.borrow_mut().push(Rc::downgrade(updater));
    }

    /// Number of updaters that are still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.updaters
            .borrow()
            .iter()
            .filter(|u| u.strong_count() > 0)
            .count()
    }

    /// Copies the current list, pruning dead entries on the way.
    fn snapshot(&self) -> Vec<Weak<dyn SessionUpdater>> {
        let mut updaters = self.updaters.borrow_mut();
        updaters.retain(|u| u.strong_count() > 0);
        updaters.clone()
    }

    /// Calls [`SessionUpdater::update_sessions`] on every live updater and
    /// returns the union of their failures.
    pub fn update_sessions(
        &self,
        sessions_to_update: &BTreeMap<SessionId, PresentId>,
        trace_id: u64,
    ) -> UpdateResults {
        let mut results = UpdateResults::default();
        for updater in self.snapshot() {
            let Some(updater) = updater.upgrade() else {
                continue;
            };
            let r = updater.update_sessions(sessions_to_update, trace_id);
            results
                .sessions_with_failed_updates
                .extend(r.sessions_with_failed_updates);
        }
        results
    }

    /// Calls [`SessionUpdater::on_frame_presented`] on every live updater.
    pub fn on_frame_presented(&self, latched_times: &LatchedTimes, presented_time: HostTime) {
        for updater in self.snapshot() {
            if let Some(updater) = updater.upgrade() {
                updater.on_frame_presented(latched_times, presented_time);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct Counting {
        updates: Cell<u32>,
        presents: Cell<u32>,
        fail: Option<SessionId>,
    }

    impl SessionUpdater for Counting {
        fn update_sessions(&self, _: &BTreeMap<SessionId, PresentId>, _: u64) -> UpdateResults {
            self.updates.set(self.updates.get() + 1);
            let mut r = UpdateResults::default();
            r.sessions_with_failed_updates.extend(self.fail);
            r
        }

        fn on_frame_presented(&self, _: &LatchedTimes, _: HostTime) {
            self.presents.set(self.presents.get() + 1);
        }
    }

    #[test]
    fn dropped_updaters_are_pruned() {
        let set = UpdaterSet::new();
        let a = Rc::new(Counting::default());
        let b = Rc::new(Counting::default());
        set.add(&a);
        set.add(&b);
        assert_eq!(set.live_count(), 2);
        drop(b);
        assert_eq!(set.live_count(), 1);

        set.update_sessions(&BTreeMap::new(), 1);
        assert_eq!(a.updates.get(), 1);
        assert_eq!(set.updaters.borrow().len(), 1, "dead handle pruned");
    }

    #[test]
    fn failures_are_unioned() {
        let set = UpdaterSet::new();
        let a = Rc::new(Counting {
            fail: Some(SessionId(1)),
            ..Counting::default()
        });
        let b = Rc::new(Counting {
            fail: Some(SessionId(2)),
            ..Counting::default()
        });
        set.add(&a);
        set.add(&b);
        let r = set.update_sessions(&BTreeMap::new(), 1);
        assert_eq!(
            r.sessions_with_failed_updates,
            BTreeSet::from([SessionId(1), SessionId(2)])
        );
    }

    #[test]
    fn cloned_handles_share_the_list() {
        let set = UpdaterSet::new();
        let handle = set.clone();
        let a = Rc::new(Counting::default());
        handle.add(&a);
        set.on_frame_presented(&LatchedTimes::new(), HostTime(0));
        assert_eq!(a.presents.get(), 1);
    }
}
