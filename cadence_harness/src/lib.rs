// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic test fixture for the cadence frame scheduler.
//!
//! [`Harness`] wires a [`FrameScheduler`] to a [`ManualClock`], a
//! [`MockFrameRenderer`], and a [`MockSessionUpdater`], and drives the
//! scheduler's deadlines by moving the clock. Nothing sleeps and nothing
//! depends on wall-clock time, so scenarios are exact to the nanosecond.
//!
//! ```text
//!   run_until(t) ──► fire every armed deadline <= t ──► clock = t
//!   end_frame()  ──► oldest pending render presented "now"
//!   drop_frame() ──► oldest pending render dropped
//! ```

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use cadence_core::clock::{Clock, ManualClock};
use cadence_core::error::SchedulerError;
use cadence_core::fence::ReleaseFence;
use cadence_core::renderer::{FrameRenderer, RenderOutcome, RenderRequest, Timestamps};
use cadence_core::scheduler::{FrameScheduler, SchedulerConfig};
use cadence_core::session::{FrameNumber, PresentId, SchedulingIdPair, SessionId};
use cadence_core::time::{Duration, HostTime};
use cadence_core::updater::{LatchedTimes, SessionUpdater, UpdateResults};
use cadence_core::vsync::VsyncTiming;

/// Refresh interval used by [`Harness::new`]. Round, so vsyncs are easy to
/// write down in tests.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// A shared, ordered record of named calls.
///
/// Hand clones to several mocks to assert on the order they were called in.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Rc<RefCell<Vec<&'static str>>>);

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, name: &'static str) {
        self.0.borrow_mut().push(name);
    }

    /// Everything logged so far.
    #[must_use]
    pub fn entries(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }

    /// Forgets everything logged so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// Fences
// ---------------------------------------------------------------------------

/// Hands out release fences that record, in order, when they are signaled.
#[derive(Clone, Debug, Default)]
pub struct FenceLog(Rc<RefCell<Vec<u32>>>);

impl FenceLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fence that appends `tag` to this log when signaled.
    #[must_use]
    pub fn fence(&self, tag: u32) -> Box<dyn ReleaseFence> {
        let log = self.0.clone();
        Box::new(move || log.borrow_mut().push(tag))
    }

    /// Tags of signaled fences, in signaling order.
    #[must_use]
    pub fn signaled(&self) -> Vec<u32> {
        self.0.borrow().clone()
    }

    /// Returns `true` if the fence tagged `tag` has been signaled.
    #[must_use]
    pub fn is_signaled(&self, tag: u32) -> bool {
        self.0.borrow().contains(&tag)
    }
}

// ---------------------------------------------------------------------------
// MockSessionUpdater
// ---------------------------------------------------------------------------

type Hook = Box<dyn Fn()>;

/// A [`SessionUpdater`] that records every call.
///
/// Optional extras: a clock to timestamp updates, a [`CallLog`] entry per
/// call, sessions that always fail, and a hook run at the start of each
/// `update_sessions` call.
#[derive(Default)]
pub struct MockSessionUpdater {
    clock: Option<Rc<dyn Clock>>,
    log: Option<(CallLog, &'static str)>,
    update_calls: Cell<u32>,
    presented_calls: Cell<u32>,
    update_times: RefCell<Vec<HostTime>>,
    trace_ids: RefCell<Vec<u64>>,
    last_sessions: RefCell<BTreeMap<SessionId, PresentId>>,
    last_latched: RefCell<LatchedTimes>,
    last_presented_time: Cell<Option<HostTime>>,
    failing: RefCell<BTreeSet<SessionId>>,
    hook: RefCell<Option<Hook>>,
}

impl core::fmt::Debug for MockSessionUpdater {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockSessionUpdater")
            .field("update_calls", &self.update_calls.get())
            .field("presented_calls", &self.presented_calls.get())
            .finish_non_exhaustive()
    }
}

impl MockSessionUpdater {
    /// Creates an updater that only counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamps each `update_sessions` call with `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Appends `name` to `log` on every `update_sessions` call.
    #[must_use]
    pub fn with_log(mut self, log: CallLog, name: &'static str) -> Self {
        self.log = Some((log, name));
        self
    }

    /// Runs `hook` at the start of every `update_sessions` call.
    pub fn set_update_hook(&self, hook: impl Fn() + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Reports updates of `session_id` as failed from now on.
    pub fn fail_session(&self, session_id: SessionId) {
        self.failing.borrow_mut().insert(session_id);
    }

    /// Number of `update_sessions` calls.
    #[must_use]
    pub fn update_sessions_call_count(&self) -> u32 {
        self.update_calls.get()
    }

    /// Number of `on_frame_presented` calls.
    #[must_use]
    pub fn on_frame_presented_call_count(&self) -> u32 {
        self.presented_calls.get()
    }

    /// Clock readings of every `update_sessions` call (needs a clock).
    #[must_use]
    pub fn update_times(&self) -> Vec<HostTime> {
        self.update_times.borrow().clone()
    }

    /// Trace ids passed to `update_sessions`, in call order.
    #[must_use]
    pub fn trace_ids(&self) -> Vec<u64> {
        self.trace_ids.borrow().clone()
    }

    /// The map passed to the most recent `update_sessions` call.
    #[must_use]
    pub fn last_sessions_to_update(&self) -> BTreeMap<SessionId, PresentId> {
        self.last_sessions.borrow().clone()
    }

    /// The latched times passed to the most recent `on_frame_presented`.
    #[must_use]
    pub fn last_latched_times(&self) -> LatchedTimes {
        self.last_latched.borrow().clone()
    }

    /// Total presents reported by the most recent `on_frame_presented`.
    #[must_use]
    pub fn last_latched_count(&self) -> usize {
        self.last_latched.borrow().values().map(BTreeMap::len).sum()
    }

    /// The presentation time of the most recent `on_frame_presented`.
    #[must_use]
    pub fn last_presented_time(&self) -> Option<HostTime> {
        self.last_presented_time.get()
    }
}

impl SessionUpdater for MockSessionUpdater {
    fn update_sessions(
        &self,
        sessions_to_update: &BTreeMap<SessionId, PresentId>,
        trace_id: u64,
    ) -> UpdateResults {
        // Take the hook out while it runs so it may replace itself.
        let hook = self.hook.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
            let mut slot = self.hook.borrow_mut();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }

        self.update_calls.set(self.update_calls.get() + 1);
        if let Some(clock) = &self.clock {
            self.update_times.borrow_mut().push(clock.now());
        }
        if let Some((log, name)) = &self.log {
            log.push(name);
        }
        self.trace_ids.borrow_mut().push(trace_id);
        *self.last_sessions.borrow_mut() = sessions_to_update.clone();

        let failing = self.failing.borrow();
        UpdateResults {
            sessions_with_failed_updates: sessions_to_update
                .keys()
                .filter(|s| failing.contains(s))
                .copied()
                .collect(),
        }
    }

    fn on_frame_presented(&self, latched_times: &LatchedTimes, presented_time: HostTime) {
        self.presented_calls.set(self.presented_calls.get() + 1);
        *self.last_latched.borrow_mut() = latched_times.clone();
        self.last_presented_time.set(Some(presented_time));
    }
}

// ---------------------------------------------------------------------------
// MockFrameRenderer
// ---------------------------------------------------------------------------

/// A [`FrameRenderer`] that accepts frames and leaves them pending until the
/// harness completes them.
#[derive(Debug, Default)]
pub struct MockFrameRenderer {
    pending: VecDeque<RenderRequest>,
    requests: Vec<RenderRequest>,
    reject: u32,
}

impl MockFrameRenderer {
    /// Every request accepted so far, in order.
    #[must_use]
    pub fn requests(&self) -> &[RenderRequest] {
        &self.requests
    }

    /// Number of renders accepted so far.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.requests.len()
    }

    /// Number of accepted renders not yet completed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Refuses the next `n` frames.
    pub fn reject_next(&mut self, n: u32) {
        self.reject = n;
    }

    fn complete_oldest(&mut self) -> Option<RenderRequest> {
        self.pending.pop_front()
    }
}

impl FrameRenderer for MockFrameRenderer {
    fn render_frame(&mut self, request: &RenderRequest) -> bool {
        if self.reject > 0 {
            self.reject -= 1;
            return false;
        }
        self.pending.push_back(*request);
        self.requests.push(*request);
        true
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A scheduler on a manual clock, with mocks attached.
///
/// The display's first vsync is at time zero and the clock starts there.
#[derive(Debug)]
pub struct Harness {
    /// The clock the scheduler reads.
    pub clock: Rc<ManualClock>,
    /// Shared vsync timing.
    pub vsync: Rc<VsyncTiming>,
    /// The scheduler under test.
    pub scheduler: FrameScheduler<MockFrameRenderer>,
    /// An updater registered at construction, timestamped by `clock`.
    pub updater: Rc<MockSessionUpdater>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Default configuration at [`DEFAULT_INTERVAL`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::new(), DEFAULT_INTERVAL)
    }

    /// A harness with a specific configuration and refresh interval.
    #[must_use]
    pub fn with_config(config: SchedulerConfig, interval: Duration) -> Self {
        let clock = Rc::new(ManualClock::new(HostTime::ZERO));
        let vsync = Rc::new(VsyncTiming::new(clock.clone(), HostTime::ZERO, interval));
        let scheduler = FrameScheduler::new(config, vsync.clone(), MockFrameRenderer::default());
        let updater = Rc::new(MockSessionUpdater::new().with_clock(clock.clone()));
        scheduler.add_session_updater(&updater);
        Self {
            clock,
            vsync,
            scheduler,
            updater,
        }
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.clock.now()
    }

    /// The `k`th vsync after time zero.
    #[must_use]
    pub fn vsync_at(&self, k: u64) -> HostTime {
        HostTime(self.vsync.vsync_interval().nanos() * k)
    }

    /// The renderer mock.
    #[must_use]
    pub fn renderer(&self) -> &MockFrameRenderer {
        self.scheduler.renderer()
    }

    /// Moves the clock to `t`, firing every deadline armed at or before it
    /// on the way. Deadlines armed by a firing are honored too.
    pub fn run_until(&mut self, t: HostTime) {
        while let Some(deadline) = self.scheduler.next_deadline() {
            if deadline > t {
                break;
            }
            self.clock.set(deadline);
            self.scheduler.on_deadline();
        }
        self.clock.set(t);
    }

    /// Moves the clock forward by `d`, firing deadlines on the way.
    pub fn run_for(&mut self, d: Duration) {
        self.run_until(self.now().saturating_add(d));
    }

    /// Registers a present without fences.
    pub fn register(&mut self, session_id: SessionId) -> PresentId {
        self.scheduler.register_present(session_id, Vec::new())
    }

    /// Registers a present whose single fence records `tag` in `fences`.
    pub fn register_with_fence(
        &mut self,
        session_id: SessionId,
        fences: &FenceLog,
        tag: u32,
    ) -> PresentId {
        self.scheduler
            .register_present(session_id, alloc::vec![fences.fence(tag)])
    }

    /// Schedules an already registered present.
    ///
    /// # Errors
    ///
    /// Whatever [`FrameScheduler::schedule_update_for_session`] reports.
    pub fn schedule(
        &mut self,
        session_id: SessionId,
        present_id: PresentId,
        requested: HostTime,
    ) -> Result<(), SchedulerError> {
        self.scheduler.schedule_update_for_session(
            requested,
            SchedulingIdPair::new(session_id, present_id),
        )
    }

    /// Registers and schedules a present in one go.
    ///
    /// # Errors
    ///
    /// Whatever [`FrameScheduler::schedule_update_for_session`] reports.
    pub fn present(
        &mut self,
        session_id: SessionId,
        requested: HostTime,
    ) -> Result<PresentId, SchedulerError> {
        let id = self.register(session_id);
        self.schedule(session_id, id, requested)?;
        Ok(id)
    }

    /// Reports the oldest pending render as presented now.
    ///
    /// Returns its frame number, or `None` if nothing was rendering.
    pub fn end_frame(&mut self) -> Option<FrameNumber> {
        let now = self.now();
        self.complete(RenderOutcome::Presented(Timestamps {
            render_done_time: now,
            actual_presentation_time: now,
        }))
    }

    /// Reports the oldest pending render as dropped.
    ///
    /// Returns its frame number, or `None` if nothing was rendering.
    pub fn drop_frame(&mut self) -> Option<FrameNumber> {
        self.complete(RenderOutcome::Dropped)
    }

    fn complete(&mut self, outcome: RenderOutcome) -> Option<FrameNumber> {
        let request = self.scheduler.renderer_mut().complete_oldest()?;
        self.scheduler
            .on_render_outcome(request.frame_number, outcome)
            .ok()?;
        Some(request.frame_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_until_moves_clock_without_work() {
        let mut h = Harness::new();
        h.run_until(HostTime(123));
        assert_eq!(h.now(), HostTime(123));
        h.run_for(Duration(7));
        assert_eq!(h.now(), HostTime(130));
        assert_eq!(h.updater.update_sessions_call_count(), 0);
    }

    #[test]
    fn end_frame_without_render_is_none() {
        let mut h = Harness::new();
        assert!(h.end_frame().is_none());
        assert!(h.drop_frame().is_none());
    }

    #[test]
    fn mock_renderer_rejects_on_request() {
        let mut r = MockFrameRenderer::default();
        r.reject_next(1);
        let req = RenderRequest {
            frame_number: FrameNumber(1),
            latch_time: HostTime(0),
            target_presentation_time: HostTime(0),
            trace_id: 1,
        };
        assert!(!r.render_frame(&req));
        assert!(r.render_frame(&req));
        assert_eq!(r.render_count(), 1);
        assert_eq!(r.pending_count(), 1);
    }

    #[test]
    fn fence_log_records_order() {
        let log = FenceLog::new();
        let a = log.fence(1);
        let b = log.fence(2);
        b.signal();
        a.signal();
        assert_eq!(log.signaled(), [2, 1]);
        assert!(log.is_signaled(1));
    }

    #[test]
    fn hook_runs_before_update() {
        let log = CallLog::new();
        let updater = MockSessionUpdater::new().with_log(log.clone(), "updater");
        let hook_log = log.clone();
        updater.set_update_hook(move || hook_log.push("hook"));
        updater.update_sessions(&BTreeMap::new(), 1);
        assert_eq!(log.entries(), ["hook", "updater"]);
    }
}
