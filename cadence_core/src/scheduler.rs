// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync-aligned frame scheduling.
//!
//! The [`FrameScheduler`] decides when pending presents are applied to the
//! scene (latched) and when the result is rendered. See the struct docs for
//! the frame lifecycle.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::error::SchedulerError;
use crate::fence::ReleaseFence;
use crate::latch::LatchRecord;
use crate::predictor::FramePredictor;
use crate::presentation::FuturePresentationInfos;
use crate::registry::PresentRegistry;
use crate::renderer::{FrameRenderer, RenderOutcome, RenderRequest};
use crate::session::{FrameNumber, PendingPresent, PresentId, SchedulingIdPair, SessionId};
use crate::time::{Duration, HostTime};
use crate::trace::{
    FencesSignaledEvent, FrameDroppedEvent, FramePresentedEvent, FrameSummary, LatchEvent,
    RenderBeginEvent, ScheduleEvent, TraceSink, Tracer,
};
use crate::updater::{SessionUpdater, UpdaterSet};
use crate::vsync::VsyncTiming;

/// What happens to a session whose update failed during a latch.
///
/// Passed to the [`FrameScheduler`] via
/// [`SchedulerConfig::failed_update_policy`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FailedUpdatePolicy {
    /// Leave the session out of the frame: its presents are not reported to
    /// `on_frame_presented` and its older fences stay unsignaled until a
    /// later update of the session succeeds.
    #[default]
    Exclude,
    /// Treat the session like any other: report its presents and release
    /// its superseded fences.
    Report,
}

/// Configuration for the [`FrameScheduler`].
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// EMA smoothing factor for render duration estimation (0.0 to 1.0).
    /// Smaller values = more smoothing.
    pub ema_alpha: f64,
    /// Multiplier applied to the EMA render duration.
    pub safety_multiplier: f64,
    /// Largest share of the vsync interval the predicted render duration
    /// may claim.
    pub max_render_fraction: f64,
    /// How many entries [`FrameScheduler::future_presentation_infos`] may
    /// yield. Capped at
    /// [`MAX_PRESENTATION_INFOS`](crate::presentation::MAX_PRESENTATION_INFOS).
    pub max_presentation_infos: usize,
    /// Handling of sessions whose update failed.
    pub failed_update_policy: FailedUpdatePolicy,
}

impl SchedulerConfig {
    /// The default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ema_alpha: 0.2,
            safety_multiplier: 1.25,
            max_render_fraction: 0.5,
            max_presentation_infos: 8,
            failed_update_policy: FailedUpdatePolicy::Exclude,
        }
    }

    /// Returns `self` with a different failed-update policy.
    #[must_use]
    pub const fn with_failed_update_policy(mut self, policy: FailedUpdatePolicy) -> Self {
        self.failed_update_policy = policy;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the scheduler is in the frame lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// No render in flight.
    #[default]
    Idle,
    /// Session updaters are applying a latch.
    ///
    /// Only held inside [`FrameScheduler::on_deadline`]; afterwards the state
    /// is `Rendering` if a render is in flight and `Idle` otherwise.
    Latching,
    /// A render is in flight.
    Rendering,
    /// Updaters are being told about a presented frame.
    ///
    /// Only held inside [`FrameScheduler::on_render_outcome`]; the scheduler
    /// is back to `Idle` by the time that call returns.
    Presented,
}

/// Running counters, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Latches that applied at least one present.
    pub latches: u64,
    /// Renders handed to the renderer.
    pub frames_started: u64,
    /// Frames that reached the display.
    pub frames_presented: u64,
    /// Frames reported as dropped.
    pub frames_dropped: u64,
    /// Frames the renderer refused to start.
    pub renders_rejected: u64,
    /// Latches that had to wait because a render was in flight.
    pub deferred_renders: u64,
    /// Fence sets released.
    pub fence_sets_signaled: u64,
}

#[derive(Debug)]
struct InFlight {
    frame_number: FrameNumber,
    record: LatchRecord,
    latch_time: HostTime,
    target: HostTime,
    render_start: HostTime,
    predicted_render: Duration,
}

/// Decides when presents are latched and frames are rendered.
///
/// # Frame lifecycle
///
/// Producers [`register_present`](Self::register_present) to obtain a present
/// id and then [`schedule_update_for_session`](Self::schedule_update_for_session)
/// with the time they want it shown. The scheduler maps that time to a vsync
/// and arms a deadline, which the owner polls through
/// [`next_deadline`](Self::next_deadline). When the deadline passes the owner
/// calls [`on_deadline`](Self::on_deadline), which
///
/// 1. latches every pending present whose requested time is at or before
///    the armed vsync,
/// 2. hands them to the [`SessionUpdater`]s,
/// 3. releases the fences of presents the latch superseded, and
/// 4. starts a render if none is in flight.
///
/// The owner reports how the render ended through
/// [`on_render_outcome`](Self::on_render_outcome). Presented frames are
/// reported to the updaters; dropped frames are merged into the next render.
///
/// Only one render is ever in flight. Latches that happen while the renderer
/// is busy accumulate and go out together with the next render.
///
/// # Deadlines
///
/// The vsync picked for a request is pushed back one interval at a time
/// while it is closer than the predicted render duration. The prediction
/// comes from a [`FramePredictor`] fed with the render times of presented
/// frames.
///
/// # Teardown
///
/// Dropping the scheduler signals every fence it still owns.
pub struct FrameScheduler<R> {
    config: SchedulerConfig,
    vsync: Rc<VsyncTiming>,
    renderer: R,
    registry: PresentRegistry,
    updaters: UpdaterSet,
    predictor: FramePredictor,
    pending: BTreeMap<SessionId, VecDeque<PendingPresent>>,
    last_scheduled: BTreeMap<SessionId, PresentId>,
    queued: LatchRecord,
    in_flight: Option<InFlight>,
    armed: Option<HostTime>,
    render_continuously: bool,
    state: FrameState,
    frame_number: FrameNumber,
    next_trace_id: u64,
    stats: FrameStats,
    tracer: Tracer,
}

impl<R> core::fmt::Debug for FrameScheduler<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("state", &self.state)
            .field("armed", &self.armed)
            .field("frame_number", &self.frame_number)
            .field("render_continuously", &self.render_continuously)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<R: FrameRenderer> FrameScheduler<R> {
    /// Creates a scheduler driving `renderer` on the vsync grid of `vsync`.
    #[must_use]
    pub fn new(config: SchedulerConfig, vsync: Rc<VsyncTiming>, renderer: R) -> Self {
        Self {
            predictor: FramePredictor::new(
                config.ema_alpha,
                config.safety_multiplier,
                config.max_render_fraction,
            ),
            config,
            vsync,
            renderer,
            registry: PresentRegistry::new(),
            updaters: UpdaterSet::new(),
            pending: BTreeMap::new(),
            last_scheduled: BTreeMap::new(),
            queued: LatchRecord::new(),
            in_flight: None,
            armed: None,
            render_continuously: false,
            state: FrameState::Idle,
            frame_number: FrameNumber(0),
            next_trace_id: 1,
            stats: FrameStats::default(),
            tracer: Tracer::none(),
        }
    }

    // -----------------------------------------------------------------------
    // Producer side
    // -----------------------------------------------------------------------

    /// Registers a present and takes ownership of its release fences.
    ///
    /// The fences are signaled once a later present of the same session has
    /// latched, when the session is removed, or when the scheduler is
    /// dropped.
    pub fn register_present(
        &mut self,
        session_id: SessionId,
        release_fences: Vec<Box<dyn ReleaseFence>>,
    ) -> PresentId {
        self.registry.register_present(session_id, release_fences)
    }

    /// Asks for a registered present to be shown at or after
    /// `requested_presentation_time`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnregisteredPresent`] for an id that
    /// [`register_present`](Self::register_present) never returned, and
    /// [`SchedulerError::OutOfOrderPresent`] if a present with the same or a
    /// higher id was already scheduled for the session.
    pub fn schedule_update_for_session(
        &mut self,
        requested_presentation_time: HostTime,
        id: SchedulingIdPair,
    ) -> Result<(), SchedulerError> {
        if !self.registry.is_registered(id) {
            log::warn!("rejecting schedule of unregistered {id}");
            return Err(SchedulerError::UnregisteredPresent(id));
        }
        if let Some(&last_scheduled) = self.last_scheduled.get(&id.session_id) {
            if id.present_id <= last_scheduled {
                log::warn!("rejecting out-of-order schedule of {id}");
                return Err(SchedulerError::OutOfOrderPresent { id, last_scheduled });
            }
        }

        self.last_scheduled.insert(id.session_id, id.present_id);
        self.pending
            .entry(id.session_id)
            .or_default()
            .push_back(PendingPresent {
                id,
                requested_presentation_time,
            });

        let target_vsync = self.request_frame(requested_presentation_time);
        log::trace!("scheduled {id} for {requested_presentation_time:?}, aiming at {target_vsync:?}");
        self.tracer.schedule(&ScheduleEvent {
            id,
            requested_presentation_time,
            target_vsync,
            now: self.vsync.now(),
        });
        Ok(())
    }

    /// Drops a session: forgets its pending and queued presents and signals
    /// all of its fences.
    ///
    /// A render already in flight still reports the session's presents when
    /// it is shown.
    pub fn remove_session(&mut self, session_id: SessionId) {
        let pending = self.pending.remove(&session_id).map_or(0, |p| p.len());
        let queued = self.queued.remove_session(session_id);
        self.last_scheduled.remove(&session_id);
        let signaled = self.registry.remove_session(session_id);
        log::debug!(
            "removed {session_id}: {pending} pending, {queued} queued, {signaled} fence sets released"
        );
        self.note_fences_signaled(session_id, PresentId(u64::MAX), signaled);
        if self.pending.is_empty() && self.queued.is_empty() && !self.render_continuously {
            self.armed = None;
        }
    }

    /// Adds a session updater. Only a weak handle is kept: dropping the last
    /// `Rc` removes the updater.
    pub fn add_session_updater<U: SessionUpdater + 'static>(&self, updater: &Rc<U>) {
        self.updaters.add(updater);
    }

    /// The updater list, as a cloneable handle. Updaters that want to add
    /// more updaters from inside a callback hold one of these.
    #[must_use]
    pub fn updaters(&self) -> UpdaterSet {
        self.updaters.clone()
    }

    /// Renders a frame every vsync while `true`, even without new presents.
    ///
    /// Turning it off stops new render attempts; a render in flight is not
    /// affected.
    pub fn set_render_continuously(&mut self, render_continuously: bool) {
        self.render_continuously = render_continuously;
        if render_continuously {
            if self.in_flight.is_none() {
                self.request_frame(self.vsync.now());
            }
        } else if self.pending.is_empty() && self.queued.is_empty() {
            self.armed = None;
        }
    }

    /// Predicts upcoming presentation opportunities spanning `span` from now.
    ///
    /// Does not change the scheduler's state.
    #[must_use]
    pub fn future_presentation_infos(&self, span: Duration) -> FuturePresentationInfos {
        let now = self.vsync.now();
        let first = self.vsync.predicted_vsync_at_or_after(now);
        FuturePresentationInfos::new(
            now,
            first,
            self.vsync.vsync_interval(),
            span,
            self.predicted_render_duration(),
            self.config.max_presentation_infos,
        )
    }

    // -----------------------------------------------------------------------
    // Driver side
    // -----------------------------------------------------------------------

    /// The armed vsync, if any. The owner calls
    /// [`on_deadline`](Self::on_deadline) once the clock reaches it.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        self.armed
    }

    /// Latches and, if the renderer is free, starts a frame.
    ///
    /// Does nothing if no deadline is armed or the armed deadline is still in
    /// the future.
    pub fn on_deadline(&mut self) {
        let now = self.vsync.now();
        let Some(target) = self.armed else {
            return;
        };
        if now < target {
            log::trace!("deadline {target:?} not reached at {now:?}");
            return;
        }
        self.armed = None;

        let trace_id = self.next_trace_id;
        self.next_trace_id += 1;

        self.latch(target, now, trace_id);

        if self.in_flight.is_none() {
            if !self.queued.is_empty() || self.render_continuously {
                self.start_render(target, now, trace_id);
            }
        } else if !self.queued.is_empty() {
            log::debug!("renderer busy, deferring latched presents");
            self.stats.deferred_renders += 1;
        }

        self.rearm();
    }

    /// Reports how the render of `frame_number` ended.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownFrame`] if `frame_number` is not the
    /// render in flight.
    pub fn on_render_outcome(
        &mut self,
        frame_number: FrameNumber,
        outcome: RenderOutcome,
    ) -> Result<(), SchedulerError> {
        let in_flight = match self.in_flight.take() {
            Some(f) if f.frame_number == frame_number => f,
            other => {
                self.in_flight = other;
                log::warn!("outcome reported for frame {frame_number}, which is not in flight");
                return Err(SchedulerError::UnknownFrame(frame_number));
            }
        };
        let now = self.vsync.now();

        match outcome {
            RenderOutcome::Presented(ts) => {
                self.state = FrameState::Presented;
                self.stats.frames_presented += 1;
                let presents = count(in_flight.record.len());
                log::debug!(
                    "frame {frame_number} presented at {:?} with {presents} presents",
                    ts.actual_presentation_time
                );

                self.updaters
                    .on_frame_presented(in_flight.record.latched_times(), ts.actual_presentation_time);

                let sessions: Vec<_> = in_flight.record.sessions().collect();
                for session_id in sessions {
                    if let Some(latest) = in_flight.record.latest(session_id) {
                        let signaled = self.registry.signal_superseded(session_id, latest);
                        self.note_fences_signaled(session_id, latest, signaled);
                    }
                }

                self.predictor.observe_render_duration(
                    ts.render_done_time
                        .saturating_duration_since(in_flight.render_start),
                );

                self.tracer.frame_presented(&FramePresentedEvent {
                    frame_number,
                    render_start: in_flight.render_start,
                    render_done_time: ts.render_done_time,
                    actual_presentation_time: ts.actual_presentation_time,
                    presents,
                });
                self.tracer.frame_summary(&FrameSummary {
                    frame_number,
                    latch_time: in_flight.latch_time,
                    target_presentation_time: in_flight.target,
                    render_start: in_flight.render_start,
                    render_done_time: ts.render_done_time,
                    actual_presentation_time: ts.actual_presentation_time,
                    predicted_render: in_flight.predicted_render,
                    missed_target: ts.actual_presentation_time > in_flight.target,
                });
            }
            RenderOutcome::Dropped => {
                self.stats.frames_dropped += 1;
                log::debug!(
                    "frame {frame_number} dropped, retrying {} presents",
                    in_flight.record.len()
                );
                self.queued.merge(in_flight.record);
                self.tracer.frame_dropped(&FrameDroppedEvent {
                    frame_number,
                    now,
                    rejected: false,
                });
            }
        }

        self.state = self.settled_state();
        self.rearm();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Running counters.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// The configuration the scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The shared vsync timing.
    #[must_use]
    pub fn vsync(&self) -> &Rc<VsyncTiming> {
        &self.vsync
    }

    /// The number of the most recently started render, or `None` before the
    /// first one.
    #[must_use]
    pub fn last_frame_number(&self) -> Option<FrameNumber> {
        (self.frame_number.0 > 0).then_some(self.frame_number)
    }

    /// The render currently in flight.
    #[must_use]
    pub fn frame_in_flight(&self) -> Option<FrameNumber> {
        self.in_flight.as_ref().map(|f| f.frame_number)
    }

    /// Predicted render duration at the current vsync interval.
    #[must_use]
    pub fn predicted_render_duration(&self) -> Duration {
        self.predictor
            .predicted_render_duration(self.vsync.vsync_interval())
    }

    /// Fence sets not yet signaled.
    #[must_use]
    pub fn outstanding_fence_sets(&self) -> usize {
        self.registry.outstanding_fence_sets()
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Installs a trace sink, returning the previous one.
    ///
    /// Events are only delivered with the `trace` feature enabled.
    pub fn set_trace_sink(
        &mut self,
        sink: Option<Box<dyn TraceSink>>,
    ) -> Option<Box<dyn TraceSink>> {
        self.tracer.set_sink(sink)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Arms the vsync for a frame wanted at `requested` unless an earlier one
    /// is already armed. Returns the vsync picked for the request.
    fn request_frame(&mut self, requested: HostTime) -> HostTime {
        let now = self.vsync.now();
        let interval = self.vsync.vsync_interval();
        let lead = self.predicted_render_duration();
        let mut target = self.vsync.predicted_vsync_at_or_after(requested);
        if !interval.is_zero() {
            while target.saturating_duration_since(now) < lead && target < HostTime::MAX {
                target = target.saturating_add(interval);
            }
        }
        if self.armed.is_none_or(|armed| target < armed) {
            log::trace!("armed {target:?}");
            self.armed = Some(target);
        }
        target
    }

    /// Arms for whatever work remains.
    fn rearm(&mut self) {
        let earliest_pending = self
            .pending
            .values()
            .filter_map(|q| q.front())
            .map(|p| p.requested_presentation_time)
            .min();
        if let Some(requested) = earliest_pending {
            self.request_frame(requested);
        }
        if self.in_flight.is_none() && (!self.queued.is_empty() || self.render_continuously) {
            self.request_frame(self.vsync.now());
        }
    }

    /// Latches every pending present due at `target` and applies them.
    fn latch(&mut self, target: HostTime, now: HostTime, trace_id: u64) {
        let mut latched: BTreeMap<SessionId, Vec<PresentId>> = BTreeMap::new();
        for (session_id, queue) in &mut self.pending {
            while let Some(p) = queue.front() {
                if p.requested_presentation_time > target {
                    break;
                }
                latched
                    .entry(*session_id)
                    .or_default()
                    .push(p.id.present_id);
                queue.pop_front();
            }
        }
        self.pending.retain(|_, q| !q.is_empty());
        if latched.is_empty() {
            return;
        }

        self.state = FrameState::Latching;
        self.stats.latches += 1;

        let sessions_to_update: BTreeMap<SessionId, PresentId> = latched
            .iter()
            .filter_map(|(s, ids)| ids.last().map(|id| (*s, *id)))
            .collect();
        let results = self.updaters.update_sessions(&sessions_to_update, trace_id);
        let failed = results.sessions_with_failed_updates;
        if !failed.is_empty() {
            log::debug!("updates failed for {} sessions", failed.len());
        }

        let mut presents = 0_usize;
        for (session_id, ids) in &latched {
            presents += ids.len();
            if failed.contains(session_id)
                && self.config.failed_update_policy == FailedUpdatePolicy::Exclude
            {
                continue;
            }
            for id in ids {
                self.queued.insert(*session_id, *id, now);
            }
            if let Some(&latest) = ids.last() {
                let signaled = self.registry.signal_superseded(*session_id, latest);
                self.note_fences_signaled(*session_id, latest, signaled);
            }
        }

        log::debug!(
            "latched {presents} presents from {} sessions for {target:?}",
            sessions_to_update.len()
        );
        self.tracer.latch(&LatchEvent {
            trace_id,
            latch_time: now,
            target_vsync: target,
            sessions: count(sessions_to_update.len()),
            presents: count(presents),
            failed_sessions: count(failed.len()),
        });
        self.state = self.settled_state();
    }

    /// The state outside of a latch or a presentation report.
    fn settled_state(&self) -> FrameState {
        if self.in_flight.is_some() {
            FrameState::Rendering
        } else {
            FrameState::Idle
        }
    }

    /// Hands the queued record to the renderer.
    fn start_render(&mut self, target: HostTime, now: HostTime, trace_id: u64) {
        self.frame_number = FrameNumber(self.frame_number.0 + 1);
        let frame_number = self.frame_number;
        let record = core::mem::take(&mut self.queued);
        let request = RenderRequest {
            frame_number,
            latch_time: now,
            target_presentation_time: target,
            trace_id,
        };

        if !self.renderer.render_frame(&request) {
            log::warn!("renderer rejected frame {frame_number}, retrying next vsync");
            self.stats.renders_rejected += 1;
            self.queued.merge(record);
            self.tracer.frame_dropped(&FrameDroppedEvent {
                frame_number,
                now,
                rejected: true,
            });
            return;
        }

        self.stats.frames_started += 1;
        self.state = FrameState::Rendering;
        log::debug!(
            "rendering frame {frame_number} for {target:?} with {} presents",
            record.len()
        );
        self.tracer.render_begin(&RenderBeginEvent {
            frame_number,
            trace_id,
            latch_time: now,
            target_presentation_time: target,
            presents: count(record.len()),
        });
        self.in_flight = Some(InFlight {
            frame_number,
            record,
            latch_time: now,
            target,
            render_start: now,
            predicted_render: self.predicted_render_duration(),
        });
    }

    fn note_fences_signaled(&mut self, session_id: SessionId, below: PresentId, signaled: usize) {
        if signaled == 0 {
            return;
        }
        self.stats.fence_sets_signaled += signaled as u64;
        self.tracer.fences_signaled(&FencesSignaledEvent {
            session_id,
            below,
            count: count(signaled),
            now: self.vsync.now(),
        });
    }
}

impl<R> Drop for FrameScheduler<R> {
    fn drop(&mut self) {
        let released = self.registry.signal_all();
        if released > 0 {
            log::debug!("scheduler dropped, released {released} fence sets");
        }
    }
}

/// Saturating `usize` to `u32` for trace counters.
fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
