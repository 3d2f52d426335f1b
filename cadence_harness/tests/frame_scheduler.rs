// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end frame scheduling scenarios on a manual clock.
//!
//! The display refreshes every 10 ms starting at time zero unless a test
//! says otherwise. Renders that finish at the instant they are ended take
//! no time, so the render duration predictor stays at zero and vsync
//! targets are not pushed back.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_core::error::SchedulerError;
use cadence_core::scheduler::{FailedUpdatePolicy, FrameState, SchedulerConfig};
use cadence_core::session::{FrameNumber, PresentId, SchedulingIdPair, SessionId};
use cadence_core::time::{Duration, HostTime};
use cadence_debug::recorder::{RecordedEvent, RecorderSink, decode};
use cadence_harness::{CallLog, FenceLog, Harness, MockSessionUpdater};

const S1: SessionId = SessionId(1);
const S2: SessionId = SessionId(2);

fn ms(n: u64) -> HostTime {
    HostTime(n * 1_000_000)
}

fn present_with_fence(
    h: &mut Harness,
    session_id: SessionId,
    fences: &FenceLog,
    tag: u32,
    requested: HostTime,
) -> PresentId {
    let id = h.register_with_fence(session_id, fences, tag);
    h.schedule(session_id, id, requested).unwrap();
    id
}

// ---------------------------------------------------------------------------
// Basic latching
// ---------------------------------------------------------------------------

#[test]
fn present_at_zero_updates_at_first_vsync() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();

    h.run_until(ms(10) - Duration(1));
    assert_eq!(h.updater.update_sessions_call_count(), 0);

    h.run_until(ms(10));
    assert_eq!(h.updater.update_sessions_call_count(), 1);
    assert_eq!(h.updater.update_times(), [ms(10)]);
    assert_eq!(h.renderer().render_count(), 1);
    assert_eq!(h.renderer().requests()[0].target_presentation_time, ms(10));
}

#[test]
fn update_lands_on_first_vsync_at_or_after_request() {
    for (requested, expected) in [
        (HostTime(0), ms(10)),
        (HostTime(1), ms(10)),
        (ms(5), ms(10)),
        (ms(10), ms(10)),
        (ms(12), ms(20)),
        (ms(25), ms(30)),
    ] {
        let mut h = Harness::new();
        h.present(S1, requested).unwrap();
        h.run_until(ms(100));
        assert_eq!(
            h.updater.update_times(),
            [expected],
            "requested at {requested:?}"
        );
    }
}

#[test]
fn squashed_presents_share_one_update() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();
    let second = h.present(S1, HostTime(0)).unwrap();

    h.run_until(ms(10));
    assert_eq!(h.updater.update_sessions_call_count(), 1);
    assert_eq!(
        h.updater.last_sessions_to_update().get(&S1),
        Some(&second),
        "only the latest present is applied"
    );

    h.end_frame().unwrap();
    assert_eq!(h.updater.on_frame_presented_call_count(), 1);
    assert_eq!(h.updater.last_latched_count(), 2);
}

#[test]
fn later_request_waits_for_its_own_vsync() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();
    let later = h.present(S1, ms(15)).unwrap();

    h.run_until(ms(10));
    assert_eq!(h.updater.last_sessions_to_update().get(&S1), Some(&PresentId(1)));
    h.end_frame().unwrap();

    h.run_until(ms(20));
    assert_eq!(h.updater.update_times(), [ms(10), ms(20)]);
    assert_eq!(h.updater.last_sessions_to_update().get(&S1), Some(&later));
}

#[test]
fn sessions_latch_together() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();
    h.present(S2, HostTime(0)).unwrap();

    h.run_until(ms(10));
    let sessions = h.updater.last_sessions_to_update();
    assert_eq!(sessions.len(), 2);
    assert_eq!(h.updater.trace_ids(), [1]);

    h.end_frame().unwrap();
    let latched = h.updater.last_latched_times();
    assert_eq!(latched[&S1][&PresentId(1)], ms(10));
    assert_eq!(latched[&S2][&PresentId(1)], ms(10));
    assert_eq!(h.updater.last_presented_time(), Some(ms(10)));
}

#[test]
fn scheduling_errors_are_reported() {
    let mut h = Harness::new();
    assert_eq!(
        h.schedule(S1, PresentId(1), HostTime(0)),
        Err(SchedulerError::UnregisteredPresent(SchedulingIdPair::new(
            S1,
            PresentId(1)
        )))
    );

    let first = h.register(S1);
    let second = h.register(S1);
    h.schedule(S1, second, HostTime(0)).unwrap();
    assert_eq!(
        h.schedule(S1, first, HostTime(0)),
        Err(SchedulerError::OutOfOrderPresent {
            id: SchedulingIdPair::new(S1, first),
            last_scheduled: second,
        })
    );

    h.run_until(ms(10));
    assert_eq!(h.updater.update_sessions_call_count(), 1);
}

// ---------------------------------------------------------------------------
// Renderer interplay
// ---------------------------------------------------------------------------

#[test]
fn present_during_render_goes_out_with_next_frame() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();
    h.present(S1, ms(20)).unwrap();

    h.run_until(ms(10));
    assert_eq!(h.renderer().render_count(), 1);
    assert_eq!(h.scheduler.state(), FrameState::Rendering);

    h.run_until(ms(20));
    assert_eq!(h.updater.update_sessions_call_count(), 2);
    assert_eq!(h.renderer().render_count(), 1, "renderer is still busy");
    assert_eq!(h.scheduler.stats().deferred_renders, 1);
    assert_eq!(
        h.scheduler.state(),
        FrameState::Rendering,
        "a latch during a render leaves the render in flight"
    );

    // An 11 ms render predicts a 5 ms render (half the interval), which
    // still fits before the 30 ms vsync.
    h.run_until(ms(21));
    assert_eq!(h.end_frame(), Some(FrameNumber(1)));
    assert_eq!(h.updater.last_latched_count(), 1);
    assert_eq!(h.scheduler.predicted_render_duration(), Duration::from_millis(5));
    assert_eq!(h.scheduler.next_deadline(), Some(ms(30)));

    h.run_until(ms(30));
    assert_eq!(h.renderer().render_count(), 2);
    assert_eq!(h.end_frame(), Some(FrameNumber(2)));
    assert_eq!(h.updater.on_frame_presented_call_count(), 2);
    let latched = h.updater.last_latched_times();
    assert_eq!(latched[&S1].keys().copied().collect::<Vec<_>>(), [PresentId(2)]);
    assert_eq!(latched[&S1][&PresentId(2)], ms(20), "latched at its own vsync");
}

#[test]
fn delayed_rendering_accumulates_latches() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();
    h.present(S1, ms(20)).unwrap();
    h.present(S1, ms(30)).unwrap();
    h.present(S1, ms(40)).unwrap();

    h.run_until(ms(40));
    assert_eq!(h.updater.update_times(), [ms(10), ms(20), ms(30), ms(40)]);
    assert_eq!(h.renderer().render_count(), 1);
    assert_eq!(h.scheduler.stats().deferred_renders, 3);

    h.run_until(ms(41));
    h.end_frame().unwrap();
    assert_eq!(h.updater.last_latched_count(), 1);

    h.run_until(ms(50));
    assert_eq!(h.renderer().render_count(), 2);
    h.end_frame().unwrap();
    let latched = h.updater.last_latched_times();
    assert_eq!(h.updater.last_latched_count(), 3);
    assert_eq!(latched[&S1][&PresentId(2)], ms(20));
    assert_eq!(latched[&S1][&PresentId(3)], ms(30));
    assert_eq!(latched[&S1][&PresentId(4)], ms(40));
}

#[test]
fn dropped_frame_is_retried_with_merged_latches() {
    let mut h = Harness::new();
    let fences = FenceLog::new();
    present_with_fence(&mut h, S1, &fences, 1, HostTime(0));
    h.run_until(ms(10));

    h.run_until(ms(11));
    present_with_fence(&mut h, S1, &fences, 2, HostTime(0));
    assert_eq!(h.scheduler.next_deadline(), Some(ms(20)));

    h.run_until(ms(12));
    assert_eq!(h.drop_frame(), Some(FrameNumber(1)));
    assert_eq!(h.updater.on_frame_presented_call_count(), 0);
    assert_eq!(h.scheduler.next_deadline(), Some(ms(20)));

    h.run_until(ms(20));
    assert_eq!(h.renderer().render_count(), 2);
    assert_eq!(h.renderer().requests()[1].frame_number, FrameNumber(2));
    assert_eq!(fences.signaled(), [1]);

    h.end_frame().unwrap();
    let latched = h.updater.last_latched_times();
    assert_eq!(h.updater.last_latched_count(), 2);
    assert_eq!(latched[&S1][&PresentId(1)], ms(10));
    assert_eq!(latched[&S1][&PresentId(2)], ms(20));
    assert_eq!(h.scheduler.stats().frames_dropped, 1);
}

#[test]
fn dropped_frame_is_rendered_again_without_new_presents() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(10));
    h.drop_frame().unwrap();

    h.run_until(ms(20));
    assert_eq!(h.updater.update_sessions_call_count(), 1, "no second latch");
    assert_eq!(h.renderer().render_count(), 2);
    h.end_frame().unwrap();
    assert_eq!(h.updater.last_latched_times()[&S1][&PresentId(1)], ms(10));
}

#[test]
fn rejected_render_is_retried_next_vsync() {
    let mut h = Harness::new();
    h.scheduler.renderer_mut().reject_next(1);
    h.present(S1, HostTime(0)).unwrap();

    h.run_until(ms(10));
    assert_eq!(h.renderer().render_count(), 0);
    assert_eq!(h.scheduler.stats().renders_rejected, 1);
    assert_eq!(h.scheduler.last_frame_number(), Some(FrameNumber(1)));

    h.run_until(ms(20));
    assert_eq!(h.renderer().render_count(), 1);
    assert_eq!(h.renderer().requests()[0].frame_number, FrameNumber(2));
    h.end_frame().unwrap();
    assert_eq!(h.updater.last_latched_times()[&S1][&PresentId(1)], ms(10));
}

#[test]
fn long_render_pushes_next_latch_one_vsync() {
    let mut h = Harness::with_config(SchedulerConfig::new(), Duration::from_millis(100));
    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(100));
    assert_eq!(h.updater.update_sessions_call_count(), 1);

    h.run_until(ms(191));
    h.end_frame().unwrap();
    assert_eq!(h.scheduler.predicted_render_duration(), Duration::from_millis(50));

    // 200 ms is only 9 ms away, too close for a 50 ms render.
    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(200));
    assert_eq!(h.updater.update_sessions_call_count(), 1);
    h.run_until(ms(299));
    assert_eq!(h.updater.update_sessions_call_count(), 1);
    h.run_until(ms(300));
    assert_eq!(h.updater.update_sessions_call_count(), 2);
}

#[test]
fn render_continuously_renders_every_free_vsync() {
    let mut h = Harness::new();
    h.scheduler.set_render_continuously(true);

    h.run_until(ms(10));
    assert_eq!(h.renderer().render_count(), 1);
    h.end_frame().unwrap();

    h.run_until(ms(20));
    assert_eq!(h.renderer().render_count(), 2);
    h.run_until(ms(30));
    assert_eq!(h.renderer().render_count(), 2, "busy renderer skips vsyncs");
    h.end_frame().unwrap();

    assert_eq!(h.updater.update_sessions_call_count(), 0);
    assert_eq!(h.updater.on_frame_presented_call_count(), 2);
    assert!(h.updater.last_latched_times().is_empty());

    h.scheduler.set_render_continuously(false);
    assert_eq!(h.scheduler.next_deadline(), None);
    h.run_until(ms(60));
    assert_eq!(h.renderer().render_count(), 2);
}

// ---------------------------------------------------------------------------
// Release fences
// ---------------------------------------------------------------------------

#[test]
fn fences_release_when_next_present_latches() {
    let mut h = Harness::new();
    let fences = FenceLog::new();

    present_with_fence(&mut h, S1, &fences, 1, HostTime(0));
    h.run_until(ms(10));
    h.end_frame().unwrap();
    assert!(fences.signaled().is_empty(), "still on screen");

    present_with_fence(&mut h, S1, &fences, 2, HostTime(0));
    h.run_until(ms(20));
    assert_eq!(fences.signaled(), [1]);
    h.end_frame().unwrap();

    present_with_fence(&mut h, S1, &fences, 3, HostTime(0));
    h.run_until(ms(30));
    h.end_frame().unwrap();
    assert_eq!(fences.signaled(), [1, 2]);

    drop(h);
    assert_eq!(fences.signaled(), [1, 2, 3]);
}

#[test]
fn squashed_present_fence_released_at_latch() {
    let mut h = Harness::new();
    let fences = FenceLog::new();
    present_with_fence(&mut h, S1, &fences, 1, HostTime(0));
    present_with_fence(&mut h, S1, &fences, 2, HostTime(0));

    h.run_until(ms(10));
    assert_eq!(fences.signaled(), [1]);
    assert_eq!(h.scheduler.outstanding_fence_sets(), 1);
}

#[test]
fn skipped_presents_release_when_later_present_latches() {
    let mut h = Harness::new();
    let fences = FenceLog::new();
    for tag in 1..=3 {
        h.register_with_fence(S1, &fences, tag);
    }
    present_with_fence(&mut h, S1, &fences, 4, HostTime(0));
    h.register_with_fence(S1, &fences, 5);

    h.run_until(ms(10));
    assert_eq!(fences.signaled(), [1, 2, 3]);
    assert!(!fences.is_signaled(5), "registered after the latched present");
}

#[test]
fn fences_of_other_sessions_are_untouched() {
    let mut h = Harness::new();
    let fences = FenceLog::new();
    h.register_with_fence(S2, &fences, 20);
    present_with_fence(&mut h, S1, &fences, 1, HostTime(0));
    present_with_fence(&mut h, S1, &fences, 2, HostTime(0));

    h.run_until(ms(10));
    assert_eq!(fences.signaled(), [1]);
}

#[test]
fn remove_session_releases_fences_and_pending_presents() {
    let mut h = Harness::new();
    let fences = FenceLog::new();
    present_with_fence(&mut h, S1, &fences, 1, ms(20));
    present_with_fence(&mut h, S2, &fences, 2, ms(20));

    h.scheduler.remove_session(S1);
    assert_eq!(fences.signaled(), [1]);
    assert_eq!(h.scheduler.next_deadline(), Some(ms(20)));

    h.run_until(ms(20));
    let sessions = h.updater.last_sessions_to_update();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions.get(&S2), Some(&PresentId(1)));
}

#[test]
fn removing_last_session_disarms() {
    let mut h = Harness::new();
    h.present(S1, HostTime(0)).unwrap();
    h.scheduler.remove_session(S1);
    assert_eq!(h.scheduler.next_deadline(), None);

    // Ids keep counting after removal.
    assert_eq!(h.register(S1), PresentId(2));
}

#[test]
fn removed_session_ids_cannot_be_scheduled_again() {
    let mut h = Harness::new();
    let first = h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(10));
    assert_eq!(h.end_frame(), Some(FrameNumber(1)));
    assert_eq!(h.updater.update_sessions_call_count(), 1);

    h.scheduler.remove_session(S1);
    assert_eq!(
        h.schedule(S1, first, HostTime(0)),
        Err(SchedulerError::UnregisteredPresent(SchedulingIdPair::new(S1, first)))
    );

    // A present registered before removal but never scheduled is retired too.
    let mut h = Harness::new();
    let unscheduled = h.register(S1);
    h.scheduler.remove_session(S1);
    assert!(h.schedule(S1, unscheduled, HostTime(0)).is_err());

    // The session can come back with fresh ids.
    let fresh = h.register(S1);
    assert_eq!(fresh, PresentId(2));
    h.schedule(S1, fresh, HostTime(0)).unwrap();
    h.run_until(ms(30));
    assert_eq!(h.updater.update_sessions_call_count(), 1);
    assert_eq!(h.updater.last_sessions_to_update().get(&S1), Some(&fresh));
}

#[test]
fn dropping_scheduler_releases_everything() {
    let fences = FenceLog::new();
    {
        let mut h = Harness::new();
        present_with_fence(&mut h, S1, &fences, 1, HostTime(0));
        h.register_with_fence(S2, &fences, 2);
        h.run_until(ms(10));
        assert!(fences.signaled().is_empty());
    }
    let mut signaled = fences.signaled();
    signaled.sort_unstable();
    assert_eq!(signaled, [1, 2]);
}

// ---------------------------------------------------------------------------
// Failed updates
// ---------------------------------------------------------------------------

#[test]
fn failed_session_is_excluded_by_default() {
    let mut h = Harness::new();
    let fences = FenceLog::new();
    h.updater.fail_session(S2);
    h.present(S1, HostTime(0)).unwrap();
    present_with_fence(&mut h, S2, &fences, 1, HostTime(0));
    present_with_fence(&mut h, S2, &fences, 2, HostTime(0));

    h.run_until(ms(10));
    assert!(fences.signaled().is_empty(), "failed update supersedes nothing");
    h.end_frame().unwrap();
    let latched = h.updater.last_latched_times();
    assert!(latched.contains_key(&S1));
    assert!(!latched.contains_key(&S2));
}

#[test]
fn failed_session_is_reported_when_configured() {
    let config = SchedulerConfig::new().with_failed_update_policy(FailedUpdatePolicy::Report);
    let mut h = Harness::with_config(config, Duration::from_millis(10));
    let fences = FenceLog::new();
    h.updater.fail_session(S2);
    present_with_fence(&mut h, S2, &fences, 1, HostTime(0));
    present_with_fence(&mut h, S2, &fences, 2, HostTime(0));

    h.run_until(ms(10));
    assert_eq!(fences.signaled(), [1]);
    h.end_frame().unwrap();
    assert_eq!(h.updater.last_latched_count(), 2);
}

// ---------------------------------------------------------------------------
// Updater lifetimes
// ---------------------------------------------------------------------------

#[test]
fn updater_added_during_update_waits_for_next_latch() {
    let mut h = Harness::new();
    let late = Rc::new(MockSessionUpdater::new());
    let added = Rc::new(Cell::new(false));
    {
        let updaters = h.scheduler.updaters();
        let late = late.clone();
        let added = added.clone();
        h.updater.set_update_hook(move || {
            if !added.replace(true) {
                updaters.add(&late);
            }
        });
    }

    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(10));
    assert_eq!(h.updater.update_sessions_call_count(), 1);
    assert_eq!(late.update_sessions_call_count(), 0);

    h.end_frame().unwrap();
    assert_eq!(late.on_frame_presented_call_count(), 1);

    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(20));
    assert_eq!(h.updater.update_sessions_call_count(), 2);
    assert_eq!(late.update_sessions_call_count(), 1);
}

#[test]
fn updater_dropped_during_update_is_skipped() {
    let mut h = Harness::new();
    let log = CallLog::new();
    let first = Rc::new(MockSessionUpdater::new().with_log(log.clone(), "first"));
    let second = Rc::new(MockSessionUpdater::new().with_log(log.clone(), "second"));
    h.scheduler.add_session_updater(&first);
    h.scheduler.add_session_updater(&second);

    let weak_second = Rc::downgrade(&second);
    let slot = Rc::new(RefCell::new(Some(second)));
    {
        let slot = slot.clone();
        first.set_update_hook(move || drop(slot.borrow_mut().take()));
    }

    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(10));
    assert_eq!(log.entries(), ["first"]);
    assert!(weak_second.upgrade().is_none());
}

#[test]
fn updaters_follow_registration_order_and_lifetime() {
    let mut h = Harness::new();
    let log = CallLog::new();
    let a = Rc::new(MockSessionUpdater::new().with_log(log.clone(), "a"));
    let b = Rc::new(MockSessionUpdater::new().with_log(log.clone(), "b"));
    h.scheduler.add_session_updater(&a);
    h.scheduler.add_session_updater(&b);

    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(10));
    h.end_frame().unwrap();
    assert_eq!(log.entries(), ["a", "b"]);

    drop(a);
    let c = Rc::new(MockSessionUpdater::new().with_log(log.clone(), "c"));
    h.scheduler.add_session_updater(&c);
    log.clear();

    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(20));
    assert_eq!(log.entries(), ["b", "c"]);
    assert_eq!(h.scheduler.updaters().live_count(), 3);
}

// ---------------------------------------------------------------------------
// Presentation predictions
// ---------------------------------------------------------------------------

#[test]
fn future_presentation_infos_are_bounded() {
    let config = SchedulerConfig {
        max_presentation_infos: 1_000,
        ..SchedulerConfig::new()
    };
    let h = Harness::with_config(config, Duration::from_millis(10));
    let infos: Vec<_> = h
        .scheduler
        .future_presentation_infos(Duration(u64::MAX))
        .collect();
    assert_eq!(infos.len(), 100);
    assert_eq!(infos[0].presentation_time, ms(10));
    for pair in infos.windows(2) {
        assert!(pair[0].presentation_time < pair[1].presentation_time);
    }
    for info in &infos {
        assert!(info.latch_point < info.presentation_time);
    }
}

#[test]
fn future_presentation_infos_cover_requested_span() {
    let mut h = Harness::new();
    h.run_until(ms(5));
    let infos: Vec<_> = h
        .scheduler
        .future_presentation_infos(Duration::from_millis(25))
        .collect();
    let times: Vec<_> = infos.iter().map(|i| i.presentation_time).collect();
    assert_eq!(times, [ms(10), ms(20), ms(30)]);
    assert!(infos.iter().all(|i| i.latch_point >= ms(5)));
}

#[test]
fn zero_interval_still_schedules() {
    let mut h = Harness::with_config(SchedulerConfig::new(), Duration(0));
    assert_eq!(
        h.scheduler
            .future_presentation_infos(Duration::from_secs(1))
            .count(),
        1
    );
    h.present(S1, HostTime(0)).unwrap();
    assert_eq!(h.scheduler.next_deadline(), Some(HostTime(1)));
    h.run_until(HostTime(1));
    assert_eq!(h.updater.update_times(), [HostTime(1)]);
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

#[test]
fn trace_sink_sees_frame_lifecycle() {
    let mut h = Harness::new();
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    h.scheduler.set_trace_sink(Some(Box::new(recorder.clone())));

    h.present(S1, HostTime(0)).unwrap();
    h.run_until(ms(10));
    h.run_until(ms(12));
    h.end_frame().unwrap();

    let recorder = recorder.borrow();
    let events: Vec<_> = decode(recorder.as_bytes()).collect();
    assert_eq!(events.len(), 5, "got {events:?}");
    assert!(matches!(events[0], RecordedEvent::Schedule(e) if e.target_vsync == ms(10)));
    assert!(matches!(events[1], RecordedEvent::Latch(e) if e.presents == 1));
    assert!(matches!(events[2], RecordedEvent::RenderBegin(e) if e.frame_number == FrameNumber(1)));
    assert!(matches!(
        events[3],
        RecordedEvent::FramePresented(e) if e.render_done_time == ms(12)
    ));
    assert!(matches!(
        events[4],
        RecordedEvent::FrameSummary(s) if s.missed_target && s.predicted_render == Duration(0)
    ));
}
