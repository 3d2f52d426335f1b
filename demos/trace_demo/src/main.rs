// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Real-time frame loop that exercises the tracing and diagnostics pipeline.
//!
//! Two producer sessions feed a scheduler running on the POSIX event loop at
//! 60 Hz. Session 1 submits a new present as soon as its previous one is on
//! screen; session 2 submits every 50 ms, aimed two vsyncs out. A worker
//! thread plays the GPU: it takes a few milliseconds per frame and drops
//! every seventeenth one.
//!
//! Events go to a [`PrettyPrintSink`] on stderr and a [`RecorderSink`],
//! which is exported as `trace.json` (Chrome Trace Event Format) at the end.
//! Set `RUST_LOG=debug` to see the scheduler's own logging as well.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;
use std::thread::JoinHandle;

use cadence_backend_posix::{
    CompletionSender, EventLoop, EventLoopConfig, PosixClock, completion_channel, now,
};
use cadence_core::fence::ReleaseFence;
use cadence_core::renderer::{FrameRenderer, RenderRequest, Timestamps};
use cadence_core::scheduler::{FrameScheduler, SchedulerConfig};
use cadence_core::session::{PresentId, SchedulingIdPair, SessionId};
use cadence_core::time::{Duration, HostTime};
use cadence_core::updater::{LatchedTimes, SessionUpdater, UpdateResults};
use cadence_core::vsync::{DEFAULT_VSYNC_INTERVAL, VsyncTiming};
use cadence_debug::FanOutSink;
use cadence_debug::pretty::PrettyPrintSink;
use cadence_debug::recorder::RecorderSink;
use crossbeam_channel::{Sender, bounded};

const FRAME_COUNT: u64 = 60;
const EAGER: SessionId = SessionId(1);
const PERIODIC: SessionId = SessionId(2);
const PERIODIC_EVERY: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Fake GPU
// ---------------------------------------------------------------------------

/// Hands frames to a worker thread that pretends to render them.
struct ThreadedRenderer {
    requests: Option<Sender<RenderRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedRenderer {
    fn spawn(completions: CompletionSender, interval: Duration) -> Self {
        let (tx, rx) = bounded::<RenderRequest>(1);
        let worker = std::thread::spawn(move || {
            for request in rx {
                let frame = request.frame_number;
                if frame.0 % 17 == 0 {
                    log::info!("worker dropping frame {frame}");
                    if completions.dropped(frame).is_err() {
                        return;
                    }
                    continue;
                }
                // 2 to 6 ms of "work".
                let cost = 2 + frame.0 % 5;
                std::thread::sleep(std::time::Duration::from_millis(cost));

                let done = now();
                let timestamps = Timestamps {
                    render_done_time: done,
                    actual_presentation_time: next_vsync(
                        request.target_presentation_time,
                        interval,
                        done,
                    ),
                };
                if completions.presented(frame, timestamps).is_err() {
                    return;
                }
            }
        });
        Self {
            requests: Some(tx),
            worker: Some(worker),
        }
    }
}

/// First vsync on `target`'s grid at or after `done`.
fn next_vsync(target: HostTime, interval: Duration, done: HostTime) -> HostTime {
    if done <= target || interval.is_zero() {
        return target;
    }
    let late = done.saturating_duration_since(target).nanos();
    let steps = late.div_ceil(interval.nanos());
    target.saturating_add(interval.saturating_mul(steps))
}

impl FrameRenderer for ThreadedRenderer {
    fn render_frame(&mut self, request: &RenderRequest) -> bool {
        self.requests
            .as_ref()
            .is_some_and(|tx| tx.try_send(*request).is_ok())
    }
}

impl Drop for ThreadedRenderer {
    fn drop(&mut self) {
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("render worker panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

/// Applies latched presents (by logging them) and remembers which sessions
/// still wait for theirs to reach the screen.
#[derive(Default)]
struct Compositor {
    awaiting: RefCell<BTreeSet<SessionId>>,
    frames_shown: Cell<u64>,
}

impl SessionUpdater for Compositor {
    fn update_sessions(
        &self,
        sessions_to_update: &BTreeMap<SessionId, PresentId>,
        trace_id: u64,
    ) -> UpdateResults {
        for (session_id, present_id) in sessions_to_update {
            log::debug!("applying {session_id}/{present_id} (trace {trace_id})");
        }
        UpdateResults::default()
    }

    fn on_frame_presented(&self, latched_times: &LatchedTimes, presented_time: HostTime) {
        self.frames_shown.set(self.frames_shown.get() + 1);
        let mut awaiting = self.awaiting.borrow_mut();
        for session_id in latched_times.keys() {
            awaiting.remove(session_id);
        }
        log::debug!("frame shown at {presented_time:?}");
    }
}

fn submit(
    scheduler: &mut FrameScheduler<ThreadedRenderer>,
    session_id: SessionId,
    requested: HostTime,
    released: &Rc<Cell<u64>>,
) {
    let released = released.clone();
    let fence: Box<dyn ReleaseFence> = Box::new(move || released.set(released.get() + 1));
    let id = scheduler.register_present(session_id, vec![fence]);
    scheduler
        .schedule_update_for_session(requested, SchedulingIdPair::new(session_id, id))
        .expect("freshly registered ids are always schedulable");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // -- sinks -------------------------------------------------------------
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    let sink = FanOutSink::new()
        .with(Box::new(PrettyPrintSink::stderr()))
        .with(Box::new(recorder.clone()));

    // -- scheduler + loop --------------------------------------------------
    let config = EventLoopConfig::new();
    let (completions, receiver) = completion_channel(config.completion_capacity);
    let interval = DEFAULT_VSYNC_INTERVAL;
    let renderer = ThreadedRenderer::spawn(completions, interval);
    let vsync = Rc::new(VsyncTiming::new(
        Rc::new(PosixClock::monotonic()),
        now(),
        interval,
    ));
    let mut scheduler = FrameScheduler::new(SchedulerConfig::new(), vsync, renderer);
    scheduler.set_trace_sink(Some(Box::new(sink)));

    let compositor = Rc::new(Compositor::default());
    scheduler.add_session_updater(&compositor);
    let mut event_loop = EventLoop::new(config, scheduler, receiver);

    // -- producers ---------------------------------------------------------
    let released = Rc::new(Cell::new(0_u64));
    let mut next_periodic = now();
    event_loop
        .run_while(|scheduler| {
            let t = scheduler.vsync().now();
            if !compositor.awaiting.borrow().contains(&EAGER) {
                compositor.awaiting.borrow_mut().insert(EAGER);
                submit(scheduler, EAGER, t, &released);
            }
            if t >= next_periodic {
                let aim = t.saturating_add(interval.saturating_mul(2));
                submit(scheduler, PERIODIC, aim, &released);
                next_periodic = t.saturating_add(PERIODIC_EVERY);
            }
            compositor.frames_shown.get() < FRAME_COUNT
        })
        .expect("event loop failed");

    let stats = event_loop.scheduler().stats();
    log::info!("{stats:?}");
    drop(event_loop);
    println!(
        "{} frames shown, {} dropped, {} fence sets released",
        compositor.frames_shown.get(),
        stats.frames_dropped,
        released.get(),
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    cadence_debug::chrome::export(recorder.borrow().as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path}");
}
