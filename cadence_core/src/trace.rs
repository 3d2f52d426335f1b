// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame scheduler.
//!
//! This module provides a [`TraceSink`] trait with one method per scheduler
//! event. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing and installing a sink
//! just drops it. When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::session::{FrameNumber, PresentId, SchedulingIdPair, SessionId};
use crate::time::{Duration, HostTime};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a present is queued and a deadline is requested for it.
#[derive(Clone, Copy, Debug)]
pub struct ScheduleEvent {
    /// The scheduled present.
    pub id: SchedulingIdPair,
    /// When the producer wants it shown.
    pub requested_presentation_time: HostTime,
    /// The vsync the scheduler aimed for.
    pub target_vsync: HostTime,
    /// Host time of the call.
    pub now: HostTime,
}

/// Emitted after session updaters have applied a latch.
#[derive(Clone, Copy, Debug)]
pub struct LatchEvent {
    /// Id shared by the updaters and the render of this latch.
    pub trace_id: u64,
    /// When the latch happened.
    pub latch_time: HostTime,
    /// The armed vsync that triggered it.
    pub target_vsync: HostTime,
    /// Sessions passed to the updaters.
    pub sessions: u32,
    /// Presents latched across all sessions.
    pub presents: u32,
    /// Sessions whose update failed.
    pub failed_sessions: u32,
}

/// Emitted when a render is handed to the renderer.
#[derive(Clone, Copy, Debug)]
pub struct RenderBeginEvent {
    /// Frame counter.
    pub frame_number: FrameNumber,
    /// Trace id of the latch that produced the frame.
    pub trace_id: u64,
    /// Latch time of the frame.
    pub latch_time: HostTime,
    /// The vsync the frame is aimed at.
    pub target_presentation_time: HostTime,
    /// Presents carried by the frame.
    pub presents: u32,
}

/// Emitted when a frame is reported as shown.
#[derive(Clone, Copy, Debug)]
pub struct FramePresentedEvent {
    /// Frame counter.
    pub frame_number: FrameNumber,
    /// When the render was started.
    pub render_start: HostTime,
    /// When the renderer finished.
    pub render_done_time: HostTime,
    /// When the frame reached the display.
    pub actual_presentation_time: HostTime,
    /// Presents reported to the updaters.
    pub presents: u32,
}

/// Emitted when a frame did not reach the display.
#[derive(Clone, Copy, Debug)]
pub struct FrameDroppedEvent {
    /// Frame counter.
    pub frame_number: FrameNumber,
    /// Host time the drop was observed.
    pub now: HostTime,
    /// `true` if the renderer refused the frame outright.
    pub rejected: bool,
}

/// Emitted when superseded or orphaned release fences are signaled.
#[derive(Clone, Copy, Debug)]
pub struct FencesSignaledEvent {
    /// Owning session.
    pub session_id: SessionId,
    /// Fences of presents below this id were released.
    pub below: PresentId,
    /// Number of fence sets signaled.
    pub count: u32,
    /// Host time of signaling.
    pub now: HostTime,
}

/// Per-frame timing summary, emitted with each presented frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_number: FrameNumber,
    /// Latch time of the frame.
    pub latch_time: HostTime,
    /// The vsync the frame was aimed at.
    pub target_presentation_time: HostTime,
    /// Render start.
    pub render_start: HostTime,
    /// Render end.
    pub render_done_time: HostTime,
    /// When the frame reached the display.
    pub actual_presentation_time: HostTime,
    /// Render duration predicted when the frame was started.
    pub predicted_render: Duration,
    /// Whether the frame was shown after its target vsync.
    pub missed_target: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame scheduler.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a present is scheduled.
    fn on_schedule(&mut self, e: &ScheduleEvent) {
        _ = e;
    }

    /// Called after a latch was applied by the session updaters.
    fn on_latch(&mut self, e: &LatchEvent) {
        _ = e;
    }

    /// Called when a render starts.
    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        _ = e;
    }

    /// Called when a frame is shown.
    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        _ = e;
    }

    /// Called when a frame is dropped or rejected.
    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        _ = e;
    }

    /// Called when release fences are signaled.
    fn on_fences_signaled(&mut self, e: &FencesSignaledEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

/// Shared sinks let the owner read results back after installing a clone.
impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn on_schedule(&mut self, e: &ScheduleEvent) {
        self.borrow_mut().on_schedule(e);
    }

    fn on_latch(&mut self, e: &LatchEvent) {
        self.borrow_mut().on_latch(e);
    }

    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        self.borrow_mut().on_render_begin(e);
    }

    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        self.borrow_mut().on_frame_presented(e);
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.borrow_mut().on_frame_dropped(e);
    }

    fn on_fences_signaled(&mut self, e: &FencesSignaledEvent) {
        self.borrow_mut().on_fences_signaled(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.borrow_mut().on_frame_summary(s);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owner of an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        let mut tracer = Self::none();
        tracer.set_sink(Some(sink));
        tracer
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            #[cfg(feature = "trace")]
            sink: None,
        }
    }

    /// Replaces the sink, returning the previous one.
    ///
    /// Without the `trace` feature the new sink is dropped and `None` is
    /// returned.
    pub fn set_sink(&mut self, sink: Option<Box<dyn TraceSink>>) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            core::mem::replace(&mut self.sink, sink)
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            None
        }
    }

    /// Returns `true` if events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`ScheduleEvent`].
    #[inline]
    pub fn schedule(&mut self, e: &ScheduleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_schedule(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LatchEvent`].
    #[inline]
    pub fn latch(&mut self, e: &LatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_latch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderBeginEvent`].
    #[inline]
    pub fn render_begin(&mut self, e: &RenderBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FramePresentedEvent`].
    #[inline]
    pub fn frame_presented(&mut self, e: &FramePresentedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_presented(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameDroppedEvent`].
    #[inline]
    pub fn frame_dropped(&mut self, e: &FrameDroppedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_dropped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FencesSignaledEvent`].
    #[inline]
    pub fn fences_signaled(&mut self, e: &FencesSignaledEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_fences_signaled(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_latch() -> LatchEvent {
        LatchEvent {
            trace_id: 3,
            latch_time: HostTime(10_000_000),
            target_vsync: HostTime(10_000_000),
            sessions: 2,
            presents: 3,
            failed_sessions: 0,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_latch(&sample_latch());
        sink.on_frame_dropped(&FrameDroppedEvent {
            frame_number: FrameNumber(1),
            now: HostTime(0),
            rejected: false,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_enabled());
        tracer.latch(&sample_latch());
    }

    #[cfg(not(feature = "trace"))]
    #[test]
    fn sink_is_dropped_without_feature() {
        let mut tracer = Tracer::new(Box::new(NoopSink));
        assert!(!tracer.is_enabled());
        assert!(tracer.set_sink(None).is_none());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_shared_sink() {
        use alloc::vec::Vec;

        #[derive(Default)]
        struct RecordingSink {
            latches: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_latch(&mut self, e: &LatchEvent) {
                self.latches.push(e.trace_id);
            }
        }

        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let mut tracer = Tracer::new(Box::new(sink.clone()));
        assert!(tracer.is_enabled());
        tracer.latch(&sample_latch());
        assert_eq!(sink.borrow().latches, &[3]);

        assert!(tracer.set_sink(None).is_some(), "previous sink returned");
        tracer.latch(&sample_latch());
        assert_eq!(sink.borrow().latches.len(), 1);
    }
}
