// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for cadence
//! diagnostics.
//!
//! This crate provides [`TraceSink`](cadence_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`FanOutSink`]: forwards every event to several sinks.

pub mod chrome;
pub mod pretty;
pub mod recorder;

use cadence_core::trace::{
    FencesSignaledEvent, FrameDroppedEvent, FramePresentedEvent, FrameSummary, LatchEvent,
    RenderBeginEvent, ScheduleEvent, TraceSink,
};

/// Forwards each event to every contained sink, in insertion order.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn TraceSink>>,
}

impl std::fmt::Debug for FanOutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanOutSink {
    /// Creates a sink with no targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target.
    #[must_use]
    pub fn with(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl TraceSink for FanOutSink {
    fn on_schedule(&mut self, e: &ScheduleEvent) {
        self.sinks.iter_mut().for_each(|s| s.on_schedule(e));
    }

    fn on_latch(&mut self, e: &LatchEvent) {
        self.sinks.iter_mut().for_each(|s| s.on_latch(e));
    }

    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        self.sinks.iter_mut().for_each(|s| s.on_render_begin(e));
    }

    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        self.sinks.iter_mut().for_each(|s| s.on_frame_presented(e));
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.sinks.iter_mut().for_each(|s| s.on_frame_dropped(e));
    }

    fn on_fences_signaled(&mut self, e: &FencesSignaledEvent) {
        self.sinks.iter_mut().for_each(|s| s.on_fences_signaled(e));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.sinks.iter_mut().for_each(|sink| sink.on_frame_summary(s));
    }
}
