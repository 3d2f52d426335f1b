// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in microseconds.

use std::io::Write;

use cadence_core::time::HostTime;
use cadence_core::trace::{
    FencesSignaledEvent, FrameDroppedEvent, FramePresentedEvent, FrameSummary, LatchEvent,
    RenderBeginEvent, ScheduleEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_schedule(&mut self, e: &ScheduleEvent) {
        let _ = writeln!(
            self.writer,
            "[schedule] {} requested={:.1}µs target={:.1}µs now={:.1}µs",
            e.id,
            us(e.requested_presentation_time),
            us(e.target_vsync),
            us(e.now),
        );
    }

    fn on_latch(&mut self, e: &LatchEvent) {
        let _ = writeln!(
            self.writer,
            "[latch] trace={} at {:.1}µs for {:.1}µs sessions={} presents={} failed={}",
            e.trace_id,
            us(e.latch_time),
            us(e.target_vsync),
            e.sessions,
            e.presents,
            e.failed_sessions,
        );
    }

    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[render] frame={} trace={} target={:.1}µs presents={}",
            e.frame_number.0,
            e.trace_id,
            us(e.target_presentation_time),
            e.presents,
        );
    }

    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        let _ = writeln!(
            self.writer,
            "[presented] frame={} render={:.1}µs shown={:.1}µs presents={}",
            e.frame_number.0,
            e.render_done_time
                .saturating_duration_since(e.render_start)
                .as_micros_f64(),
            us(e.actual_presentation_time),
            e.presents,
        );
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        let how = if e.rejected { "rejected" } else { "dropped" };
        let _ = writeln!(
            self.writer,
            "[dropped] frame={} {how} at {:.1}µs",
            e.frame_number.0,
            us(e.now),
        );
    }

    fn on_fences_signaled(&mut self, e: &FencesSignaledEvent) {
        let _ = writeln!(
            self.writer,
            "[fences] session={} count={} below={}",
            e.session_id.0, e.count, e.below.0,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let missed = if s.missed_target { "MISSED" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} latch={:.1}µs render={:.1}µs predicted={:.1}µs target={missed}",
            s.frame_number.0,
            us(s.latch_time),
            s.render_done_time
                .saturating_duration_since(s.render_start)
                .as_micros_f64(),
            s.predicted_render.as_micros_f64(),
        );
    }
}
