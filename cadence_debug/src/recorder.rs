// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each starting with a one
//! byte tag. [`decode`] reads them back as an iterator of [`RecordedEvent`].

use cadence_core::session::{FrameNumber, PresentId, SchedulingIdPair, SessionId};
use cadence_core::time::{Duration, HostTime};
use cadence_core::trace::{
    FencesSignaledEvent, FrameDroppedEvent, FramePresentedEvent, FrameSummary, LatchEvent,
    RenderBeginEvent, ScheduleEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SCHEDULE: u8 = 1;
const TAG_LATCH: u8 = 2;
const TAG_RENDER_BEGIN: u8 = 3;
const TAG_FRAME_PRESENTED: u8 = 4;
const TAG_FRAME_DROPPED: u8 = 5;
const TAG_FENCES_SIGNALED: u8 = 6;
const TAG_FRAME_SUMMARY: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.nanos());
    }
}

impl TraceSink for RecorderSink {
    fn on_schedule(&mut self, e: &ScheduleEvent) {
        self.write_u8(TAG_SCHEDULE);
        self.write_u64(e.id.session_id.0);
        self.write_u64(e.id.present_id.0);
        self.write_time(e.requested_presentation_time);
        self.write_time(e.target_vsync);
        self.write_time(e.now);
    }

    fn on_latch(&mut self, e: &LatchEvent) {
        self.write_u8(TAG_LATCH);
        self.write_u64(e.trace_id);
        self.write_time(e.latch_time);
        self.write_time(e.target_vsync);
        self.write_u32(e.sessions);
        self.write_u32(e.presents);
        self.write_u32(e.failed_sessions);
    }

    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        self.write_u8(TAG_RENDER_BEGIN);
        self.write_u64(e.frame_number.0);
        self.write_u64(e.trace_id);
        self.write_time(e.latch_time);
        self.write_time(e.target_presentation_time);
        self.write_u32(e.presents);
    }

    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        self.write_u8(TAG_FRAME_PRESENTED);
        self.write_u64(e.frame_number.0);
        self.write_time(e.render_start);
        self.write_time(e.render_done_time);
        self.write_time(e.actual_presentation_time);
        self.write_u32(e.presents);
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.write_u8(TAG_FRAME_DROPPED);
        self.write_u64(e.frame_number.0);
        self.write_time(e.now);
        self.write_u8(u8::from(e.rejected));
    }

    fn on_fences_signaled(&mut self, e: &FencesSignaledEvent) {
        self.write_u8(TAG_FENCES_SIGNALED);
        self.write_u64(e.session_id.0);
        self.write_u64(e.below.0);
        self.write_u32(e.count);
        self.write_time(e.now);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_number.0);
        self.write_time(s.latch_time);
        self.write_time(s.target_presentation_time);
        self.write_time(s.render_start);
        self.write_time(s.render_done_time);
        self.write_time(s.actual_presentation_time);
        self.write_u64(s.predicted_render.nanos());
        self.write_u8(u8::from(s.missed_target));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`ScheduleEvent`].
    Schedule(ScheduleEvent),
    /// A [`LatchEvent`].
    Latch(LatchEvent),
    /// A [`RenderBeginEvent`].
    RenderBegin(RenderBeginEvent),
    /// A [`FramePresentedEvent`].
    FramePresented(FramePresentedEvent),
    /// A [`FrameDroppedEvent`].
    FrameDropped(FrameDroppedEvent),
    /// A [`FencesSignaledEvent`].
    FencesSignaled(FencesSignaledEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes: [u8; N] = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn decode_schedule(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Schedule(ScheduleEvent {
            id: SchedulingIdPair::new(SessionId(self.read_u64()?), PresentId(self.read_u64()?)),
            requested_presentation_time: self.read_time()?,
            target_vsync: self.read_time()?,
            now: self.read_time()?,
        }))
    }

    fn decode_latch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Latch(LatchEvent {
            trace_id: self.read_u64()?,
            latch_time: self.read_time()?,
            target_vsync: self.read_time()?,
            sessions: self.read_u32()?,
            presents: self.read_u32()?,
            failed_sessions: self.read_u32()?,
        }))
    }

    fn decode_render_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderBegin(RenderBeginEvent {
            frame_number: FrameNumber(self.read_u64()?),
            trace_id: self.read_u64()?,
            latch_time: self.read_time()?,
            target_presentation_time: self.read_time()?,
            presents: self.read_u32()?,
        }))
    }

    fn decode_frame_presented(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FramePresented(FramePresentedEvent {
            frame_number: FrameNumber(self.read_u64()?),
            render_start: self.read_time()?,
            render_done_time: self.read_time()?,
            actual_presentation_time: self.read_time()?,
            presents: self.read_u32()?,
        }))
    }

    fn decode_frame_dropped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameDropped(FrameDroppedEvent {
            frame_number: FrameNumber(self.read_u64()?),
            now: self.read_time()?,
            rejected: self.read_u8()? != 0,
        }))
    }

    fn decode_fences_signaled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FencesSignaled(FencesSignaledEvent {
            session_id: SessionId(self.read_u64()?),
            below: PresentId(self.read_u64()?),
            count: self.read_u32()?,
            now: self.read_time()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_number: FrameNumber(self.read_u64()?),
            latch_time: self.read_time()?,
            target_presentation_time: self.read_time()?,
            render_start: self.read_time()?,
            render_done_time: self.read_time()?,
            actual_presentation_time: self.read_time()?,
            predicted_render: Duration(self.read_u64()?),
            missed_target: self.read_u8()? != 0,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_SCHEDULE => self.decode_schedule(),
            TAG_LATCH => self.decode_latch(),
            TAG_RENDER_BEGIN => self.decode_render_begin(),
            TAG_FRAME_PRESENTED => self.decode_frame_presented(),
            TAG_FRAME_DROPPED => self.decode_frame_dropped(),
            TAG_FENCES_SIGNALED => self.decode_fences_signaled(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
