// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Renders become complete (`"X"`) slices on the render track; everything
//! else is an instant event on the scheduler track.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use cadence_core::time::HostTime;

use crate::recorder::{RecordedEvent, decode};

const SCHEDULER_TID: u32 = 0;
const RENDER_TID: u32 = 1;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Schedule(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Schedule",
                    "cat": "Scheduler",
                    "ts": us(e.now),
                    "pid": 0,
                    "tid": SCHEDULER_TID,
                    "s": "t",
                    "args": {
                        "session": e.id.session_id.0,
                        "present": e.id.present_id.0,
                        "requested_us": us(e.requested_presentation_time),
                        "target_us": us(e.target_vsync),
                    }
                }));
            }
            RecordedEvent::Latch(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Latch",
                    "cat": "Scheduler",
                    "ts": us(e.latch_time),
                    "pid": 0,
                    "tid": SCHEDULER_TID,
                    "s": "g",
                    "args": {
                        "trace_id": e.trace_id,
                        "sessions": e.sessions,
                        "presents": e.presents,
                        "failed_sessions": e.failed_sessions,
                    }
                }));
            }
            RecordedEvent::RenderBegin(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "RenderBegin",
                    "cat": "Render",
                    "ts": us(e.latch_time),
                    "pid": 0,
                    "tid": RENDER_TID,
                    "s": "t",
                    "args": {
                        "frame": e.frame_number.0,
                        "trace_id": e.trace_id,
                        "target_us": us(e.target_presentation_time),
                        "presents": e.presents,
                    }
                }));
            }
            RecordedEvent::FramePresented(e) => {
                events.push(json!({
                    "ph": "X",
                    "name": format!("Frame {}", e.frame_number.0),
                    "cat": "Render",
                    "ts": us(e.render_start),
                    "dur": e.render_done_time
                        .saturating_duration_since(e.render_start)
                        .as_micros_f64(),
                    "pid": 0,
                    "tid": RENDER_TID,
                    "args": {
                        "presents": e.presents,
                        "presented_us": us(e.actual_presentation_time),
                    }
                }));
            }
            RecordedEvent::FrameDropped(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": if e.rejected { "FrameRejected" } else { "FrameDropped" },
                    "cat": "Render",
                    "ts": us(e.now),
                    "pid": 0,
                    "tid": RENDER_TID,
                    "s": "t",
                    "args": {
                        "frame": e.frame_number.0,
                    }
                }));
            }
            RecordedEvent::FencesSignaled(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FencesSignaled",
                    "cat": "Scheduler",
                    "ts": us(e.now),
                    "pid": 0,
                    "tid": SCHEDULER_TID,
                    "s": "t",
                    "args": {
                        "session": e.session_id.0,
                        "below": e.below.0,
                        "count": e.count,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": us(s.actual_presentation_time),
                    "pid": 0,
                    "tid": RENDER_TID,
                    "s": "g",
                    "args": {
                        "frame": s.frame_number.0,
                        "latch_us": us(s.latch_time),
                        "target_us": us(s.target_presentation_time),
                        "render_us": s.render_done_time
                            .saturating_duration_since(s.render_start)
                            .as_micros_f64(),
                        "predicted_render_us": s.predicted_render.as_micros_f64(),
                        "missed_target": s.missed_target,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use cadence_core::session::FrameNumber;
    use cadence_core::trace::{FramePresentedEvent, LatchEvent, TraceSink};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_latch(&LatchEvent {
            trace_id: 1,
            latch_time: HostTime(10_000_000),
            target_vsync: HostTime(10_000_000),
            sessions: 1,
            presents: 2,
            failed_sessions: 0,
        });
        rec.on_frame_presented(&FramePresentedEvent {
            frame_number: FrameNumber(1),
            render_start: HostTime(10_000_000),
            render_done_time: HostTime(14_000_000),
            actual_presentation_time: HostTime(20_000_000),
            presents: 2,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "Latch");
        assert_eq!(parsed[0]["args"]["presents"], 2);

        // Presented frames are complete slices spanning the render.
        assert_eq!(parsed[1]["ph"], "X");
        assert_eq!(parsed[1]["name"], "Frame 1");
        assert_eq!(parsed[1]["ts"], 10_000.0);
        assert_eq!(parsed[1]["dur"], 4_000.0);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
