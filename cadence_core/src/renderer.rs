// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame renderer contract.
//!
//! The scheduler starts at most one render at a time through
//! [`FrameRenderer::render_frame`]. The render finishes asynchronously: the
//! owner of the scheduler reports the result with
//! [`FrameScheduler::on_render_outcome`](crate::scheduler::FrameScheduler::on_render_outcome).

use crate::session::FrameNumber;
use crate::time::HostTime;

/// Everything a renderer needs to know about the frame it is asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderRequest {
    /// Number of this render attempt.
    pub frame_number: FrameNumber,
    /// When the presents in this frame were latched.
    pub latch_time: HostTime,
    /// The vsync the frame is aimed at.
    pub target_presentation_time: HostTime,
    /// Same id the session updaters saw for the latch.
    pub trace_id: u64,
}

/// Timing of a frame that reached the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamps {
    /// When the renderer finished its GPU work.
    pub render_done_time: HostTime,
    /// When the frame was actually shown.
    pub actual_presentation_time: HostTime,
}

/// How a render attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The frame was shown.
    Presented(Timestamps),
    /// The frame never reached the display. Its presents are retried.
    Dropped,
}

/// Something that can turn the current scene into a frame.
pub trait FrameRenderer {
    /// Starts rendering a frame.
    ///
    /// Returns `false` if the renderer cannot take the frame right now; the
    /// scheduler then treats it like a dropped frame and tries again at the
    /// next vsync.
    fn render_frame(&mut self, request: &RenderRequest) -> bool;
}

impl<R: FrameRenderer + ?Sized> FrameRenderer for alloc::boxed::Box<R> {
    fn render_frame(&mut self, request: &RenderRequest) -> bool {
        (**self).render_frame(request)
    }
}
